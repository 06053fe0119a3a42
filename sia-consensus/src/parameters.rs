//! Consensus parameters derived from the chain constants.

use sia_chain::block::Height;
use sia_chain::currency::Currency;
use sia_chain::parameters::{COIN, INITIAL_COINBASE, MINIMUM_COINBASE};

/// The subsidy minted by the block at `height`: starts at
/// [`INITIAL_COINBASE`] whole coins and decays by one coin per block until
/// the perpetual [`MINIMUM_COINBASE`] floor.
pub fn block_subsidy(height: Height) -> Currency {
    let coins = std::cmp::max(
        INITIAL_COINBASE.saturating_sub(height.0),
        MINIMUM_COINBASE,
    );
    &*COIN * coins
}
