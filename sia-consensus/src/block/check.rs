//! Consensus check functions for blocks.

use sia_chain::block::Block;
use sia_chain::currency::Currency;

use crate::error::BlockError;

/// Returns `Ok(())` if the miner payouts are each nonzero and together claim
/// exactly the block subsidy plus the block's transaction fees. Claiming
/// less is as invalid as claiming more: coins must never silently vanish
/// from the supply schedule.
pub fn miner_payouts_are_valid(block: &Block, expected_total: &Currency) -> Result<(), BlockError> {
    let mut total = Currency::zero();
    for payout in &block.miner_payouts {
        if payout.value.is_zero() {
            return Err(BlockError::BadMinerPayout);
        }
        total += &payout.value;
    }
    if total != *expected_total {
        return Err(BlockError::BadMinerPayout);
    }
    Ok(())
}
