use proptest::{arbitrary::any, collection::vec, prelude::*};

use super::*;

impl Arbitrary for Block {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            any::<BlockID>(),
            any::<u64>(),
            any::<Timestamp>(),
            vec(any::<SiacoinOutput>(), 0..3),
            vec(any::<Transaction>(), 0..3),
        )
            .prop_map(|(parent_id, nonce, timestamp, miner_payouts, transactions)| Block {
                parent_id,
                nonce,
                timestamp,
                miner_payouts,
                transactions,
            })
            .boxed()
    }
}
