use proptest::prelude::*;

use super::super::*;
use crate::serialization::SiaDeserializeInto;

proptest! {
    #[test]
    fn block_id_roundtrip(id in any::<BlockID>()) {
        sia_test::init();

        let bytes = id.sia_serialize_to_vec()?;
        let decoded: BlockID = bytes.as_slice().sia_deserialize_into()?;
        prop_assert_eq!(id, decoded);
    }

    #[test]
    fn block_id_display_fromstr_roundtrip(id in any::<BlockID>()) {
        sia_test::init();

        let display = format!("{}", id);
        let parsed = display.parse::<BlockID>().expect("id should parse");
        prop_assert_eq!(id, parsed);
    }
}

proptest! {
    // Whole-block roundtrips generate nested transactions and are slower,
    // so run fewer cases by default.
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn block_roundtrip(block in any::<Block>()) {
        sia_test::init();

        let bytes = block.sia_serialize_to_vec()?;
        let decoded: Block = bytes.as_slice().sia_deserialize_into()?;
        prop_assert_eq!(&block, &decoded);
        prop_assert_eq!(bytes, decoded.sia_serialize_to_vec()?);
    }

    #[test]
    fn block_id_commits_to_contents(block in any::<Block>()) {
        sia_test::init();

        let mut tweaked = block.clone();
        tweaked.nonce = block.nonce.wrapping_add(1);
        prop_assert_ne!(block.id(), tweaked.id());
    }
}
