//! Merkle trees over file segments and unlock conditions.
//!
//! Leaves are hashed with a `0x00` prefix and interior nodes with `0x01`,
//! so a leaf can never be reinterpreted as an interior node. Trees over a
//! non-power-of-two number of leaves split at the largest power of two
//! strictly smaller than the leaf count, putting the perfect subtree on the
//! left. Storage proofs reveal one segment plus the sibling hashes along its
//! path; verification replays the path bottom-up.

use super::{hash_all, Hash};
use crate::parameters::SEGMENT_SIZE;

const LEAF_PREFIX: &[u8] = &[0x00];
const NODE_PREFIX: &[u8] = &[0x01];

/// Hash of a leaf's data.
pub fn leaf_sum(data: &[u8]) -> Hash {
    hash_all(&[LEAF_PREFIX, data])
}

/// Hash of an interior node from its two children.
pub fn node_sum(left: &Hash, right: &Hash) -> Hash {
    hash_all(&[NODE_PREFIX, &left.0, &right.0])
}

/// The number of segments in a file of `file_size` bytes. Always at least
/// one: an empty file still has a single (empty) challengeable segment.
pub fn calculate_segments(file_size: u64) -> u64 {
    let segments = (file_size + SEGMENT_SIZE - 1) / SEGMENT_SIZE;
    std::cmp::max(segments, 1)
}

/// The largest power of two strictly less than `n`. `n` must be at least 2.
fn split_point(n: usize) -> usize {
    let mut k = 1;
    while k * 2 < n {
        k *= 2;
    }
    k
}

/// The root of a tree whose leaves are the given byte strings, in order.
pub fn root(leaves: &[&[u8]]) -> Hash {
    assert!(!leaves.is_empty(), "merkle root of zero leaves");
    if leaves.len() == 1 {
        return leaf_sum(leaves[0]);
    }
    let k = split_point(leaves.len());
    node_sum(&root(&leaves[..k]), &root(&leaves[k..]))
}

/// The Merkle root committing to `data` split into protocol-sized segments.
pub fn file_merkle_root(data: &[u8]) -> Hash {
    if data.is_empty() {
        return leaf_sum(data);
    }
    let leaves: Vec<&[u8]> = data.chunks(SEGMENT_SIZE as usize).collect();
    root(&leaves)
}

/// Builds the sibling hash set proving the segment at `proof_index` within
/// `data`, suitable for [`verify_segment`]. Returns the revealed segment
/// bytes and the sibling hashes ordered bottom-up.
pub fn build_segment_proof(data: &[u8], proof_index: u64) -> (Vec<u8>, Vec<Hash>) {
    let leaves: Vec<&[u8]> = if data.is_empty() {
        vec![&[]]
    } else {
        data.chunks(SEGMENT_SIZE as usize).collect()
    };
    assert!(
        (proof_index as usize) < leaves.len(),
        "proof index beyond the last segment"
    );
    let segment = leaves[proof_index as usize].to_vec();
    (segment, siblings(&leaves, proof_index as usize))
}

fn siblings(leaves: &[&[u8]], index: usize) -> Vec<Hash> {
    if leaves.len() == 1 {
        return Vec::new();
    }
    let k = split_point(leaves.len());
    if index < k {
        let mut set = siblings(&leaves[..k], index);
        set.push(root(&leaves[k..]));
        set
    } else {
        let mut set = siblings(&leaves[k..], index - k);
        set.push(root(&leaves[..k]));
        set
    }
}

/// Verifies that `segment` is the leaf at `proof_index` of the tree with the
/// given `root` over `num_segments` leaves, using the bottom-up sibling
/// `hash_set`. Extra or missing siblings fail verification; this is the check
/// storage proofs must pass.
pub fn verify_segment(
    segment: &[u8],
    hash_set: &[Hash],
    num_segments: u64,
    proof_index: u64,
    expected_root: Hash,
) -> bool {
    if proof_index >= num_segments {
        return false;
    }

    let mut sum = leaf_sum(segment);
    let mut height: u32 = 1;
    let mut used = 0;

    // Climb while the subtree containing the proof index is perfect (fully
    // inside the leaf range). Within a perfect subtree the index's position
    // decides whether the sibling joins from the left or the right.
    let mut stable_end = proof_index;
    loop {
        let subtree_size = 1u64 << height;
        let subtree_start = (proof_index / subtree_size) * subtree_size;
        let subtree_end = subtree_start + subtree_size - 1;
        if subtree_end >= num_segments {
            break;
        }
        stable_end = subtree_end;
        if used >= hash_set.len() {
            return false;
        }
        if proof_index - subtree_start < subtree_size / 2 {
            sum = node_sum(&sum, &hash_set[used]);
        } else {
            sum = node_sum(&hash_set[used], &sum);
        }
        used += 1;
        height += 1;
    }

    // If the perfect region does not reach the final leaf, the ragged right
    // edge joins once from the right.
    if stable_end != num_segments - 1 {
        if used >= hash_set.len() {
            return false;
        }
        sum = node_sum(&sum, &hash_set[used]);
        used += 1;
    }

    // Any remaining siblings are roots of larger trees to the left.
    while used < hash_set.len() {
        sum = node_sum(&hash_set[used], &sum);
        used += 1;
    }

    sum == expected_root
}
