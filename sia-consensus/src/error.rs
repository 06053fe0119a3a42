//! Errors produced while judging transactions and blocks.
//!
//! Everything here describes misbehavior in peer-supplied data and is
//! returned as a value; the engine panics instead when its own invariants
//! break, because a corrupted consensus state must not keep running.

use thiserror::Error;

/// A transaction rejection: standalone rules first, then rules that consult
/// the consensus state.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction is larger than the per-transaction size budget")]
    TooLarge,
    #[error("transaction carries no value flows at all")]
    EmptyTransaction,
    #[error("transaction creates a zero-value output, fee, or payout")]
    ZeroValueOutput,
    #[error("an input's unlock conditions are timelocked past the current height")]
    InputTimelockNotMet,
    #[error("a transaction with a storage proof cannot create outputs, contracts, or terminations")]
    StorageProofWithOutputs,
    #[error("file contract window must open after the current height and close after it opens")]
    BadContractWindow,
    #[error("file contract payout must be nonzero, and both proof-output lists must sum to the payout net of the siafund tax")]
    BadContractPayout,

    #[error("transaction spends or terminates the same parent twice")]
    DoubleSpend,
    #[error("signature references a parent that is not an input of the transaction")]
    UnrecognizedSignature,
    #[error("signature supplied for an input whose requirement is already satisfied")]
    FrivolousSignature,
    #[error("signature key index is out of range for the input's unlock conditions")]
    InvalidPublicKeyIndex,
    #[error("the same key already signed for this input")]
    RepeatSignature,
    #[error("signature is timelocked past the current height")]
    SignatureTimelockNotMet,
    #[error("whole-transaction coverage cannot also list covered fields")]
    WholeTransactionViolation,
    #[error("covered field indexes must be sorted, unique, and in range")]
    InvalidCoveredFields,
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("an input is missing required signatures")]
    MissingSignatures,

    #[error("siacoin input spends an output missing from the consensus set")]
    MissingSiacoinOutput,
    #[error("unlock conditions do not hash to the required unlock hash")]
    UnlockHashMismatch,
    #[error("siacoin input sum does not equal the output, payout, and fee sum")]
    OutputSumMismatch,
    #[error("referenced file contract is missing from the consensus set")]
    MissingFileContract,
    #[error("contract termination submitted at or after the proof window opened")]
    TerminationTooLate,
    #[error("termination payouts do not sum to the contract's escrow")]
    TerminationPayoutMismatch,
    #[error("no block exists at the contract's trigger height")]
    MissingTriggerBlock,
    #[error("storage proof does not verify against the contract's file root")]
    InvalidStorageProof,
    #[error("siafund input spends an output missing from the consensus set")]
    MissingSiafundOutput,
    #[error("siafund input sum does not equal siafund output sum")]
    FundSupplyImbalance,
}

/// A block rejection.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum BlockError {
    #[error("block exceeds the encoded size limit")]
    TooLarge,
    #[error("block timestamp is earlier than the median of its ancestors")]
    TimestampTooEarly,
    #[error("block timestamp is unreasonably far in the future")]
    ExtremeFutureTimestamp,
    #[error("block ID does not meet the required target")]
    InsufficientWork,
    #[error("block descends from a known-invalid block")]
    InvalidAncestor,
    #[error("miner payouts must be nonzero and sum to the subsidy plus fees")]
    BadMinerPayout,
    #[error("invalid transaction: {0}")]
    Transaction(#[from] TransactionError),
}

/// A read-query failure. These are the only errors read queries can return;
/// they never panic on valid state.
#[derive(displaydoc::Display, Error, Clone, Debug, PartialEq, Eq)]
pub enum QueryError {
    /// the requested block range is inverted or extends beyond the tip
    InvalidRange,
    /// the requested block is not in the block map
    UnknownBlock,
    /// diffs have not been generated for the requested block
    DiffsNotGenerated,
}
