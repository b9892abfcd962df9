// parcel/core/economics/src/error.rs

//! Economics errors

use thiserror::Error;

use crate::types::{AccountId, PropertyId};

/// Error raised by the calculators, the escrow ledger and the governance book
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomicsError {
    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    #[error("Negative amount: {0}")]
    NegativeAmount(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Division by zero: {0}")]
    DivideByZero(&'static str),

    #[error("Invalid state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: String,
    },

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("Holders own {held} tokens but total supply is {supply}")]
    HoldingsExceedSupply { held: u128, supply: u64 },

    #[error("Duplicate token holder: {0}")]
    DuplicateHolder(AccountId),

    #[error("Escrow account not found: {0}")]
    AccountNotFound(PropertyId),

    #[error("Escrow account already exists: {0}")]
    AccountExists(PropertyId),

    #[error("Escrow {0} has nothing to distribute")]
    EmptyEscrow(PropertyId),

    #[error("Distribution {distribution_id} already in flight for {property_id}")]
    DistributionInFlight {
        property_id: PropertyId,
        distribution_id: u64,
    },

    #[error("Unknown distribution {distribution_id} for {property_id}")]
    UnknownDistribution {
        property_id: PropertyId,
        distribution_id: u64,
    },

    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("Account {voter} already voted on proposal {proposal_id}")]
    AlreadyVoted { proposal_id: u64, voter: AccountId },

    #[error("Voting on proposal {0} has ended")]
    VotingClosed(u64),

    #[error("Voter {0} has no voting power")]
    ZeroVotingPower(AccountId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for economics operations
pub type Result<T> = std::result::Result<T, EconomicsError>;
