// parcel/core/economics/src/lib.rs

//! Parcel economics: escrow fee/dividend distribution and governance tallying
//! for tokenized real-estate properties.
//!
//! The calculators in [`distribution`] and [`tally`] are pure functions.
//! [`EscrowLedger`] and [`GovernanceBook`] wrap them with in-process state,
//! command serialization and an audit trail.

pub mod audit;
pub mod distribution;
pub mod error;
pub mod escrow;
pub mod governance;
pub mod tally;
pub mod types;

pub use audit::{AuditEvent, AuditRecord, AuditSink, MemoryAuditLog, TracingAuditSink};
pub use distribution::{
    compute_fees, distribute_dividends, DividendDistribution, DividendPayout, FeeBreakdown,
};
pub use error::{EconomicsError, Result};
pub use escrow::{
    DistributionRequest, EscrowAccount, EscrowLedger, EscrowTransaction, PendingDistribution,
    TransactionDraft, TransactionKind,
};
pub use governance::{CastVote, GovernanceBook, GovernanceConfig, GovernanceProposal};
pub use tally::{
    resolve, summarize, ProposalStatus, TallyParams, TallySummary, VoteChoice, VoteTotals,
};
pub use types::{AccountId, Amount, Currency, FeeRate, PropertyId, TokenHolder};
