// parcel/core/economics/src/audit.rs

//! Audit trail for escrow and governance commands.
//!
//! Every committed command produces one [`AuditRecord`]. Where the records go
//! (a consensus topic, a database table, a log file) is the sink's business.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::tally::{ProposalStatus, VoteChoice, VoteTotals};
use crate::types::{AccountId, Amount, PropertyId};

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEvent {
    EscrowDeposit {
        transaction_id: u64,
        amount: Amount,
    },
    DistributionProposed {
        distribution_id: u64,
        management_fee: Amount,
        platform_fee: Amount,
        dividends: Amount,
        holders: usize,
    },
    DistributionConfirmed {
        distribution_id: u64,
        external_tx_id: String,
        transactions: usize,
    },
    DistributionAborted {
        distribution_id: u64,
        reason: String,
    },
    ProposalCreated {
        proposal_id: u64,
        title: String,
        proposer: AccountId,
        end_date: DateTime<Utc>,
    },
    VoteCast {
        proposal_id: u64,
        voter: AccountId,
        vote: VoteChoice,
        voting_power: u64,
    },
    ProposalResolved {
        proposal_id: u64,
        status: ProposalStatus,
        final_votes: VoteTotals,
    },
    ProposalExecuted {
        proposal_id: u64,
    },
}

/// One entry of the audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub property_id: PropertyId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

/// Destination for audit records
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Keeps records in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, record: AuditRecord) {
        self.records.lock().push(record);
    }
}

/// Emits each record as a structured `tracing` event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) {
        match serde_json::to_string(&record) {
            Ok(json) => tracing::info!(target: "parcel::audit", property_id = %record.property_id, "{}", json),
            Err(e) => tracing::warn!(target: "parcel::audit", "Failed to encode audit record: {}", e),
        }
    }
}
