// parcel/core/economics/src/governance.rs

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::audit::{AuditEvent, AuditRecord, AuditSink};
use crate::error::{EconomicsError, Result};
use crate::tally::{self, ProposalStatus, TallyParams, VoteChoice, VoteTotals};
use crate::types::{AccountId, PropertyId};

/// Governance configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Length of the voting window in days
    #[serde(default = "default_voting_period_days")]
    pub voting_period_days: u32,

    /// Quorum and passing thresholds
    #[serde(flatten)]
    pub tally: TallyParams,
}

fn default_voting_period_days() -> u32 {
    7
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            voting_period_days: default_voting_period_days(),
            tally: TallyParams::default(),
        }
    }
}

impl GovernanceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.voting_period_days == 0 {
            return Err(EconomicsError::InvalidInput(
                "voting period must be at least one day".to_string(),
            ));
        }
        self.tally.validate()
    }

    pub fn voting_period(&self) -> Duration {
        Duration::days(self.voting_period_days as i64)
    }
}

/// A recorded ballot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVote {
    pub choice: VoteChoice,
    /// Voter's token balance at cast time
    pub weight: u64,
    pub cast_at: DateTime<Utc>,
}

/// Property-scoped governance proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceProposal {
    pub id: u64,
    pub property_id: PropertyId,
    pub title: String,
    pub description: String,
    pub proposer: AccountId,
    pub votes: VoteTotals,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub voters: HashMap<AccountId, CastVote>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl GovernanceProposal {
    pub fn has_voted(&self, voter: &AccountId) -> bool {
        self.voters.contains_key(voter)
    }
}

/// Proposal registry.
///
/// All commands take the write lock for their whole duration, including the
/// audit record, so each vote increment is atomic, one ballot is kept per
/// (proposal, voter) and the audit sink sees commands in commit order.
pub struct GovernanceBook {
    config: GovernanceConfig,
    proposals: RwLock<HashMap<u64, GovernanceProposal>>,
    next_proposal_id: AtomicU64,
    audit: Arc<dyn AuditSink>,
}

impl GovernanceBook {
    pub fn new(config: GovernanceConfig, audit: Arc<dyn AuditSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            proposals: RwLock::new(HashMap::new()),
            next_proposal_id: AtomicU64::new(1),
            audit,
        })
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Open a proposal whose voting window starts at `now`
    pub fn create_proposal(
        &self,
        property_id: PropertyId,
        title: impl Into<String>,
        description: impl Into<String>,
        proposer: AccountId,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(EconomicsError::InvalidInput("proposal title is empty".to_string()));
        }

        let proposal_id = self.next_proposal_id.fetch_add(1, Ordering::SeqCst);
        let end_date = now + self.config.voting_period();

        let proposal = GovernanceProposal {
            id: proposal_id,
            property_id: property_id.clone(),
            title: title.clone(),
            description: description.into(),
            proposer: proposer.clone(),
            votes: VoteTotals::default(),
            status: ProposalStatus::Active,
            created_at: now,
            end_date,
            voters: HashMap::new(),
            resolved_at: None,
            executed_at: None,
        };
        let mut proposals = self.proposals.write();
        proposals.insert(proposal_id, proposal);

        tracing::info!(proposal_id, property_id = %property_id, %end_date, "Created governance proposal");
        self.audit.record(AuditRecord {
            property_id,
            timestamp: now,
            event: AuditEvent::ProposalCreated {
                proposal_id,
                title,
                proposer,
                end_date,
            },
        });
        drop(proposals);

        Ok(proposal_id)
    }

    /// Record one token-weighted ballot and return the updated totals
    pub fn cast_vote(
        &self,
        proposal_id: u64,
        voter: AccountId,
        choice: VoteChoice,
        weight: u64,
        now: DateTime<Utc>,
    ) -> Result<VoteTotals> {
        if weight == 0 {
            return Err(EconomicsError::ZeroVotingPower(voter));
        }

        let mut proposals = self.proposals.write();
        let proposal = proposals
            .get_mut(&proposal_id)
            .ok_or(EconomicsError::ProposalNotFound(proposal_id))?;

        if proposal.status != ProposalStatus::Active {
            return Err(EconomicsError::InvalidState {
                expected: "active",
                actual: proposal.status.to_string(),
            });
        }
        if now > proposal.end_date {
            return Err(EconomicsError::VotingClosed(proposal_id));
        }
        if proposal.has_voted(&voter) {
            tracing::warn!(proposal_id, voter = %voter, "Rejected repeat vote");
            return Err(EconomicsError::AlreadyVoted { proposal_id, voter });
        }

        proposal.votes.record(choice, weight)?;
        proposal.voters.insert(
            voter.clone(),
            CastVote {
                choice,
                weight,
                cast_at: now,
            },
        );
        let totals = proposal.votes;
        let property_id = proposal.property_id.clone();

        tracing::debug!(proposal_id, voter = %voter, ?choice, weight, "Vote recorded");
        self.audit.record(AuditRecord {
            property_id,
            timestamp: now,
            event: AuditEvent::VoteCast {
                proposal_id,
                voter,
                vote: choice,
                voting_power: weight,
            },
        });
        drop(proposals);

        Ok(totals)
    }

    /// Tally the proposal at `now` and persist the outcome once resolved
    pub fn resolve_proposal(
        &self,
        proposal_id: u64,
        now: DateTime<Utc>,
        total_token_supply: u64,
    ) -> Result<ProposalStatus> {
        let mut proposals = self.proposals.write();
        let proposal = proposals
            .get_mut(&proposal_id)
            .ok_or(EconomicsError::ProposalNotFound(proposal_id))?;

        let status = tally::resolve(proposal, now, total_token_supply, &self.config.tally)?;
        if status == ProposalStatus::Active {
            return Ok(status);
        }

        proposal.status = status;
        proposal.resolved_at = Some(now);
        let final_votes = proposal.votes;
        let property_id = proposal.property_id.clone();

        tracing::info!(proposal_id, %status, "Proposal resolved");
        self.audit.record(AuditRecord {
            property_id,
            timestamp: now,
            event: AuditEvent::ProposalResolved {
                proposal_id,
                status,
                final_votes,
            },
        });
        drop(proposals);

        Ok(status)
    }

    /// Mark a passed proposal as executed
    pub fn execute_proposal(&self, proposal_id: u64, now: DateTime<Utc>) -> Result<()> {
        let mut proposals = self.proposals.write();
        let proposal = proposals
            .get_mut(&proposal_id)
            .ok_or(EconomicsError::ProposalNotFound(proposal_id))?;

        if proposal.status != ProposalStatus::Passed {
            return Err(EconomicsError::InvalidState {
                expected: "passed",
                actual: proposal.status.to_string(),
            });
        }
        proposal.status = ProposalStatus::Executed;
        proposal.executed_at = Some(now);
        let property_id = proposal.property_id.clone();

        tracing::info!(proposal_id, "Proposal executed");
        self.audit.record(AuditRecord {
            property_id,
            timestamp: now,
            event: AuditEvent::ProposalExecuted { proposal_id },
        });
        Ok(())
    }

    pub fn proposal(&self, proposal_id: u64) -> Option<GovernanceProposal> {
        self.proposals.read().get(&proposal_id).cloned()
    }

    /// Proposals for one property, oldest first
    pub fn proposals_for(&self, property_id: &PropertyId) -> Vec<GovernanceProposal> {
        let mut found: Vec<_> = self
            .proposals
            .read()
            .values()
            .filter(|p| &p.property_id == property_id)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.id);
        found
    }

    pub fn active_proposals(&self) -> Vec<GovernanceProposal> {
        let mut found: Vec<_> = self
            .proposals
            .read()
            .values()
            .filter(|p| p.status == ProposalStatus::Active)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.id);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;

    fn book() -> (GovernanceBook, Arc<MemoryAuditLog>) {
        let log = Arc::new(MemoryAuditLog::new());
        let book = GovernanceBook::new(GovernanceConfig::default(), log.clone()).unwrap();
        (book, log)
    }

    fn open(book: &GovernanceBook, now: DateTime<Utc>) -> u64 {
        book.create_proposal(
            PropertyId::from("prop-1"),
            "Renovate lobby",
            "Use reserve funds to renovate the lobby",
            AccountId::from("0.0.1001"),
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_create_proposal() {
        let (book, log) = book();
        let now = Utc::now();

        let id = open(&book, now);
        assert_eq!(id, 1);

        let proposal = book.proposal(id).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Active);
        assert_eq!(proposal.end_date, now + Duration::days(7));
        assert_eq!(log.len(), 1);
        assert_eq!(open(&book, now), 2);
    }

    #[test]
    fn test_create_proposal_requires_title() {
        let (book, _) = book();
        let result = book.create_proposal(
            PropertyId::from("prop-1"),
            "  ",
            "",
            AccountId::from("0.0.1001"),
            Utc::now(),
        );
        assert!(matches!(result, Err(EconomicsError::InvalidInput(_))));
    }

    #[test]
    fn test_voting_accumulates_weights() {
        let (book, _) = book();
        let now = Utc::now();
        let id = open(&book, now);

        book.cast_vote(id, AccountId::from("a"), VoteChoice::For, 100, now).unwrap();
        book.cast_vote(id, AccountId::from("b"), VoteChoice::Against, 40, now).unwrap();
        let totals = book
            .cast_vote(id, AccountId::from("c"), VoteChoice::Abstain, 10, now)
            .unwrap();

        assert_eq!(totals, VoteTotals::new(100, 40, 10));
        assert!(book.proposal(id).unwrap().has_voted(&AccountId::from("b")));
    }

    #[test]
    fn test_repeat_vote_rejected_and_totals_unchanged() {
        let (book, log) = book();
        let now = Utc::now();
        let id = open(&book, now);

        book.cast_vote(id, AccountId::from("a"), VoteChoice::For, 100, now).unwrap();
        let again = book.cast_vote(id, AccountId::from("a"), VoteChoice::Against, 100, now);

        assert!(matches!(again, Err(EconomicsError::AlreadyVoted { proposal_id: 1, .. })));
        assert_eq!(book.proposal(id).unwrap().votes, VoteTotals::new(100, 0, 0));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_vote_rejections() {
        let (book, _) = book();
        let now = Utc::now();
        let id = open(&book, now);

        assert!(matches!(
            book.cast_vote(id, AccountId::from("a"), VoteChoice::For, 0, now),
            Err(EconomicsError::ZeroVotingPower(_))
        ));
        assert!(matches!(
            book.cast_vote(99, AccountId::from("a"), VoteChoice::For, 1, now),
            Err(EconomicsError::ProposalNotFound(99))
        ));
        assert!(matches!(
            book.cast_vote(id, AccountId::from("a"), VoteChoice::For, 1, now + Duration::days(8)),
            Err(EconomicsError::VotingClosed(_))
        ));
    }

    #[test]
    fn test_resolve_and_execute() {
        let (book, log) = book();
        let now = Utc::now();
        let id = open(&book, now);

        book.cast_vote(id, AccountId::from("a"), VoteChoice::For, 2100, now).unwrap();
        book.cast_vote(id, AccountId::from("b"), VoteChoice::Against, 800, now).unwrap();
        book.cast_vote(id, AccountId::from("c"), VoteChoice::Abstain, 200, now).unwrap();

        assert_eq!(book.resolve_proposal(id, now, 6000).unwrap(), ProposalStatus::Active);
        assert_eq!(book.active_proposals().len(), 1);

        let later = now + Duration::days(8);
        assert_eq!(book.resolve_proposal(id, later, 6000).unwrap(), ProposalStatus::Passed);
        assert!(book.active_proposals().is_empty());

        // no further votes once resolved
        assert!(matches!(
            book.cast_vote(id, AccountId::from("d"), VoteChoice::For, 5, later),
            Err(EconomicsError::InvalidState { .. })
        ));

        book.execute_proposal(id, later).unwrap();
        let proposal = book.proposal(id).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Executed);
        assert_eq!(proposal.executed_at, Some(later));

        assert!(matches!(
            book.execute_proposal(id, later),
            Err(EconomicsError::InvalidState { .. })
        ));
        // create + 3 votes + resolve + execute
        assert_eq!(log.len(), 6);
    }

    #[test]
    fn test_rejected_proposal_cannot_execute() {
        let (book, _) = book();
        let now = Utc::now();
        let id = open(&book, now);
        book.cast_vote(id, AccountId::from("a"), VoteChoice::For, 10, now).unwrap();

        let later = now + Duration::days(8);
        assert_eq!(book.resolve_proposal(id, later, 10_000).unwrap(), ProposalStatus::Rejected);
        assert!(matches!(
            book.execute_proposal(id, later),
            Err(EconomicsError::InvalidState { expected: "passed", .. })
        ));
        assert!(matches!(
            book.resolve_proposal(id, later, 10_000),
            Err(EconomicsError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_proposals_for_property() {
        let (book, _) = book();
        let now = Utc::now();
        open(&book, now);
        book.create_proposal(
            PropertyId::from("prop-2"),
            "Raise rent",
            "",
            AccountId::from("0.0.2"),
            now,
        )
        .unwrap();
        open(&book, now);

        let ids: Vec<_> = book
            .proposals_for(&PropertyId::from("prop-1"))
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GovernanceConfig {
            voting_period_days: 0,
            ..GovernanceConfig::default()
        };
        assert!(GovernanceBook::new(config, Arc::new(MemoryAuditLog::new())).is_err());
    }

    #[test]
    fn test_config_fields_default_individually() {
        let config: GovernanceConfig = serde_json::from_str(r#"{"voting_period_days": 14}"#).unwrap();
        assert_eq!(config.voting_period_days, 14);
        assert_eq!(config.tally, TallyParams::default());

        let config: GovernanceConfig = serde_json::from_str(r#"{"passing_percentage": 66}"#).unwrap();
        assert_eq!(config.voting_period_days, 7);
        assert_eq!(config.tally.quorum_percentage, 25);
        assert_eq!(config.tally.passing_percentage, 66);
    }
}
