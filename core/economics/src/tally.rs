// parcel/core/economics/src/tally.rs

//! Token-weighted vote tallying.
//!
//! Quorum and passing checks use exact integer comparisons
//! (`cast * 100 >= supply * quorum%`) instead of floating point shares.
//! Abstentions count toward quorum and toward the passing denominator but
//! never toward the "for" side.

use chrono::{DateTime, Utc};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EconomicsError, Result};
use crate::governance::GovernanceProposal;

/// Default share of total supply that must vote
pub const DEFAULT_QUORUM_PERCENTAGE: u8 = 25;

/// Default share of cast votes that must be "for"
pub const DEFAULT_PASSING_PERCENTAGE: u8 = 50;

/// Lifecycle state of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Active,
    Passed,
    Rejected,
    Executed,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Active => "active",
            ProposalStatus::Passed => "passed",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Executed => "executed",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side a vote is cast for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    For,
    Against,
    Abstain,
}

impl std::str::FromStr for VoteChoice {
    type Err = EconomicsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "for" => Ok(VoteChoice::For),
            "against" => Ok(VoteChoice::Against),
            "abstain" => Ok(VoteChoice::Abstain),
            other => Err(EconomicsError::InvalidInput(format!("unknown vote choice {}", other))),
        }
    }
}

/// Running token-weighted totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTotals {
    #[serde(rename = "for")]
    pub for_votes: u128,
    #[serde(rename = "against")]
    pub against_votes: u128,
    #[serde(rename = "abstain")]
    pub abstain_votes: u128,
}

impl VoteTotals {
    pub fn new(for_votes: u128, against_votes: u128, abstain_votes: u128) -> Self {
        Self {
            for_votes,
            against_votes,
            abstain_votes,
        }
    }

    pub fn total_cast(&self) -> Result<u128> {
        self.for_votes
            .checked_add(self.against_votes)
            .and_then(|sum| sum.checked_add(self.abstain_votes))
            .ok_or(EconomicsError::Overflow("total votes cast"))
    }

    /// Add `weight` to the side named by `choice`; totals are unchanged on error
    pub fn record(&mut self, choice: VoteChoice, weight: u64) -> Result<()> {
        let side = match choice {
            VoteChoice::For => &mut self.for_votes,
            VoteChoice::Against => &mut self.against_votes,
            VoteChoice::Abstain => &mut self.abstain_votes,
        };
        *side = side
            .checked_add(weight as u128)
            .ok_or(EconomicsError::Overflow("vote total"))?;
        Ok(())
    }
}

/// Quorum and passing thresholds, in whole percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyParams {
    #[serde(default = "default_quorum_percentage")]
    pub quorum_percentage: u8,
    #[serde(default = "default_passing_percentage")]
    pub passing_percentage: u8,
}

fn default_quorum_percentage() -> u8 {
    DEFAULT_QUORUM_PERCENTAGE
}

fn default_passing_percentage() -> u8 {
    DEFAULT_PASSING_PERCENTAGE
}

impl Default for TallyParams {
    fn default() -> Self {
        Self {
            quorum_percentage: DEFAULT_QUORUM_PERCENTAGE,
            passing_percentage: DEFAULT_PASSING_PERCENTAGE,
        }
    }
}

impl TallyParams {
    pub fn validate(&self) -> Result<()> {
        if self.quorum_percentage > 100 {
            return Err(EconomicsError::InvalidRate(format!(
                "quorum {}% exceeds 100%",
                self.quorum_percentage
            )));
        }
        if self.passing_percentage > 100 {
            return Err(EconomicsError::InvalidRate(format!(
                "passing threshold {}% exceeds 100%",
                self.passing_percentage
            )));
        }
        Ok(())
    }
}

/// Outcome of counting one set of totals against a supply
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallySummary {
    pub total_cast: u128,
    /// Participation needed, rounded up to a whole token
    pub quorum_required: u128,
    pub quorum_met: bool,
    /// Share of cast votes that were "for"; `None` when nothing was cast
    pub for_percentage: Option<f64>,
    pub passing: bool,
}

/// Count `votes` against `total_token_supply` without regard to timing
pub fn summarize(votes: &VoteTotals, total_token_supply: u64, params: &TallyParams) -> Result<TallySummary> {
    params.validate()?;
    if total_token_supply == 0 {
        return Err(EconomicsError::DivideByZero("total token supply"));
    }

    let total_cast = votes.total_cast()?;
    let weighted_supply = total_token_supply as u128 * params.quorum_percentage as u128;
    let quorum_required = weighted_supply.div_ceil(100);

    // u128 totals times 100 can overflow, so compare in 256 bits
    let hundred = U256::from(100u8);
    let cast_scaled = U256::from(total_cast) * hundred;
    let quorum_met = cast_scaled >= U256::from(weighted_supply);

    let for_percentage = if total_cast == 0 {
        None
    } else {
        Some(votes.for_votes as f64 / total_cast as f64 * 100.0)
    };
    let passing = quorum_met
        && total_cast > 0
        && U256::from(votes.for_votes) * hundred
            >= U256::from(total_cast) * U256::from(params.passing_percentage);

    Ok(TallySummary {
        total_cast,
        quorum_required,
        quorum_met,
        for_percentage,
        passing,
    })
}

/// Decide whether `proposal` resolves at `now`, and to what outcome
pub fn resolve(
    proposal: &GovernanceProposal,
    now: DateTime<Utc>,
    total_token_supply: u64,
    params: &TallyParams,
) -> Result<ProposalStatus> {
    if proposal.status != ProposalStatus::Active {
        return Err(EconomicsError::InvalidState {
            expected: "active",
            actual: proposal.status.to_string(),
        });
    }

    let summary = summarize(&proposal.votes, total_token_supply, params)?;
    if now <= proposal.end_date {
        return Ok(ProposalStatus::Active);
    }

    let status = if summary.passing {
        ProposalStatus::Passed
    } else {
        ProposalStatus::Rejected
    };
    tracing::debug!(
        proposal_id = proposal.id,
        total_cast = summary.total_cast,
        quorum_required = summary.quorum_required,
        quorum_met = summary.quorum_met,
        status = %status,
        "Tallied proposal"
    );
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, PropertyId};
    use chrono::Duration;
    use std::collections::HashMap;

    fn proposal(votes: VoteTotals, end_date: DateTime<Utc>) -> GovernanceProposal {
        GovernanceProposal {
            id: 1,
            property_id: PropertyId::from("prop-1"),
            title: "Replace roof".to_string(),
            description: "Spend reserve on roof replacement".to_string(),
            proposer: AccountId::from("0.0.1001"),
            votes,
            status: ProposalStatus::Active,
            created_at: end_date - Duration::days(7),
            end_date,
            voters: HashMap::new(),
            resolved_at: None,
            executed_at: None,
        }
    }

    #[test]
    fn test_quorum_not_met_rejects() {
        let now = Utc::now();
        let p = proposal(VoteTotals::new(1250, 300, 150), now - Duration::hours(1));

        let summary = summarize(&p.votes, 10_000, &TallyParams::default()).unwrap();
        assert_eq!(summary.total_cast, 1700);
        assert_eq!(summary.quorum_required, 2500);
        assert!(!summary.quorum_met);

        let status = resolve(&p, now, 10_000, &TallyParams::default()).unwrap();
        assert_eq!(status, ProposalStatus::Rejected);
    }

    #[test]
    fn test_quorum_met_and_majority_passes() {
        let now = Utc::now();
        let p = proposal(VoteTotals::new(2100, 800, 200), now - Duration::hours(1));

        let summary = summarize(&p.votes, 6000, &TallyParams::default()).unwrap();
        assert_eq!(summary.quorum_required, 1500);
        let share = summary.for_percentage.unwrap();
        assert!((share - 67.74).abs() < 0.01);

        let status = resolve(&p, now, 6000, &TallyParams::default()).unwrap();
        assert_eq!(status, ProposalStatus::Passed);
    }

    #[test]
    fn test_before_end_date_stays_active() {
        let now = Utc::now();
        let p = proposal(VoteTotals::new(9000, 0, 0), now + Duration::days(1));
        assert_eq!(
            resolve(&p, now, 10_000, &TallyParams::default()).unwrap(),
            ProposalStatus::Active
        );

        // the end instant itself is still inside the window
        let p = proposal(VoteTotals::new(9000, 0, 0), now);
        assert_eq!(
            resolve(&p, now, 10_000, &TallyParams::default()).unwrap(),
            ProposalStatus::Active
        );
    }

    #[test]
    fn test_abstain_dilutes_without_opposing() {
        let now = Utc::now();
        // 40 for, 0 against, 60 abstain: quorum met but only 40% for
        let p = proposal(VoteTotals::new(40, 0, 60), now - Duration::seconds(1));
        assert_eq!(
            resolve(&p, now, 100, &TallyParams::default()).unwrap(),
            ProposalStatus::Rejected
        );

        // exactly at the passing threshold passes
        let p = proposal(VoteTotals::new(50, 0, 50), now - Duration::seconds(1));
        assert_eq!(
            resolve(&p, now, 100, &TallyParams::default()).unwrap(),
            ProposalStatus::Passed
        );
    }

    #[test]
    fn test_quorum_boundary_is_inclusive() {
        let now = Utc::now();
        let p = proposal(VoteTotals::new(25, 0, 0), now - Duration::seconds(1));
        assert_eq!(
            resolve(&p, now, 100, &TallyParams::default()).unwrap(),
            ProposalStatus::Passed
        );

        // 24.99% of 101 tokens is not enough: 25 * 100 < 101 * 25
        let p = proposal(VoteTotals::new(25, 0, 0), now - Duration::seconds(1));
        assert_eq!(
            resolve(&p, now, 101, &TallyParams::default()).unwrap(),
            ProposalStatus::Rejected
        );
    }

    #[test]
    fn test_zero_quorum_with_no_votes_rejects() {
        let now = Utc::now();
        let params = TallyParams {
            quorum_percentage: 0,
            passing_percentage: 50,
        };
        let p = proposal(VoteTotals::default(), now - Duration::seconds(1));
        assert_eq!(resolve(&p, now, 100, &params).unwrap(), ProposalStatus::Rejected);
    }

    #[test]
    fn test_resolve_errors() {
        let now = Utc::now();
        let p = proposal(VoteTotals::new(1, 0, 0), now - Duration::seconds(1));
        assert!(matches!(
            resolve(&p, now, 0, &TallyParams::default()),
            Err(EconomicsError::DivideByZero(_))
        ));

        let mut done = p.clone();
        done.status = ProposalStatus::Passed;
        assert!(matches!(
            resolve(&done, now, 100, &TallyParams::default()),
            Err(EconomicsError::InvalidState { .. })
        ));

        let bad = TallyParams {
            quorum_percentage: 101,
            passing_percentage: 50,
        };
        assert!(matches!(resolve(&p, now, 100, &bad), Err(EconomicsError::InvalidRate(_))));
    }

    #[test]
    fn test_vote_totals_json_shape() {
        let mut totals = VoteTotals::default();
        totals.record(VoteChoice::For, 10).unwrap();
        totals.record(VoteChoice::Abstain, 5).unwrap();

        let json = serde_json::to_value(totals).unwrap();
        assert_eq!(json["for"], 10);
        assert_eq!(json["against"], 0);
        assert_eq!(json["abstain"], 5);
        assert_eq!(serde_json::to_value(ProposalStatus::Rejected).unwrap(), "rejected");
    }

    #[test]
    fn test_huge_totals_do_not_overflow() {
        let now = Utc::now();
        let params = TallyParams::default();

        // scaling by 100 would not fit in u128
        let p = proposal(VoteTotals::new(u128::MAX / 50, 0, 0), now - Duration::seconds(1));
        let summary = summarize(&p.votes, 1000, &params).unwrap();
        assert!(summary.quorum_met);
        assert!(summary.passing);
        assert_eq!(resolve(&p, now, 1000, &params).unwrap(), ProposalStatus::Passed);

        let p = proposal(VoteTotals::new(u128::MAX / 50, u128::MAX / 10, 0), now - Duration::seconds(1));
        assert_eq!(resolve(&p, now, 1000, &params).unwrap(), ProposalStatus::Rejected);

        let p = proposal(VoteTotals::new(u128::MAX, 1, 0), now - Duration::seconds(1));
        assert!(matches!(
            resolve(&p, now, 1000, &params),
            Err(EconomicsError::Overflow(_))
        ));
    }

    #[test]
    fn test_record_overflow_leaves_totals_unchanged() {
        let mut totals = VoteTotals::new(u128::MAX - 1, 0, 0);
        assert!(matches!(
            totals.record(VoteChoice::For, 2),
            Err(EconomicsError::Overflow(_))
        ));
        assert_eq!(totals.for_votes, u128::MAX - 1);
        totals.record(VoteChoice::For, 1).unwrap();
        assert_eq!(totals.for_votes, u128::MAX);
    }
}
