use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use colored::Colorize;
use parcel_economics::{
    resolve, summarize, AccountId, GovernanceProposal, PropertyId, ProposalStatus, TallyParams,
    TallySummary, VoteTotals,
};
use serde::Serialize;
use std::collections::HashMap;

use super::print_json;
use crate::config::ParcelConfig;

#[derive(Args, Debug)]
pub struct TallyArgs {
    /// Token-weighted votes for
    #[arg(long = "for", default_value = "0")]
    pub for_votes: u64,

    /// Token-weighted votes against
    #[arg(long = "against", default_value = "0")]
    pub against_votes: u64,

    /// Token-weighted abstentions
    #[arg(long = "abstain", default_value = "0")]
    pub abstain_votes: u64,

    /// Total number of ownership tokens issued
    #[arg(long)]
    pub total_supply: u64,

    /// Quorum percentage (defaults to the configured value)
    #[arg(long)]
    pub quorum: Option<u8>,

    /// Passing percentage (defaults to the configured value)
    #[arg(long)]
    pub passing: Option<u8>,

    /// End of the voting window (RFC 3339); omitted means already closed
    #[arg(long)]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TallyReport {
    pub status: ProposalStatus,
    pub votes: VoteTotals,
    pub total_supply: u64,
    pub params: TallyParams,
    pub summary: TallySummary,
}

pub fn run(args: &TallyArgs, config: &ParcelConfig, now: DateTime<Utc>) -> Result<TallyReport> {
    let params = TallyParams {
        quorum_percentage: args.quorum.unwrap_or(config.governance.tally.quorum_percentage),
        passing_percentage: args.passing.unwrap_or(config.governance.tally.passing_percentage),
    };
    let votes = VoteTotals::new(
        args.for_votes as u128,
        args.against_votes as u128,
        args.abstain_votes as u128,
    );
    let end_date = args.end_date.unwrap_or_else(|| now - Duration::seconds(1));

    let proposal = GovernanceProposal {
        id: 0,
        property_id: PropertyId::from("cli"),
        title: "Ad hoc tally".to_string(),
        description: String::new(),
        proposer: AccountId::from("cli"),
        votes,
        status: ProposalStatus::Active,
        created_at: end_date - config.governance.voting_period(),
        end_date,
        voters: HashMap::new(),
        resolved_at: None,
        executed_at: None,
    };

    let status = resolve(&proposal, now, args.total_supply, &params)?;
    let summary = summarize(&votes, args.total_supply, &params)?;
    Ok(TallyReport {
        status,
        votes,
        total_supply: args.total_supply,
        params,
        summary,
    })
}

pub fn execute(args: TallyArgs, config: &ParcelConfig, json: bool) -> Result<()> {
    let report = run(&args, config, Utc::now())?;
    if json {
        return print_json(&report);
    }

    let status = match report.status {
        ProposalStatus::Passed => report.status.as_str().green(),
        ProposalStatus::Rejected => report.status.as_str().red(),
        _ => report.status.as_str().yellow(),
    };
    println!("{} {}", "Proposal status:".bold(), status);
    println!(
        "  Votes cast: {} (quorum {} = {}% of {})",
        report.summary.total_cast,
        report.summary.quorum_required,
        report.params.quorum_percentage,
        report.total_supply
    );
    match report.summary.for_percentage {
        Some(share) => println!(
            "  For: {:.1}% (needs {}%)",
            share, report.params.passing_percentage
        ),
        None => println!("  No votes cast"),
    }
    Ok(())
}
