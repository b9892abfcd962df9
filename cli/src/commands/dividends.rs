use anyhow::Result;
use clap::Args;
use colored::Colorize;
use parcel_economics::{distribute_dividends, AccountId, Amount, Currency, TokenHolder};
use serde::Serialize;
use std::path::PathBuf;

use super::{money, print_json, read_holders};
use crate::config::ParcelConfig;

#[derive(Args, Debug)]
pub struct DividendsArgs {
    /// Dividend pool (escrow residual after fees) as a decimal
    #[arg(long)]
    pub residual: String,

    /// JSON file with [{"accountId": ..., "tokenAmount": ...}]
    #[arg(long, value_name = "FILE")]
    pub holders: PathBuf,

    /// Total number of ownership tokens issued
    #[arg(long)]
    pub total_supply: u64,

    /// Currency of the residual
    #[arg(long)]
    pub currency: Option<Currency>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PayoutLine {
    pub account_id: AccountId,
    pub token_amount: u64,
    pub ownership_percent: f64,
    pub dividend_amount: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DividendsReport {
    pub currency: Currency,
    pub residual: String,
    pub distributed: String,
    pub unallocated: String,
    pub payouts: Vec<PayoutLine>,
}

pub fn compute(
    residual: Amount,
    holders: &[TokenHolder],
    total_supply: u64,
    currency: Currency,
) -> Result<DividendsReport> {
    let result = distribute_dividends(residual, holders, total_supply)?;
    let payouts = result
        .payouts
        .iter()
        .zip(holders)
        .map(|(payout, holder)| PayoutLine {
            account_id: payout.account_id.clone(),
            token_amount: payout.token_amount,
            ownership_percent: holder.ownership_percent(total_supply),
            dividend_amount: money(payout.dividend_amount, currency),
        })
        .collect();

    Ok(DividendsReport {
        currency,
        residual: money(residual, currency),
        distributed: money(result.distributed, currency),
        unallocated: money(result.unallocated, currency),
        payouts,
    })
}

pub fn execute(args: DividendsArgs, config: &ParcelConfig, json: bool) -> Result<()> {
    let currency = args.currency.unwrap_or(config.escrow.currency);
    let residual = Amount::from_decimal(&args.residual, currency.exponent())?;
    let holders = read_holders(&args.holders)?;
    tracing::debug!(holders = holders.len(), total_supply = args.total_supply, "Loaded token holders");

    let report = compute(residual, &holders, args.total_supply, currency)?;
    if json {
        return print_json(&report);
    }

    println!("{}", "Dividend payouts".bold());
    for line in &report.payouts {
        println!(
            "  {:<20} {:>12} tokens ({:>6.2}%)  {} {}",
            line.account_id.as_str().cyan(),
            line.token_amount,
            line.ownership_percent,
            line.dividend_amount.green(),
            report.currency
        );
    }
    println!("  Distributed: {} {}", report.distributed, report.currency);
    if report.unallocated != money(Amount::zero(), currency) {
        println!("  Unallocated: {} {}", report.unallocated.yellow(), report.currency);
    }
    Ok(())
}
