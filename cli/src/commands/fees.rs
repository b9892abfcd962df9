use anyhow::Result;
use clap::Args;
use colored::Colorize;
use parcel_economics::{compute_fees, Amount, Currency, FeeBreakdown};
use serde::Serialize;

use super::{money, print_json, rate_or};
use crate::config::ParcelConfig;

#[derive(Args, Debug)]
pub struct FeesArgs {
    /// Escrow balance as a decimal (e.g. 12500 or 12500.00)
    #[arg(long)]
    pub balance: String,

    /// Management fee percentage (defaults to the configured rate)
    #[arg(long)]
    pub management_rate: Option<String>,

    /// Platform fee percentage (defaults to the configured rate)
    #[arg(long)]
    pub platform_rate: Option<String>,

    /// Currency of the balance
    #[arg(long)]
    pub currency: Option<Currency>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeesReport {
    pub currency: Currency,
    pub balance: String,
    pub management_fee: String,
    pub platform_fee: String,
    pub residual: String,
}

impl FeesReport {
    fn new(balance: Amount, fees: &FeeBreakdown, currency: Currency) -> Self {
        Self {
            currency,
            balance: money(balance, currency),
            management_fee: money(fees.management_fee, currency),
            platform_fee: money(fees.platform_fee, currency),
            residual: money(fees.residual, currency),
        }
    }
}

pub fn run(args: &FeesArgs, config: &ParcelConfig) -> Result<FeesReport> {
    let currency = args.currency.unwrap_or(config.escrow.currency);
    let balance = Amount::from_decimal(&args.balance, currency.exponent())?;
    let management = rate_or(args.management_rate.as_deref(), config.escrow.management_fee_bps)?;
    let platform = rate_or(args.platform_rate.as_deref(), config.escrow.platform_fee_bps)?;

    let fees = compute_fees(balance, management, platform)?;
    Ok(FeesReport::new(balance, &fees, currency))
}

pub fn execute(args: FeesArgs, config: &ParcelConfig, json: bool) -> Result<()> {
    let report = run(&args, config)?;
    if json {
        return print_json(&report);
    }

    println!("{}", "Escrow fee breakdown".bold());
    println!("  Balance:        {} {}", report.balance, report.currency);
    println!("  Management fee: {}", report.management_fee.yellow());
    println!("  Platform fee:   {}", report.platform_fee.yellow());
    println!("  Dividend pool:  {}", report.residual.green());
    Ok(())
}
