use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use parcel_economics::{
    AccountId, Amount, AuditSink, Currency, DistributionRequest, EscrowAccount, EscrowLedger,
    EscrowTransaction, PropertyId, TokenHolder, TracingAuditSink,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use super::{money, print_json, rate_or};
use crate::config::ParcelConfig;

#[derive(Args, Debug)]
pub struct CycleArgs {
    /// JSON scenario describing the account, deposits and holders
    #[arg(long, value_name = "FILE")]
    pub scenario: PathBuf,
}

/// One deposit-then-distribute run against a fresh escrow account
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub property_id: PropertyId,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub management_fee_rate: Option<String>,
    #[serde(default)]
    pub platform_fee_rate: Option<String>,
    /// Decimal deposit amounts, applied in order
    pub deposits: Vec<String>,
    pub management_recipient: AccountId,
    pub platform_recipient: AccountId,
    pub holders: Vec<TokenHolder>,
    pub total_token_supply: u64,
    /// Settlement id reported by the external transfer service
    #[serde(default)]
    pub external_tx_id: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub account: EscrowAccount,
    pub transactions: Vec<EscrowTransaction>,
}

pub fn run(scenario: &Scenario, config: &ParcelConfig, audit: Arc<dyn AuditSink>) -> Result<CycleReport> {
    let now = Utc::now();
    let currency = scenario.currency.unwrap_or(config.escrow.currency);
    let management = rate_or(scenario.management_fee_rate.as_deref(), config.escrow.management_fee_bps)?;
    let platform = rate_or(scenario.platform_fee_rate.as_deref(), config.escrow.platform_fee_bps)?;

    let ledger = EscrowLedger::new(audit);
    ledger.open_account(scenario.property_id.clone(), currency, management, platform, now)?;

    for (index, text) in scenario.deposits.iter().enumerate() {
        let amount = Amount::from_decimal(text, currency.exponent())
            .with_context(|| format!("Deposit #{} is invalid", index + 1))?;
        ledger.deposit(&scenario.property_id, amount, format!("Rental income #{}", index + 1), now)?;
    }

    let request = DistributionRequest {
        management_recipient: scenario.management_recipient.clone(),
        platform_recipient: scenario.platform_recipient.clone(),
        holders: scenario.holders.clone(),
        total_token_supply: scenario.total_token_supply,
    };
    let pending = ledger.begin_distribution(&scenario.property_id, &request, now)?;

    let external_tx_id = scenario
        .external_tx_id
        .clone()
        .unwrap_or_else(|| format!("offline-{}-{}", scenario.property_id, pending.id));
    ledger.confirm_distribution(&scenario.property_id, pending.id, external_tx_id, now)?;

    let account = ledger
        .account(&scenario.property_id)
        .context("Escrow account vanished after distribution")?;
    Ok(CycleReport {
        account,
        transactions: ledger.transactions(&scenario.property_id),
    })
}

pub fn execute(args: CycleArgs, config: &ParcelConfig, json: bool) -> Result<()> {
    let content = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("Failed to read scenario {}", args.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse scenario {}", args.scenario.display()))?;

    let report = run(&scenario, config, Arc::new(TracingAuditSink))?;
    if json {
        return print_json(&report);
    }

    let currency = report.account.currency;
    println!("{} {}", "Escrow ledger for".bold(), report.account.property_id.as_str().cyan());
    for tx in &report.transactions {
        let recipient = tx.recipient.as_ref().map(|r| r.as_str()).unwrap_or("-");
        println!(
            "  #{:<4} {:<22} {:>14} {}  {}",
            tx.id,
            format!("{:?}", tx.kind),
            money(tx.amount, currency),
            currency,
            recipient
        );
    }
    println!(
        "  Balance: {} {}  Total distributed: {} {}",
        money(report.account.balance, currency),
        currency,
        money(report.account.total_distributed, currency).green(),
        currency
    );
    Ok(())
}
