pub mod cycle;
pub mod dividends;
pub mod fees;
pub mod tally;

use anyhow::{Context, Result};
use parcel_economics::{Currency, FeeRate, TokenHolder};
use serde::Serialize;
use std::path::Path;

/// Print `value` as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Read a `[{accountId, tokenAmount}]` list from a JSON file
pub fn read_holders(path: &Path) -> Result<Vec<TokenHolder>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read holders file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse holders file {}", path.display()))
}

/// Rate given on the command line, or the configured default
pub fn rate_or(text: Option<&str>, default: FeeRate) -> Result<FeeRate> {
    match text {
        Some(text) => Ok(FeeRate::from_percent(text)?),
        None => Ok(default),
    }
}

/// Decimal text of a minor-unit amount in `currency`
pub fn money(amount: parcel_economics::Amount, currency: Currency) -> String {
    amount.to_decimal(currency.exponent())
}
