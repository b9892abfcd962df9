// parcel/core/economics/src/types.rs

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EconomicsError, Result};

/// Basis points in one hundred percent
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Identifier of a tokenized property (one escrow account per property)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub String);

/// Identifier of a ledger account (token holder, fee recipient, voter)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(PropertyId);
string_id!(AccountId);

/// Settlement currency of an escrow account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Hbar,
}

impl Currency {
    /// Number of decimal places in the smallest currency unit
    pub fn exponent(&self) -> u32 {
        match self {
            Currency::Usd | Currency::Eur | Currency::Gbp => 2,
            Currency::Hbar => 8,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Hbar => "HBAR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = EconomicsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "HBAR" => Ok(Currency::Hbar),
            other => Err(EconomicsError::InvalidInput(format!("unknown currency {}", other))),
        }
    }
}

/// Money held as a count of the currency's smallest unit.
///
/// Serialized as a decimal string of minor units so that values beyond
/// 2^53 survive JSON round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(U256);

impl Amount {
    pub fn zero() -> Self {
        Amount(U256::zero())
    }

    pub fn from_minor(units: u128) -> Self {
        Amount(U256::from(units))
    }

    pub fn from_u256(units: U256) -> Self {
        Amount(units)
    }

    /// Raw count of minor units
    pub fn minor_units(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Amount) -> Result<Amount> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(EconomicsError::Overflow("amount addition"))
    }

    pub fn checked_sub(self, other: Amount) -> Result<Amount> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or_else(|| EconomicsError::NegativeAmount(format!("{} - {}", self, other)))
    }

    /// Parse decimal text ("12187.5") into minor units using `exponent` decimals
    pub fn from_decimal(text: &str, exponent: u32) -> Result<Self> {
        let text = text.trim();
        if text.starts_with('-') {
            return Err(EconomicsError::NegativeAmount(text.to_string()));
        }
        let unsigned = text.strip_prefix('+').unwrap_or(text);
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
            return Err(EconomicsError::InvalidAmount(text.to_string()));
        }
        let exp = exponent as usize;
        if fraction.len() > exp {
            return Err(EconomicsError::InvalidAmount(format!(
                "{} has more than {} decimal places",
                text, exponent
            )));
        }

        let digits = format!("{}{}{}", whole, fraction, "0".repeat(exp - fraction.len()));
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Amount::zero());
        }
        U256::from_dec_str(digits)
            .map(Amount)
            .map_err(|_| EconomicsError::InvalidAmount(text.to_string()))
    }

    /// Render as decimal text with exactly `exponent` fractional digits
    pub fn to_decimal(&self, exponent: u32) -> String {
        let digits = self.0.to_string();
        if exponent == 0 {
            return digits;
        }
        let exp = exponent as usize;
        let padded = format!("{:0>width$}", digits, width = exp + 1);
        let (whole, fraction) = padded.split_at(padded.len() - exp);
        format!("{}.{}", whole, fraction)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Amount {
    type Error = EconomicsError;

    fn try_from(value: String) -> Result<Self> {
        Amount::from_decimal(&value, 0)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.0.to_string()
    }
}

/// A percentage rate held in basis points, always within [0, 100]%
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct FeeRate(u32);

impl FeeRate {
    pub fn from_bps(bps: u32) -> Result<Self> {
        if bps > BPS_DENOMINATOR {
            return Err(EconomicsError::InvalidRate(format!(
                "{} bps is outside [0, {}]",
                bps, BPS_DENOMINATOR
            )));
        }
        Ok(FeeRate(bps))
    }

    /// Parse a percentage such as "2" or "0.5" (at most two decimals)
    pub fn from_percent(text: &str) -> Result<Self> {
        let bps = Amount::from_decimal(text, 2)
            .map_err(|_| EconomicsError::InvalidRate(format!("{}% is not a valid rate", text.trim())))?;
        if bps.minor_units() > U256::from(BPS_DENOMINATOR) {
            return Err(EconomicsError::InvalidRate(format!("{}% exceeds 100%", text.trim())));
        }
        Ok(FeeRate(bps.minor_units().low_u32()))
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    pub fn percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Share of `amount` at this rate, rounded down to the smallest unit
    pub fn apply(&self, amount: Amount) -> Result<Amount> {
        let scaled = amount
            .minor_units()
            .checked_mul(U256::from(self.0))
            .ok_or(EconomicsError::Overflow("fee calculation"))?;
        Ok(Amount(scaled / U256::from(BPS_DENOMINATOR)))
    }
}

impl TryFrom<u32> for FeeRate {
    type Error = EconomicsError;

    fn try_from(bps: u32) -> Result<Self> {
        FeeRate::from_bps(bps)
    }
}

impl From<FeeRate> for u32 {
    fn from(rate: FeeRate) -> Self {
        rate.0
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// An account and the number of ownership tokens it holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolder {
    pub account_id: AccountId,
    pub token_amount: u64,
}

impl TokenHolder {
    pub fn new(account_id: impl Into<String>, token_amount: u64) -> Self {
        Self {
            account_id: AccountId::new(account_id),
            token_amount,
        }
    }

    /// Ownership stake as a percentage of `total_supply`
    pub fn ownership_percent(&self, total_supply: u64) -> f64 {
        if total_supply == 0 {
            return 0.0;
        }
        self.token_amount as f64 / total_supply as f64 * 100.0
    }
}
