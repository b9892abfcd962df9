// parcel/core/economics/src/distribution.rs

//! Escrow fee and dividend arithmetic.
//!
//! Both calculations are pure: they neither touch the ledger nor move funds.
//! Rounding never creates value:
//! - each fee is rounded down to the smallest currency unit and the remainder
//!   stays in the residual, so `management + platform + residual == balance`
//! - dividends are floored per holder and, when the holders cover the whole
//!   supply, the leftover units go to the largest fractional remainders
//!   (ties in input order), so the payouts sum to the residual exactly

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{EconomicsError, Result};
use crate::types::{AccountId, Amount, FeeRate, TokenHolder, BPS_DENOMINATOR};

/// Fee split of one escrow balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub management_fee: Amount,
    pub platform_fee: Amount,
    /// Dividend pool left after fees
    pub residual: Amount,
}

impl FeeBreakdown {
    pub fn total_fees(&self) -> Result<Amount> {
        self.management_fee.checked_add(self.platform_fee)
    }
}

/// Dividend owed to one holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendPayout {
    pub account_id: AccountId,
    pub token_amount: u64,
    pub dividend_amount: Amount,
}

/// Result of splitting a residual across holders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendDistribution {
    /// Payouts in the same order as the input holders
    pub payouts: Vec<DividendPayout>,
    /// Sum of all payouts
    pub distributed: Amount,
    /// Part of the residual attributable to tokens no listed holder owns
    pub unallocated: Amount,
}

/// Split `balance` into management fee, platform fee and residual
pub fn compute_fees(
    balance: Amount,
    management_fee_rate: FeeRate,
    platform_fee_rate: FeeRate,
) -> Result<FeeBreakdown> {
    if management_fee_rate.bps() + platform_fee_rate.bps() > BPS_DENOMINATOR {
        return Err(EconomicsError::InvalidRate(format!(
            "combined fees {} + {} exceed 100%",
            management_fee_rate, platform_fee_rate
        )));
    }

    let management_fee = management_fee_rate.apply(balance)?;
    let platform_fee = platform_fee_rate.apply(balance)?;
    let residual = balance
        .checked_sub(management_fee)?
        .checked_sub(platform_fee)?;

    tracing::debug!(
        balance = %balance,
        management_fee = %management_fee,
        platform_fee = %platform_fee,
        residual = %residual,
        "Computed escrow fees"
    );

    Ok(FeeBreakdown {
        management_fee,
        platform_fee,
        residual,
    })
}

/// Split `residual` pro rata across `holders` by token balance
pub fn distribute_dividends(
    residual: Amount,
    holders: &[TokenHolder],
    total_token_supply: u64,
) -> Result<DividendDistribution> {
    if total_token_supply == 0 {
        return Err(EconomicsError::DivideByZero("total token supply"));
    }

    let mut seen = HashSet::with_capacity(holders.len());
    let mut held: u128 = 0;
    for holder in holders {
        if !seen.insert(&holder.account_id) {
            return Err(EconomicsError::DuplicateHolder(holder.account_id.clone()));
        }
        held += holder.token_amount as u128;
    }
    if held > total_token_supply as u128 {
        return Err(EconomicsError::HoldingsExceedSupply {
            held,
            supply: total_token_supply,
        });
    }

    let supply = U256::from(total_token_supply);
    let mut shares = Vec::with_capacity(holders.len());
    let mut remainders = Vec::with_capacity(holders.len());
    let mut distributed = U256::zero();
    for holder in holders {
        let weighted = residual
            .minor_units()
            .checked_mul(U256::from(holder.token_amount))
            .ok_or(EconomicsError::Overflow("dividend calculation"))?;
        let share = weighted / supply;
        distributed += share;
        shares.push(share);
        remainders.push(weighted % supply);
    }

    // Only a fully covered supply may absorb the rounding leftover
    if held == total_token_supply as u128 {
        let leftover = residual.minor_units() - distributed;
        let mut order: Vec<usize> = (0..holders.len()).collect();
        order.sort_by(|a, b| remainders[*b].cmp(&remainders[*a]).then(a.cmp(b)));
        // leftover < number of holders with a non-zero remainder
        for &index in order.iter().take(leftover.as_usize()) {
            shares[index] += U256::one();
        }
        distributed += leftover;
    }

    let payouts = holders
        .iter()
        .zip(shares)
        .map(|(holder, share)| DividendPayout {
            account_id: holder.account_id.clone(),
            token_amount: holder.token_amount,
            dividend_amount: Amount::from_u256(share),
        })
        .collect();
    let distributed = Amount::from_u256(distributed);
    let unallocated = residual.checked_sub(distributed)?;

    tracing::debug!(
        residual = %residual,
        holders = holders.len(),
        distributed = %distributed,
        unallocated = %unallocated,
        "Computed dividend payouts"
    );

    Ok(DividendDistribution {
        payouts,
        distributed,
        unallocated,
    })
}
