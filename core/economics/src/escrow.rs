// parcel/core/economics/src/escrow.rs

//! Escrow accounts and their append-only transaction log.
//!
//! Distribution is a two-step command. `begin_distribution` computes fees and
//! dividends and parks them as a [`PendingDistribution`]; nothing on the
//! account changes until `confirm_distribution` is called with the id of the
//! external transfer that moved the funds. At most one distribution per
//! account can be pending.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::audit::{AuditEvent, AuditRecord, AuditSink};
use crate::distribution::{self, DividendDistribution, FeeBreakdown};
use crate::error::{EconomicsError, Result};
use crate::types::{AccountId, Amount, Currency, FeeRate, PropertyId, TokenHolder};

/// Collected funds of one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowAccount {
    pub property_id: PropertyId,
    pub balance: Amount,
    pub currency: Currency,
    pub management_fee_rate: FeeRate,
    pub platform_fee_rate: FeeRate,
    /// Sum of all dividends paid out
    pub total_distributed: Amount,
    pub last_distribution: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    FeeDistribution,
    DividendDistribution,
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowTransaction {
    pub id: u64,
    pub property_id: PropertyId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Amount,
    pub currency: Currency,
    pub recipient: Option<AccountId>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// Id of the external transfer that settled this entry
    pub external_tx_id: Option<String>,
}

/// Ledger entry that has been computed but not yet settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Amount,
    pub recipient: Option<AccountId>,
    pub description: String,
}

/// Inputs for one distribution cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionRequest {
    pub management_recipient: AccountId,
    pub platform_recipient: AccountId,
    pub holders: Vec<TokenHolder>,
    pub total_token_supply: u64,
}

/// A computed distribution awaiting settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDistribution {
    pub id: u64,
    pub property_id: PropertyId,
    /// Balance the fees were computed from
    pub snapshot_balance: Amount,
    pub fees: FeeBreakdown,
    pub dividends: DividendDistribution,
    pub drafts: Vec<TransactionDraft>,
    pub created_at: DateTime<Utc>,
}

impl PendingDistribution {
    /// Amount that leaves escrow once this distribution settles
    pub fn outflow(&self) -> Result<Amount> {
        self.fees.total_fees()?.checked_add(self.dividends.distributed)
    }
}

struct AccountEntry {
    account: EscrowAccount,
    pending: Option<PendingDistribution>,
}

/// In-process escrow ledger.
///
/// Every command holds the write lock for its full duration, audit record
/// included. Two distributions of the same balance can never both be
/// computed, and the audit sink sees commands in commit order.
pub struct EscrowLedger {
    accounts: RwLock<HashMap<PropertyId, AccountEntry>>,
    transactions: RwLock<Vec<EscrowTransaction>>,
    next_transaction_id: AtomicU64,
    next_distribution_id: AtomicU64,
    audit: Arc<dyn AuditSink>,
}

impl EscrowLedger {
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            transactions: RwLock::new(Vec::new()),
            next_transaction_id: AtomicU64::new(1),
            next_distribution_id: AtomicU64::new(1),
            audit,
        }
    }

    pub fn open_account(
        &self,
        property_id: PropertyId,
        currency: Currency,
        management_fee_rate: FeeRate,
        platform_fee_rate: FeeRate,
        now: DateTime<Utc>,
    ) -> Result<EscrowAccount> {
        // combined rates above 100% would fail every later distribution
        distribution::compute_fees(Amount::zero(), management_fee_rate, platform_fee_rate)?;

        let mut accounts = self.accounts.write();
        if accounts.contains_key(&property_id) {
            return Err(EconomicsError::AccountExists(property_id));
        }

        let account = EscrowAccount {
            property_id: property_id.clone(),
            balance: Amount::zero(),
            currency,
            management_fee_rate,
            platform_fee_rate,
            total_distributed: Amount::zero(),
            last_distribution: None,
            created_at: now,
        };
        accounts.insert(
            property_id.clone(),
            AccountEntry {
                account: account.clone(),
                pending: None,
            },
        );

        tracing::info!(
            property_id = %property_id,
            currency = %currency,
            management_fee = %management_fee_rate,
            platform_fee = %platform_fee_rate,
            "Opened escrow account"
        );
        Ok(account)
    }

    /// Credit rental income to the account
    pub fn deposit(
        &self,
        property_id: &PropertyId,
        amount: Amount,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<EscrowTransaction> {
        if amount.is_zero() {
            return Err(EconomicsError::InvalidAmount("deposit must be positive".to_string()));
        }

        let mut accounts = self.accounts.write();
        let entry = accounts
            .get_mut(property_id)
            .ok_or_else(|| EconomicsError::AccountNotFound(property_id.clone()))?;
        entry.account.balance = entry.account.balance.checked_add(amount)?;

        let transaction = EscrowTransaction {
            id: self.next_transaction_id.fetch_add(1, Ordering::SeqCst),
            property_id: property_id.clone(),
            kind: TransactionKind::Deposit,
            amount,
            currency: entry.account.currency,
            recipient: None,
            description: description.into(),
            timestamp: now,
            external_tx_id: None,
        };
        self.transactions.write().push(transaction.clone());
        let balance = entry.account.balance;

        tracing::info!(property_id = %property_id, amount = %amount, balance = %balance, "Escrow deposit");
        self.audit.record(AuditRecord {
            property_id: property_id.clone(),
            timestamp: now,
            event: AuditEvent::EscrowDeposit {
                transaction_id: transaction.id,
                amount,
            },
        });
        drop(accounts);
        Ok(transaction)
    }

    /// Compute fees and dividends for the current balance and park them
    pub fn begin_distribution(
        &self,
        property_id: &PropertyId,
        request: &DistributionRequest,
        now: DateTime<Utc>,
    ) -> Result<PendingDistribution> {
        let mut accounts = self.accounts.write();
        let entry = accounts
            .get_mut(property_id)
            .ok_or_else(|| EconomicsError::AccountNotFound(property_id.clone()))?;

        if let Some(pending) = &entry.pending {
            tracing::warn!(
                property_id = %property_id,
                distribution_id = pending.id,
                "Distribution already in flight"
            );
            return Err(EconomicsError::DistributionInFlight {
                property_id: property_id.clone(),
                distribution_id: pending.id,
            });
        }
        let account = &entry.account;
        if account.balance.is_zero() {
            return Err(EconomicsError::EmptyEscrow(property_id.clone()));
        }

        let fees = distribution::compute_fees(
            account.balance,
            account.management_fee_rate,
            account.platform_fee_rate,
        )?;
        let dividends =
            distribution::distribute_dividends(fees.residual, &request.holders, request.total_token_supply)?;
        let drafts = build_drafts(account, request, &fees, &dividends);

        let pending = PendingDistribution {
            id: self.next_distribution_id.fetch_add(1, Ordering::SeqCst),
            property_id: property_id.clone(),
            snapshot_balance: account.balance,
            fees,
            dividends,
            drafts,
            created_at: now,
        };
        entry.pending = Some(pending.clone());

        tracing::info!(
            property_id = %property_id,
            distribution_id = pending.id,
            balance = %pending.snapshot_balance,
            drafts = pending.drafts.len(),
            "Distribution pending confirmation"
        );
        self.audit.record(AuditRecord {
            property_id: property_id.clone(),
            timestamp: now,
            event: AuditEvent::DistributionProposed {
                distribution_id: pending.id,
                management_fee: pending.fees.management_fee,
                platform_fee: pending.fees.platform_fee,
                dividends: pending.dividends.distributed,
                holders: pending.dividends.payouts.len(),
            },
        });
        drop(accounts);
        Ok(pending)
    }

    /// Commit a pending distribution once the external transfer settled
    pub fn confirm_distribution(
        &self,
        property_id: &PropertyId,
        distribution_id: u64,
        external_tx_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<EscrowTransaction>> {
        let external_tx_id = external_tx_id.into();
        let mut accounts = self.accounts.write();
        let entry = accounts
            .get_mut(property_id)
            .ok_or_else(|| EconomicsError::AccountNotFound(property_id.clone()))?;

        // every fallible step runs before the account or the pending slot changes
        let pending = pending_ref(entry, property_id, distribution_id)?;
        let outflow = pending.outflow()?;
        let balance = entry.account.balance.checked_sub(outflow)?;
        let total_distributed = entry
            .account
            .total_distributed
            .checked_add(pending.dividends.distributed)?;

        let pending = take_pending(entry, property_id, distribution_id)?;
        entry.account.balance = balance;
        entry.account.total_distributed = total_distributed;
        entry.account.last_distribution = Some(now);

        let currency = entry.account.currency;
        let committed: Vec<EscrowTransaction> = pending
            .drafts
            .iter()
            .map(|draft| EscrowTransaction {
                id: self.next_transaction_id.fetch_add(1, Ordering::SeqCst),
                property_id: property_id.clone(),
                kind: draft.kind,
                amount: draft.amount,
                currency,
                recipient: draft.recipient.clone(),
                description: draft.description.clone(),
                timestamp: now,
                external_tx_id: Some(external_tx_id.clone()),
            })
            .collect();
        self.transactions.write().extend(committed.iter().cloned());

        tracing::info!(
            property_id = %property_id,
            distribution_id,
            external_tx_id = %external_tx_id,
            outflow = %outflow,
            balance = %balance,
            "Distribution confirmed"
        );
        self.audit.record(AuditRecord {
            property_id: property_id.clone(),
            timestamp: now,
            event: AuditEvent::DistributionConfirmed {
                distribution_id,
                external_tx_id,
                transactions: committed.len(),
            },
        });
        drop(accounts);
        Ok(committed)
    }

    /// Drop a pending distribution without touching the balance
    pub fn abort_distribution(
        &self,
        property_id: &PropertyId,
        distribution_id: u64,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let reason = reason.into();
        let mut accounts = self.accounts.write();
        let entry = accounts
            .get_mut(property_id)
            .ok_or_else(|| EconomicsError::AccountNotFound(property_id.clone()))?;
        take_pending(entry, property_id, distribution_id)?;

        tracing::warn!(property_id = %property_id, distribution_id, reason = %reason, "Distribution aborted");
        self.audit.record(AuditRecord {
            property_id: property_id.clone(),
            timestamp: now,
            event: AuditEvent::DistributionAborted {
                distribution_id,
                reason,
            },
        });
        drop(accounts);
        Ok(())
    }

    pub fn account(&self, property_id: &PropertyId) -> Option<EscrowAccount> {
        self.accounts.read().get(property_id).map(|e| e.account.clone())
    }

    pub fn pending(&self, property_id: &PropertyId) -> Option<PendingDistribution> {
        self.accounts.read().get(property_id).and_then(|e| e.pending.clone())
    }

    /// Ledger entries for one property, oldest first
    pub fn transactions(&self, property_id: &PropertyId) -> Vec<EscrowTransaction> {
        self.transactions
            .read()
            .iter()
            .filter(|t| &t.property_id == property_id)
            .cloned()
            .collect()
    }
}

fn pending_ref<'a>(
    entry: &'a AccountEntry,
    property_id: &PropertyId,
    distribution_id: u64,
) -> Result<&'a PendingDistribution> {
    entry
        .pending
        .as_ref()
        .filter(|pending| pending.id == distribution_id)
        .ok_or_else(|| EconomicsError::UnknownDistribution {
            property_id: property_id.clone(),
            distribution_id,
        })
}

fn take_pending(
    entry: &mut AccountEntry,
    property_id: &PropertyId,
    distribution_id: u64,
) -> Result<PendingDistribution> {
    match entry.pending.take() {
        Some(pending) if pending.id == distribution_id => Ok(pending),
        other => {
            entry.pending = other;
            Err(EconomicsError::UnknownDistribution {
                property_id: property_id.clone(),
                distribution_id,
            })
        }
    }
}

fn build_drafts(
    account: &EscrowAccount,
    request: &DistributionRequest,
    fees: &FeeBreakdown,
    dividends: &DividendDistribution,
) -> Vec<TransactionDraft> {
    let mut drafts = vec![
        TransactionDraft {
            kind: TransactionKind::FeeDistribution,
            amount: fees.management_fee,
            recipient: Some(request.management_recipient.clone()),
            description: format!("Management fee ({})", account.management_fee_rate),
        },
        TransactionDraft {
            kind: TransactionKind::FeeDistribution,
            amount: fees.platform_fee,
            recipient: Some(request.platform_recipient.clone()),
            description: format!("Platform fee ({})", account.platform_fee_rate),
        },
    ];
    drafts.extend(dividends.payouts.iter().map(|payout| TransactionDraft {
        kind: TransactionKind::DividendDistribution,
        amount: payout.dividend_amount,
        recipient: Some(payout.account_id.clone()),
        description: format!(
            "Dividend for {} tokens of {}",
            payout.token_amount, request.total_token_supply
        ),
    }));
    // ledger entries are strictly positive
    drafts.retain(|d| !d.amount.is_zero());
    drafts
}
