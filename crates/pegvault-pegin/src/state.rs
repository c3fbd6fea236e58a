//! Peg-in lifecycle.
//!
//! Two independently sourced snapshots are merged here: the contract status
//! read from chain, which wins whenever it is known, and the locally tracked
//! progress of the depositor's own actions. Nothing in this module performs
//! I/O or mutates anything.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Vault status as reported by the registration contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    /// Registered, payout transactions not yet signed off by the depositor
    Pending,
    /// Depositor signatures verified, peg-in may be broadcast
    Verified,
    /// Peg-in confirmed, vault is live
    Active,
}

impl FromStr for ContractStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(ContractStatus::Pending),
            "verified" => Ok(ContractStatus::Verified),
            "active" => Ok(ContractStatus::Active),
            other => Err(format!("Unknown contract status: {}", other)),
        }
    }
}

/// Locally tracked progress.
///
/// Variants are declared in lifecycle order; the derived ordering is the
/// progress order and local status only ever moves up it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocalStorageStatus {
    Created,
    PayoutSigned,
    Broadcasting,
    Confirming,
}

impl LocalStorageStatus {
    /// The later of two statuses.
    pub fn advance(self, to: LocalStorageStatus) -> LocalStorageStatus {
        self.max(to)
    }
}

impl fmt::Display for LocalStorageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocalStorageStatus::Created => "CREATED",
            LocalStorageStatus::PayoutSigned => "PAYOUT_SIGNED",
            LocalStorageStatus::Broadcasting => "BROADCASTING",
            LocalStorageStatus::Confirming => "CONFIRMING",
        };
        f.write_str(s)
    }
}

/// What the depositor can do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeginAction {
    SignPayoutTransactions,
    SignAndBroadcastToBitcoin,
    Redeem,
}

impl PeginAction {
    /// Local status recorded once this action succeeds.
    ///
    /// Redeeming happens after the vault is live and leaves local tracking alone.
    pub fn resulting_status(&self) -> Option<LocalStorageStatus> {
        match self {
            PeginAction::SignPayoutTransactions => Some(LocalStorageStatus::PayoutSigned),
            PeginAction::SignAndBroadcastToBitcoin => Some(LocalStorageStatus::Confirming),
            PeginAction::Redeem => None,
        }
    }
}

/// Status after `action` completes on a record currently at `current`.
///
/// Applying the same action twice yields the same status as applying it once.
pub fn status_after(current: LocalStorageStatus, action: PeginAction) -> LocalStorageStatus {
    match action.resulting_status() {
        Some(next) => current.advance(next),
        None => current,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayVariant {
    /// Waiting on someone else
    Pending,
    /// The depositor has something to do
    ActionRequired,
    Active,
}

/// Label, styling hint and permitted action for one peg-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeginDisplayState {
    pub label: &'static str,
    pub variant: DisplayVariant,
    pub next_action: Option<PeginAction>,
}

impl PeginDisplayState {
    fn new(label: &'static str, variant: DisplayVariant, next_action: Option<PeginAction>) -> Self {
        Self {
            label,
            variant,
            next_action,
        }
    }
}

/// Merge contract and local status into what the depositor sees.
///
/// A missing local record is treated as [`LocalStorageStatus::Created`].
/// `transactions_ready` reports whether the payout transactions the depositor
/// must sign have been published by the vault provider.
pub fn peg_in_display_state(
    contract: ContractStatus,
    local: Option<LocalStorageStatus>,
    transactions_ready: bool,
) -> PeginDisplayState {
    use DisplayVariant::*;
    use LocalStorageStatus::*;

    let local = local.unwrap_or(Created);

    match contract {
        ContractStatus::Active => {
            PeginDisplayState::new("In Position", Active, Some(PeginAction::Redeem))
        }
        ContractStatus::Verified => match local {
            Confirming => PeginDisplayState::new("Confirming", Pending, None),
            Broadcasting => PeginDisplayState::new(
                "Broadcasting",
                ActionRequired,
                Some(PeginAction::SignAndBroadcastToBitcoin),
            ),
            Created | PayoutSigned => PeginDisplayState::new(
                "Ready to Broadcast",
                ActionRequired,
                Some(PeginAction::SignAndBroadcastToBitcoin),
            ),
        },
        ContractStatus::Pending => {
            if local >= PayoutSigned {
                PeginDisplayState::new("Awaiting Verification", Pending, None)
            } else if transactions_ready {
                PeginDisplayState::new(
                    "Ready to Sign",
                    ActionRequired,
                    Some(PeginAction::SignPayoutTransactions),
                )
            } else {
                PeginDisplayState::new("Preparing Payouts", Pending, None)
            }
        }
    }
}
