//! Status enums for the two lifecycle entities.
//!
//! Both enums round-trip through their lowercase wire/database strings; the
//! stores persist them as `TEXT` and the API accepts them verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three-state approval lifecycle of an indication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicationStatus {
    Scheduled,
    Approved,
    Rejected,
}

impl IndicationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for IndicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!(
                "invalid indication status '{other}'; expected scheduled, approved, or rejected"
            )),
        }
    }
}

/// Payment state of a single commission installment.
///
/// `Cancelled` is reserved for the reconciliation path; manual status
/// updates may only move between the other three states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InstallmentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a manual status-update request may set this status.
    #[must_use]
    pub fn is_manually_settable(self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!(
                "invalid installment status '{other}'; expected pending, paid, overdue, or cancelled"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indication_status_round_trips_through_strings() {
        for status in [
            IndicationStatus::Scheduled,
            IndicationStatus::Approved,
            IndicationStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<IndicationStatus>(), Ok(status));
        }
    }

    #[test]
    fn indication_status_rejects_unknown_values() {
        assert!("aprovado".parse::<IndicationStatus>().is_err());
        assert!("".parse::<IndicationStatus>().is_err());
    }

    #[test]
    fn installment_status_serializes_lowercase() {
        let json = serde_json::to_string(&InstallmentStatus::Overdue).expect("serialize");
        assert_eq!(json, "\"overdue\"");
    }

    #[test]
    fn cancelled_is_not_manually_settable() {
        assert!(!InstallmentStatus::Cancelled.is_manually_settable());
        assert!(InstallmentStatus::Paid.is_manually_settable());
    }
}
