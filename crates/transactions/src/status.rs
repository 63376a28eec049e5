use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionStatus {
    /// Submitted to the backend, not yet processed.
    Submitted,

    /// Waiting on AML screening.
    PendingAmlScreening,

    /// Waiting on enrichment.
    PendingEnrichment,

    /// Waiting on policy authorization.
    PendingAuthorization,

    /// Queued behind other transactions from the same source.
    Queued,

    /// Waiting for the device to sign.
    PendingSignature,

    /// Waiting for manual approval at a third party.
    Pending3rdPartyManualApproval,

    /// Waiting on a third party.
    Pending3rdParty,

    /// Being broadcast to the network.
    Broadcasting,

    /// On chain, waiting for confirmations.
    Confirming,

    /// Done.
    Completed,

    /// Cancellation in progress.
    Cancelling,

    /// Cancelled.
    Cancelled,

    /// Blocked by policy.
    Blocked,

    /// Rejected by a signer or the network.
    Rejected,

    /// Failed.
    Failed,

    /// A status this client does not know about.
    Unknown(String),
}

impl TransactionStatus {
    /// Whether the transaction has reached a terminal state and can no longer
    /// change.
    ///
    /// Unknown statuses are treated as non-final so they keep being polled.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Cancelled | Self::Blocked | Self::Rejected | Self::Failed
        )
    }

    /// The wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::PendingAmlScreening => "PENDING_AML_SCREENING",
            Self::PendingEnrichment => "PENDING_ENRICHMENT",
            Self::PendingAuthorization => "PENDING_AUTHORIZATION",
            Self::Queued => "QUEUED",
            Self::PendingSignature => "PENDING_SIGNATURE",
            Self::Pending3rdPartyManualApproval => "PENDING_3RD_PARTY_MANUAL_APPROVAL",
            Self::Pending3rdParty => "PENDING_3RD_PARTY",
            Self::Broadcasting => "BROADCASTING",
            Self::Confirming => "CONFIRMING",
            Self::Completed => "COMPLETED",
            Self::Cancelling => "CANCELLING",
            Self::Cancelled => "CANCELLED",
            Self::Blocked => "BLOCKED",
            Self::Rejected => "REJECTED",
            Self::Failed => "FAILED",
            Self::Unknown(status) => status,
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "SUBMITTED" => Self::Submitted,
            "PENDING_AML_SCREENING" => Self::PendingAmlScreening,
            "PENDING_ENRICHMENT" => Self::PendingEnrichment,
            "PENDING_AUTHORIZATION" => Self::PendingAuthorization,
            "QUEUED" => Self::Queued,
            "PENDING_SIGNATURE" => Self::PendingSignature,
            "PENDING_3RD_PARTY_MANUAL_APPROVAL" => Self::Pending3rdPartyManualApproval,
            "PENDING_3RD_PARTY" => Self::Pending3rdParty,
            "BROADCASTING" => Self::Broadcasting,
            "CONFIRMING" => Self::Confirming,
            "COMPLETED" => Self::Completed,
            "CANCELLING" => Self::Cancelling,
            "CANCELLED" => Self::Cancelled,
            "BLOCKED" => Self::Blocked,
            "REJECTED" => Self::Rejected,
            "FAILED" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        })
    }
}

impl From<String> for TransactionStatus {
    fn from(status: String) -> Self {
        match status.parse() {
            Ok(status) => status,
            Err(infallible) => match infallible {},
        }
    }
}

impl From<TransactionStatus> for String {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Unknown(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses_are_final() {
        for status in ["COMPLETED", "CANCELLED", "BLOCKED", "REJECTED", "FAILED"] {
            assert!(TransactionStatus::from(status.to_string()).is_final(), "{status}");
        }
    }

    #[test]
    fn test_in_flight_statuses_are_not_final() {
        for status in [
            "SUBMITTED",
            "QUEUED",
            "PENDING_SIGNATURE",
            "BROADCASTING",
            "CONFIRMING",
            "CANCELLING",
        ] {
            assert!(!TransactionStatus::from(status.to_string()).is_final(), "{status}");
        }
    }

    #[test]
    fn test_unknown_status_is_kept_verbatim() {
        let status = TransactionStatus::from("PARTIALLY_COMPLETED".to_string());

        assert_eq!(
            status,
            TransactionStatus::Unknown("PARTIALLY_COMPLETED".to_string())
        );
        assert!(!status.is_final());
        assert_eq!(String::from(status), "PARTIALLY_COMPLETED");
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&TransactionStatus::Pending3rdPartyManualApproval).unwrap();
        assert_eq!(json, "\"PENDING_3RD_PARTY_MANUAL_APPROVAL\"");

        let status: TransactionStatus = serde_json::from_str("\"CONFIRMING\"").unwrap();
        assert_eq!(status, TransactionStatus::Confirming);
    }
}
