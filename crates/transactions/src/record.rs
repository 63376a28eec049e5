use crate::{DecodeError, TransactionDetails, TransactionStatus};

use serde::{Deserialize, Serialize};
use serde_json::Value;

const UNKNOWN_ID: &str = "<unknown>";

/// A transaction exactly as the listing API returns it. Every field is
/// optional; nothing is trusted until [`TransactionRecord::try_from`] runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    /// Transaction id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Wire status string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,

    /// Creation time in milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,

    /// Last modification time in milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<u64>,

    /// Everything else.
    #[serde(flatten)]
    pub details: TransactionDetails,
}

/// A validated transaction as handed to consumers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Transaction id.
    pub id: String,

    /// Current lifecycle state.
    pub status: TransactionStatus,

    /// Creation time in milliseconds since the epoch. Used as the polling
    /// watermark key.
    pub created_at: u64,

    /// Last modification time in milliseconds since the epoch. Used for
    /// ordering only.
    pub last_updated: u64,

    /// Detail payload, if the backend sent any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<TransactionDetails>,
}

impl TransactionRecord {
    /// Whether the record is in a terminal state according to
    /// [`TransactionStatus::is_final`].
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.status.is_final()
    }
}

impl RawTransaction {
    /// Decodes one element of a listing's `data` array.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] if the element does not have the
    /// shape of a transaction.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_ID)
            .to_string();

        serde_json::from_value(value).map_err(|e| DecodeError::Malformed {
            id,
            reason: e.to_string(),
        })
    }
}

impl TryFrom<Value> for TransactionRecord {
    type Error = DecodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::try_from(RawTransaction::from_value(value)?)
    }
}

impl TryFrom<RawTransaction> for TransactionRecord {
    type Error = DecodeError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        let id = raw.id.ok_or(DecodeError::MissingField {
            id: UNKNOWN_ID.to_string(),
            field: "id",
        })?;

        let Some(status) = raw.status else {
            return Err(DecodeError::MissingField { id, field: "status" });
        };

        let Some(created_at) = raw.created_at else {
            return Err(DecodeError::MissingField {
                id,
                field: "createdAt",
            });
        };

        let details = if raw.details.is_empty() {
            None
        } else {
            Some(raw.details)
        };

        Ok(Self {
            id,
            status,
            created_at,
            // A record that was never updated sorts by its creation time.
            last_updated: raw.last_updated.unwrap_or(created_at),
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    #[test]
    fn test_decode_full_record() {
        let raw: RawTransaction = serde_json::from_str(
            r#"{
                "id": "tx-1",
                "status": "CONFIRMING",
                "createdAt": 1700000000000,
                "lastUpdated": 1700000005000,
                "assetId": "ETH_TEST5",
                "source": { "type": "END_USER_WALLET", "walletId": "w-1" },
                "amountInfo": { "amount": "0.01", "amountUSD": "25.10" },
                "numOfConfirmations": 3,
                "signedBy": ["device-1"],
                "extraParameters": { "rawMessageData": { "messages": [] } }
            }"#,
        )
        .unwrap();

        let record = TransactionRecord::try_from(raw).unwrap();

        assert_eq!(record.id, "tx-1");
        assert_eq!(record.status, TransactionStatus::Confirming);
        assert_eq!(record.created_at, 1_700_000_000_000);
        assert_eq!(record.last_updated, 1_700_000_005_000);

        let details = record.details.unwrap();
        assert_eq!(details.asset_id.as_deref(), Some("ETH_TEST5"));
        assert_eq!(
            details.source.and_then(|peer| peer.wallet_id).as_deref(),
            Some("w-1")
        );
        assert_eq!(
            details.amount_info.and_then(|info| info.amount_usd).as_deref(),
            Some("25.10")
        );
        assert_eq!(details.num_of_confirmations, Some(3));
        assert_eq!(details.signed_by, vec!["device-1".to_string()]);
        assert!(details.extra_parameters.is_some());
    }

    #[test]
    fn test_decode_without_details() {
        let raw: RawTransaction =
            serde_json::from_str(r#"{ "id": "tx-2", "status": "COMPLETED", "createdAt": 10 }"#)
                .unwrap();

        let record = TransactionRecord::try_from(raw).unwrap();

        assert!(record.details.is_none());
        assert_eq!(record.last_updated, 10);
        assert!(record.is_final());
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let raw = RawTransaction {
            status: Some(TransactionStatus::Submitted),
            created_at: Some(1),
            ..RawTransaction::default()
        };

        assert_matches!(
            TransactionRecord::try_from(raw),
            Err(DecodeError::MissingField { field: "id", .. })
        );
    }

    #[test]
    fn test_missing_status_is_rejected() {
        let raw = RawTransaction {
            id: Some("tx-3".to_string()),
            created_at: Some(1),
            ..RawTransaction::default()
        };

        assert_eq!(
            TransactionRecord::try_from(raw),
            Err(DecodeError::MissingField {
                id: "tx-3".to_string(),
                field: "status",
            })
        );
    }

    #[test]
    fn test_missing_created_at_is_rejected() {
        let raw = RawTransaction {
            id: Some("tx-4".to_string()),
            status: Some(TransactionStatus::PendingSignature),
            ..RawTransaction::default()
        };

        assert_matches!(
            TransactionRecord::try_from(raw),
            Err(DecodeError::MissingField { field: "createdAt", .. })
        );
    }

    #[test]
    fn test_decode_from_value_tolerates_nulls() {
        let value = serde_json::json!({
            "id": "tx-5",
            "status": "COMPLETED",
            "createdAt": 20,
            "lastUpdated": null,
            "signedBy": null,
        });

        let record = TransactionRecord::try_from(value).unwrap();

        assert_eq!(record.id, "tx-5");
        assert_eq!(record.last_updated, 20);
        assert!(record.details.is_none());
    }

    #[test]
    fn test_wrongly_typed_record_is_malformed() {
        let value = serde_json::json!({
            "id": "tx-6",
            "status": "SUBMITTED",
            "createdAt": "yesterday",
        });

        assert_matches!(
            TransactionRecord::try_from(value),
            Err(DecodeError::Malformed { id, .. }) if id == "tx-6"
        );
    }

    #[test]
    fn test_non_object_record_is_malformed() {
        assert_matches!(
            TransactionRecord::try_from(Value::from(42)),
            Err(DecodeError::Malformed { id, .. }) if id == UNKNOWN_ID
        );
    }
}
