use serde::{Deserialize, Serialize};

use crate::de::{lenient_f64, lenient_string, lenient_u64, null_as_default};

/// One side of a transfer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPeer {
    /// Peer kind, e.g. `VAULT_ACCOUNT` or `END_USER_WALLET`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub peer_type: Option<String>,

    /// Peer identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Wallet the peer belongs to, for end-user wallets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<String>,
}

/// Amount breakdown as reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountInfo {
    /// Amount transferred.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<String>,

    /// Amount originally requested.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub requested_amount: Option<String>,

    /// Amount after fees.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub net_amount: Option<String>,

    /// USD value of the amount.
    #[serde(
        rename = "amountUSD",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount_usd: Option<String>,
}

/// Fee breakdown as reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeInfo {
    /// Fee paid to the network.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub network_fee: Option<String>,

    /// Fee paid to the service.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_fee: Option<String>,

    /// Gas price used.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub gas_price: Option<String>,
}

/// The bulky part of a transaction. Never inspected by the poller, only
/// carried through to consumers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    /// Asset being transferred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,

    /// Where the funds come from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TransferPeer>,

    /// Where the funds go.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<TransferPeer>,

    /// Amount originally requested.
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub requested_amount: Option<f64>,

    /// Amount breakdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_info: Option<AmountInfo>,

    /// Fee breakdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_info: Option<FeeInfo>,

    /// Amount transferred.
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<f64>,

    /// Amount after fees.
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub net_amount: Option<f64>,

    /// USD value of the amount.
    #[serde(
        rename = "amountUSD",
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount_usd: Option<f64>,

    /// Fee paid to the service.
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_fee: Option<f64>,

    /// Fee paid to the network.
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub network_fee: Option<f64>,

    /// On-chain hash, once broadcast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,

    /// Output index for UTXO-based assets.
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub index: Option<u64>,

    /// Finer grained status, e.g. the failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_status: Option<String>,

    /// Address the funds leave from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,

    /// Address the funds are sent to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_address: Option<String>,

    /// Label of the destination address, if whitelisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_address_description: Option<String>,

    /// Memo or tag for assets that need one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_tag: Option<String>,

    /// Signers that approved the transaction.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub signed_by: Vec<String>,

    /// User that initiated the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    /// User that rejected the transaction, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,

    /// Kind of destination address, e.g. `WHITELISTED` or `ONE_TIME`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,

    /// Free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Id of the transaction on the exchange side, for exchange transfers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_tx_id: Option<String>,

    /// Asset the fee is paid in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_currency: Option<String>,

    /// Confirmations seen so far.
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub num_of_confirmations: Option<u64>,

    /// Free-form parameters attached by the creator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_parameters: Option<serde_json::Value>,

    /// Operation kind, e.g. `TRANSFER` or `TYPED_MESSAGE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// Whether fees are deducted from the amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treat_as_gross_amount: Option<bool>,
}

impl TransactionDetails {
    /// Whether no detail field was present on the wire.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_signers_read_as_empty() {
        let details: TransactionDetails =
            serde_json::from_str(r#"{ "signedBy": null, "assetId": "ETH" }"#).unwrap();

        assert!(details.signed_by.is_empty());
        assert_eq!(details.asset_id.as_deref(), Some("ETH"));
    }

    #[test]
    fn test_amounts_accept_numbers_and_strings() {
        let details: TransactionDetails = serde_json::from_str(
            r#"{
                "amount": "0.5",
                "amountUSD": 1200.25,
                "networkFee": "not a number",
                "numOfConfirmations": "12",
                "amountInfo": { "amount": 0.5, "amountUSD": "1200.25" },
                "feeInfo": { "networkFee": null }
            }"#,
        )
        .unwrap();

        assert_eq!(details.amount, Some(0.5));
        assert_eq!(details.amount_usd, Some(1200.25));
        assert_eq!(details.network_fee, None);
        assert_eq!(details.num_of_confirmations, Some(12));

        let amount_info = details.amount_info.unwrap();
        assert_eq!(amount_info.amount.as_deref(), Some("0.5"));
        assert_eq!(amount_info.amount_usd.as_deref(), Some("1200.25"));
        assert_eq!(details.fee_info, Some(FeeInfo::default()));
    }
}
