use std::collections::BTreeMap;
use std::fmt;

use cosmwasm_std::{Addr, Binary, Uint128};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Opaque on-chain reference to an encrypted value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(transparent)]
pub struct CiphertextHandle(pub String);

impl CiphertextHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CiphertextHandle {
    fn from(handle: &str) -> Self {
        CiphertextHandle(handle.to_string())
    }
}

/// Record layout returned by `getBusinessData`. Readers hand it to the
/// projection layer as a JSON value so that loosely typed RPC payloads
/// (numbers as strings, missing fields) can be coerced field by field.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusinessData {
    pub name: String,
    pub creator: Addr,
    /// Public deadline in days.
    pub public_value1: u64,
    /// Public category code.
    pub public_value2: u64,
    pub description: String,
    pub timestamp: u64,
    pub is_verified: bool,
    pub decrypted_value: Uint128,
}

/// Ciphertext plus input proof produced by the FHE client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedInput {
    pub encrypted_data: CiphertextHandle,
    pub proof: Binary,
}

/// Handle to a submitted, not yet confirmed, transaction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct PendingTx {
    pub hash: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct TxReceipt {
    pub hash: String,
    pub block_height: u64,
    pub success: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionResult {
    pub clear_values: BTreeMap<CiphertextHandle, Uint128>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionOutcome {
    pub decryption_result: DecryptionResult,
}

/// Client configuration as supplied by the host application. Every field is
/// optional; see `MarketConfig::from_msg` for defaults.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default, JsonSchema)]
pub struct ConfigMsg {
    pub success_toast_ms: Option<u64>,
    pub error_toast_ms: Option<u64>,
    pub activity_display_limit: Option<usize>,
    pub default_category: Option<String>,
    pub log_filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_data_uses_contract_field_names() {
        let data = BusinessData {
            name: "Landing page".to_string(),
            creator: Addr::unchecked("0xabc"),
            public_value1: 14,
            public_value2: 1,
            description: "Design a landing page".to_string(),
            timestamp: 1_700_000_000,
            is_verified: false,
            decrypted_value: Uint128::zero(),
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["publicValue1"], 14);
        assert_eq!(value["publicValue2"], 1);
        assert_eq!(value["isVerified"], false);
        // Uint128 travels as a decimal string
        assert_eq!(value["decryptedValue"], "0");
    }

    #[test]
    fn decryption_outcome_keys_by_handle() {
        let json = r#"{"decryptionResult":{"clearValues":{"0x01":"4200"}}}"#;
        let outcome: DecryptionOutcome = serde_json::from_str(json).unwrap();
        assert_eq!(
            outcome.decryption_result.clear_values[&CiphertextHandle::from("0x01")],
            Uint128::new(4200)
        );
    }

    #[test]
    fn wire_types_have_schemas() {
        let schema = schemars::schema_for!(BusinessData);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("publicValue2"));
    }
}
