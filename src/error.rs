use cosmwasm_std::StdError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum MarketError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("Serialization error: {msg}")]
    Serialization { msg: String },

    #[error("Wallet not connected")]
    WalletNotConnected {},

    #[error("User rejected the request")]
    UserRejected {},

    #[error("RPC error: {msg}")]
    Rpc { msg: String },

    #[error("Cannot project record {id}: {msg}")]
    Projection { id: String, msg: String },

    #[error("Invalid input: {error}")]
    InvalidInput { error: String },

    #[error("Encryption failed: {msg}")]
    Encryption { msg: String },

    #[error("Decryption failed: {msg}")]
    Decryption { msg: String },

    #[error("No clear value returned for handle {handle}")]
    MissingClearValue { handle: String },

    #[error("Contract is not available")]
    ContractUnavailable {},

    #[error("Invalid configuration: {error}")]
    Config { error: String },
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        MarketError::Serialization {
            msg: err.to_string(),
        }
    }
}

impl MarketError {
    /// Wallet SDKs surface signature refusals as plain RPC errors, so the
    /// message is inspected as well as the variant.
    pub fn is_user_rejection(&self) -> bool {
        match self {
            MarketError::UserRejected {} => true,
            MarketError::Rpc { msg }
            | MarketError::Encryption { msg }
            | MarketError::Decryption { msg } => msg.to_lowercase().contains("user rejected"),
            _ => false,
        }
    }
}
