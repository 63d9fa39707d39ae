//! Interfaces of the external systems the marketplace drives: the wallet, the
//! gig contract bindings and the FHE client SDK.

use async_trait::async_trait;
use cosmwasm_std::{Addr, Binary};
use serde_json::Value;

use crate::error::MarketError;
use crate::msg::{CiphertextHandle, DecryptionOutcome, EncryptedInput, PendingTx, TxReceipt};

pub type CollabResult<T> = Result<T, MarketError>;

/// Connection state of the user's wallet.
pub trait WalletSession: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Active account, if any.
    fn account(&self) -> Option<Addr>;
}

/// Read side of the gig contract.
#[async_trait]
pub trait ContractReader: Send + Sync {
    async fn get_all_business_ids(&self) -> CollabResult<Vec<String>>;

    /// Raw record, see `msg::BusinessData` for the expected shape.
    async fn get_business_data(&self, id: &str) -> CollabResult<Value>;

    async fn get_encrypted_value(&self, id: &str) -> CollabResult<CiphertextHandle>;

    /// Liveness probe.
    async fn is_available(&self) -> CollabResult<bool>;
}

/// Signing side of the gig contract.
#[async_trait]
pub trait ContractWriter: Send + Sync {
    async fn address(&self) -> CollabResult<Addr>;

    #[allow(clippy::too_many_arguments)]
    async fn create_business_data(
        &self,
        id: &str,
        name: &str,
        encrypted_value: &CiphertextHandle,
        input_proof: &Binary,
        public_value1: u64,
        public_value2: u64,
        description: &str,
    ) -> CollabResult<PendingTx>;

    async fn verify_decryption(
        &self,
        id: &str,
        clear_values: &Binary,
        decryption_proof: &Binary,
    ) -> CollabResult<PendingTx>;

    /// Resolves once the transaction is final.
    async fn wait(&self, tx: &PendingTx) -> CollabResult<TxReceipt>;
}

/// Callback the FHE client invokes to put a decryption proof on chain.
#[async_trait]
pub trait DecryptionSubmitter: Send + Sync {
    async fn submit(&self, clear_values: Binary, decryption_proof: Binary) -> CollabResult<TxReceipt>;
}

#[async_trait]
pub trait FheClient: Send + Sync {
    async fn encrypt(
        &self,
        contract: &Addr,
        caller: &Addr,
        value: u64,
    ) -> CollabResult<EncryptedInput>;

    async fn verify_decryption(
        &self,
        handles: &[CiphertextHandle],
        contract: &Addr,
        submitter: &dyn DecryptionSubmitter,
    ) -> CollabResult<DecryptionOutcome>;
}
