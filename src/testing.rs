//! In-process stand-ins for the wallet, the gig contract and the FHE client,
//! in the spirit of `cosmwasm_std::testing`. The ledger keeps its records in
//! contract-style storage; the FHE mock keeps plaintexts next to the handles it
//! issues so it can "decrypt" them later.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cosmwasm_std::{Addr, Binary, MemoryStorage, Timestamp, Uint128};
use cw_storage_plus::{Item, Map};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::collaborators::{
    CollabResult, ContractReader, ContractWriter, DecryptionSubmitter, FheClient, WalletSession,
};
use crate::config::MarketConfig;
use crate::contract::{Collaborators, GigMarket};
use crate::error::MarketError;
use crate::helpers::{decode_clear_values, encode_clear_values};
use crate::msg::{
    BusinessData, CiphertextHandle, DecryptionOutcome, DecryptionResult, EncryptedInput, PendingTx,
    TxReceipt,
};

pub const MOCK_CONTRACT_ADDR: &str = "0xc0ffee0000000000000000000000000000000001";
pub const MOCK_ACCOUNT: &str = "0xfeed00000000000000000000000000000000beef";

const BUSINESS_IDS: Item<Vec<String>> = Item::new("business_ids");
const BUSINESS_DATA: Map<&str, BusinessData> = Map::new("business_data");
const ENCRYPTED_VALUES: Map<&str, CiphertextHandle> = Map::new("encrypted_values");

// Wallet

#[derive(Default)]
pub struct MockWallet {
    account: RwLock<Option<Addr>>,
}

impl MockWallet {
    pub fn connected(account: &str) -> Self {
        MockWallet {
            account: RwLock::new(Some(Addr::unchecked(account))),
        }
    }

    pub fn connect(&self, account: &str) {
        *self.account.write() = Some(Addr::unchecked(account));
    }

    pub fn disconnect(&self) {
        *self.account.write() = None;
    }
}

impl WalletSession for MockWallet {
    fn is_connected(&self) -> bool {
        self.account.read().is_some()
    }

    fn account(&self) -> Option<Addr> {
        self.account.read().clone()
    }
}

// Ledger

/// Failure to inject into the next matching write.
#[derive(Clone, Debug)]
pub enum WriteFailure {
    Reject,
    Fail(String),
    Revert,
}

pub struct MockLedger {
    address: Addr,
    storage: Mutex<MemoryStorage>,
    block_time: Mutex<Timestamp>,
    height: AtomicU64,
    raw_overrides: Mutex<HashMap<String, Value>>,
    next_write_failure: Mutex<Option<WriteFailure>>,
    list_failure: Mutex<Option<String>>,
    available: Mutex<bool>,
    reverted: Mutex<Vec<String>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new(MOCK_CONTRACT_ADDR)
    }
}

impl MockLedger {
    pub fn new(address: &str) -> Self {
        MockLedger {
            address: Addr::unchecked(address),
            storage: Mutex::new(MemoryStorage::new()),
            block_time: Mutex::new(Timestamp::from_seconds(1_700_000_000)),
            height: AtomicU64::new(12_345),
            raw_overrides: Mutex::new(HashMap::new()),
            next_write_failure: Mutex::new(None),
            list_failure: Mutex::new(None),
            available: Mutex::new(true),
            reverted: Mutex::new(Vec::new()),
        }
    }

    /// Stores a posting directly, bypassing encryption.
    pub fn seed(&self, id: &str, data: BusinessData) -> CollabResult<()> {
        let mut storage = self.storage.lock();
        let mut ids = BUSINESS_IDS.may_load(&*storage)?.unwrap_or_default();
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
        BUSINESS_IDS.save(&mut *storage, &ids)?;
        BUSINESS_DATA.save(&mut *storage, id, &data)?;
        ENCRYPTED_VALUES.save(&mut *storage, id, &handle_for(&self.address, id))?;
        Ok(())
    }

    /// Serves `raw` instead of the stored record for `id`.
    pub fn override_raw(&self, id: &str, raw: Value) -> CollabResult<()> {
        {
            let mut storage = self.storage.lock();
            let mut ids = BUSINESS_IDS.may_load(&*storage)?.unwrap_or_default();
            if !ids.iter().any(|existing| existing == id) {
                ids.push(id.to_string());
                BUSINESS_IDS.save(&mut *storage, &ids)?;
            }
        }
        self.raw_overrides.lock().insert(id.to_string(), raw);
        Ok(())
    }

    pub fn fail_next_write(&self, failure: WriteFailure) {
        *self.next_write_failure.lock() = Some(failure);
    }

    pub fn fail_listing(&self, msg: &str) {
        *self.list_failure.lock() = Some(msg.to_string());
    }

    pub fn set_available(&self, available: bool) {
        *self.available.lock() = available;
    }

    pub fn advance_time(&self, seconds: u64) {
        let mut time = self.block_time.lock();
        *time = time.plus_seconds(seconds);
    }

    pub fn record(&self, id: &str) -> Option<BusinessData> {
        BUSINESS_DATA.may_load(&*self.storage.lock(), id).ok().flatten()
    }

    pub fn ids(&self) -> Vec<String> {
        BUSINESS_IDS
            .may_load(&*self.storage.lock())
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// `Ok(Some(tx))` hands out a transaction that will revert on confirmation.
    fn take_write_failure(&self) -> CollabResult<Option<PendingTx>> {
        match self.next_write_failure.lock().take() {
            None => Ok(None),
            Some(WriteFailure::Reject) => Err(MarketError::Rpc {
                msg: "user rejected transaction".to_string(),
            }),
            Some(WriteFailure::Fail(msg)) => Err(MarketError::Rpc { msg }),
            Some(WriteFailure::Revert) => {
                let hash = self.next_tx_hash("revert");
                self.reverted.lock().push(hash.clone());
                Ok(Some(PendingTx { hash }))
            }
        }
    }

    fn next_tx_hash(&self, tag: &str) -> String {
        let height = self.height.fetch_add(1, Ordering::SeqCst);
        let digest = Sha256::digest(format!("{}:{}:{}", self.address, tag, height).as_bytes());
        format!("0x{}", hex::encode(digest))
    }
}

fn handle_for(contract: &Addr, id: &str) -> CiphertextHandle {
    let digest = Sha256::digest(format!("{}/{}", contract, id).as_bytes());
    CiphertextHandle(format!("0x{}", hex::encode(digest)))
}

#[async_trait]
impl ContractReader for MockLedger {
    async fn get_all_business_ids(&self) -> CollabResult<Vec<String>> {
        if let Some(msg) = self.list_failure.lock().clone() {
            return Err(MarketError::Rpc { msg });
        }
        Ok(self.ids())
    }

    async fn get_business_data(&self, id: &str) -> CollabResult<Value> {
        if let Some(raw) = self.raw_overrides.lock().get(id) {
            return Ok(raw.clone());
        }
        let data = BUSINESS_DATA
            .may_load(&*self.storage.lock(), id)?
            .ok_or_else(|| MarketError::Rpc {
                msg: format!("execution reverted: unknown id {}", id),
            })?;
        Ok(serde_json::to_value(data)?)
    }

    async fn get_encrypted_value(&self, id: &str) -> CollabResult<CiphertextHandle> {
        ENCRYPTED_VALUES
            .may_load(&*self.storage.lock(), id)?
            .ok_or_else(|| MarketError::Rpc {
                msg: format!("execution reverted: unknown id {}", id),
            })
    }

    async fn is_available(&self) -> CollabResult<bool> {
        Ok(*self.available.lock())
    }
}

#[async_trait]
impl ContractWriter for MockLedger {
    async fn address(&self) -> CollabResult<Addr> {
        Ok(self.address.clone())
    }

    async fn create_business_data(
        &self,
        id: &str,
        name: &str,
        encrypted_value: &CiphertextHandle,
        input_proof: &Binary,
        public_value1: u64,
        public_value2: u64,
        description: &str,
    ) -> CollabResult<PendingTx> {
        if let Some(reverted) = self.take_write_failure()? {
            return Ok(reverted);
        }
        if input_proof.is_empty() {
            return Err(MarketError::Rpc {
                msg: "execution reverted: missing input proof".to_string(),
            });
        }

        let creator = Addr::unchecked(MOCK_ACCOUNT);
        let timestamp = self.block_time.lock().seconds();
        let mut storage = self.storage.lock();
        if BUSINESS_DATA.has(&*storage, id) {
            return Err(MarketError::Rpc {
                msg: format!("execution reverted: id {} exists", id),
            });
        }
        let mut ids = BUSINESS_IDS.may_load(&*storage)?.unwrap_or_default();
        ids.push(id.to_string());
        BUSINESS_IDS.save(&mut *storage, &ids)?;
        BUSINESS_DATA.save(
            &mut *storage,
            id,
            &BusinessData {
                name: name.to_string(),
                creator,
                public_value1,
                public_value2,
                description: description.to_string(),
                timestamp,
                is_verified: false,
                decrypted_value: Uint128::zero(),
            },
        )?;
        ENCRYPTED_VALUES.save(&mut *storage, id, encrypted_value)?;
        drop(storage);

        Ok(PendingTx {
            hash: self.next_tx_hash(id),
        })
    }

    async fn verify_decryption(
        &self,
        id: &str,
        clear_values: &Binary,
        decryption_proof: &Binary,
    ) -> CollabResult<PendingTx> {
        if let Some(reverted) = self.take_write_failure()? {
            return Ok(reverted);
        }
        let values = decode_clear_values(clear_values)?;
        let value = values.first().copied().ok_or_else(|| MarketError::Rpc {
            msg: "execution reverted: no clear values".to_string(),
        })?;
        let expected_proof = decryption_proof_for(clear_values);
        if *decryption_proof != expected_proof {
            return Err(MarketError::Rpc {
                msg: "execution reverted: invalid decryption proof".to_string(),
            });
        }

        let mut storage = self.storage.lock();
        let mut data = BUSINESS_DATA
            .may_load(&*storage, id)?
            .ok_or_else(|| MarketError::Rpc {
                msg: format!("execution reverted: unknown id {}", id),
            })?;
        data.is_verified = true;
        data.decrypted_value = value;
        BUSINESS_DATA.save(&mut *storage, id, &data)?;
        drop(storage);

        Ok(PendingTx {
            hash: self.next_tx_hash(id),
        })
    }

    async fn wait(&self, tx: &PendingTx) -> CollabResult<TxReceipt> {
        let success = !self.reverted.lock().contains(&tx.hash);
        Ok(TxReceipt {
            hash: tx.hash.clone(),
            block_height: self.height.load(Ordering::SeqCst),
            success,
        })
    }
}

// FHE

fn decryption_proof_for(clear_values: &Binary) -> Binary {
    Binary::from(Sha256::digest(clear_values.as_slice()).to_vec())
}

/// Pretend FHE client: handles are hashes, plaintexts stay in memory.
#[derive(Default)]
pub struct MockFhe {
    plaintexts: Mutex<BTreeMap<CiphertextHandle, Uint128>>,
    nonce: AtomicU64,
    decrypt_calls: AtomicU64,
    fail_decrypt: Mutex<Option<String>>,
}

impl MockFhe {
    /// Registers a plaintext for a handle issued elsewhere (seeded records).
    pub fn register(&self, handle: CiphertextHandle, value: Uint128) {
        self.plaintexts.lock().insert(handle, value);
    }

    pub fn decrypt_calls(&self) -> u64 {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_decrypt(&self, msg: &str) {
        *self.fail_decrypt.lock() = Some(msg.to_string());
    }
}

#[async_trait]
impl FheClient for MockFhe {
    async fn encrypt(
        &self,
        contract: &Addr,
        caller: &Addr,
        value: u64,
    ) -> CollabResult<EncryptedInput> {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let digest = Sha256::digest(format!("{}|{}|{}|{}", contract, caller, value, nonce).as_bytes());
        let handle = CiphertextHandle(format!("0x{}", hex::encode(digest)));
        self.plaintexts.lock().insert(handle.clone(), Uint128::from(value));

        let proof = Sha256::digest(format!("proof|{}|{}", handle, caller).as_bytes());
        Ok(EncryptedInput {
            encrypted_data: handle,
            proof: Binary::from(proof.to_vec()),
        })
    }

    async fn verify_decryption(
        &self,
        handles: &[CiphertextHandle],
        _contract: &Addr,
        submitter: &dyn DecryptionSubmitter,
    ) -> CollabResult<DecryptionOutcome> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.fail_decrypt.lock().take() {
            return Err(MarketError::Decryption { msg });
        }

        let clear_values = {
            let plaintexts = self.plaintexts.lock();
            handles
                .iter()
                .map(|handle| {
                    plaintexts
                        .get(handle)
                        .map(|value| (handle.clone(), *value))
                        .ok_or_else(|| MarketError::Decryption {
                            msg: format!("no ACL grant for handle {}", handle),
                        })
                })
                .collect::<CollabResult<BTreeMap<_, _>>>()?
        };

        let ordered: Vec<Uint128> = handles.iter().map(|h| clear_values[h]).collect();
        let encoded = encode_clear_values(&ordered);
        let receipt = submitter
            .submit(encoded.clone(), decryption_proof_for(&encoded))
            .await?;
        if !receipt.success {
            return Err(MarketError::Decryption {
                msg: format!("verification transaction {} reverted", receipt.hash),
            });
        }

        Ok(DecryptionOutcome {
            decryption_result: DecryptionResult { clear_values },
        })
    }
}

/// A wired-up market over fresh mocks, plus handles to the mocks.
pub struct MockMarket {
    pub market: GigMarket,
    pub wallet: Arc<MockWallet>,
    pub ledger: Arc<MockLedger>,
    pub fhe: Arc<MockFhe>,
}

impl MockMarket {
    /// Seeds a posting whose encrypted budget the FHE mock can reveal.
    pub fn seed_gig(&self, id: &str, data: BusinessData, budget: u128) -> CollabResult<()> {
        self.ledger.seed(id, data)?;
        let handle = handle_for(&Addr::unchecked(MOCK_CONTRACT_ADDR), id);
        self.fhe.register(handle, Uint128::new(budget));
        Ok(())
    }
}

pub fn mock_market() -> MockMarket {
    mock_market_with(MarketConfig::default(), MockWallet::connected(MOCK_ACCOUNT))
}

pub fn mock_market_with(config: MarketConfig, wallet: MockWallet) -> MockMarket {
    let wallet = Arc::new(wallet);
    let ledger = Arc::new(MockLedger::default());
    let fhe = Arc::new(MockFhe::default());
    let market = GigMarket::new(
        config,
        Collaborators {
            wallet: wallet.clone(),
            reader: ledger.clone(),
            writer: ledger.clone(),
            fhe: fhe.clone(),
        },
    );
    MockMarket {
        market,
        wallet,
        ledger,
        fhe,
    }
}

pub fn business_data(name: &str, category_code: u64, verified_budget: Option<u128>) -> BusinessData {
    BusinessData {
        name: name.to_string(),
        creator: Addr::unchecked(MOCK_ACCOUNT),
        public_value1: 10,
        public_value2: category_code,
        description: format!("{} description", name),
        timestamp: 1_700_000_000,
        is_verified: verified_budget.is_some(),
        decrypted_value: Uint128::new(verified_budget.unwrap_or(0)),
    }
}
