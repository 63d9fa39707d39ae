use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cosmwasm_std::{Addr, Binary, Uint128};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::collaborators::{
    CollabResult, ContractReader, ContractWriter, DecryptionSubmitter, FheClient, WalletSession,
};
use crate::config::MarketConfig;
use crate::error::MarketError;
use crate::helpers::{name_to_code, parse_int_or_zero, validate_draft};
use crate::msg::TxReceipt;
use crate::query_helpers::{compute_market_stats, filter_gigs, project_gig, project_gigs};
use crate::state::{
    CategoryFilter, DraftField, GigPosting, MarketSnapshot, MarketStats, NewGigDraft,
    OperationStatus, TransactionStatus, TxState, UiState,
};
use crate::view::{compose, Screen, ViewInput};

const MSG_CONNECT_FIRST: &str = "Please connect wallet first";
const MSG_CREATING: &str = "Creating gig with FHE encryption...";
const MSG_WAITING: &str = "Waiting for transaction...";
const MSG_CREATED: &str = "Gig created successfully!";
const MSG_REJECTED: &str = "Transaction rejected";
const MSG_CREATE_FAILED: &str = "Creation failed";
const MSG_LOAD_FAILED: &str = "Failed to load data";
const MSG_DECRYPT_FAILED: &str = "Decryption failed";
const MSG_CONTRACT_OK: &str = "Contract is available!";
const MSG_CONTRACT_FAILED: &str = "Contract test failed";

/// The external systems a market instance talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub wallet: Arc<dyn WalletSession>,
    pub reader: Arc<dyn ContractReader>,
    pub writer: Arc<dyn ContractWriter>,
    pub fhe: Arc<dyn FheClient>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { gigs: usize },
    /// A newer load was issued while this one ran.
    Discarded,
}

#[derive(Default)]
struct BusyCounters {
    loads: AtomicUsize,
    creates: AtomicUsize,
    decrypts: AtomicUsize,
}

/// Marks an operation in flight until dropped, whatever path the caller
/// leaves by.
struct BusyGuard<'a>(&'a AtomicUsize);

impl<'a> BusyGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        BusyGuard(counter)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Submits the verification transaction on behalf of the FHE client.
struct VerificationSubmitter<'a> {
    writer: &'a dyn ContractWriter,
    gig_id: &'a str,
}

#[async_trait]
impl<'a> DecryptionSubmitter for VerificationSubmitter<'a> {
    async fn submit(&self, clear_values: Binary, decryption_proof: Binary) -> CollabResult<TxReceipt> {
        let tx = self
            .writer
            .verify_decryption(self.gig_id, &clear_values, &decryption_proof)
            .await?;
        debug!(gig_id = self.gig_id, tx = %tx.hash, "verification submitted");
        self.writer.wait(&tx).await
    }
}

/// Gig lifecycle controller: loads postings from the contract, creates new
/// ones with an encrypted budget and reveals budgets through the FHE client.
pub struct GigMarket {
    config: MarketConfig,
    collab: Collaborators,
    snapshot: RwLock<Arc<MarketSnapshot>>,
    ui: RwLock<UiState>,
    busy: BusyCounters,
    load_generation: AtomicU64,
    connected: AtomicBool,
}

impl GigMarket {
    pub fn new(config: MarketConfig, collab: Collaborators) -> Self {
        let ui = UiState::new(&config.default_category);
        GigMarket {
            config,
            collab,
            snapshot: RwLock::new(Arc::new(MarketSnapshot::default())),
            ui: RwLock::new(ui),
            busy: BusyCounters::default(),
            load_generation: AtomicU64::new(0),
            connected: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    // Wallet

    /// Reacts to wallet transitions. Connecting triggers a load; disconnecting
    /// drops the displayed collection and any in-flight load result.
    pub async fn sync_wallet(&self) -> Result<(), MarketError> {
        let now_connected = self.collab.wallet.is_connected();
        let was_connected = self.connected.swap(now_connected, Ordering::SeqCst);

        match (was_connected, now_connected) {
            (false, true) => {
                info!(account = ?self.collab.wallet.account(), "wallet connected");
                self.load().await.map(|_| ())
            }
            (true, false) => {
                info!("wallet disconnected");
                let mut snapshot = self.snapshot.write();
                let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
                *snapshot = Arc::new(MarketSnapshot {
                    generation,
                    ..MarketSnapshot::default()
                });
                drop(snapshot);
                *self.ui.write() = UiState::new(&self.config.default_category);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn session(&self) -> Option<Addr> {
        if self.collab.wallet.is_connected() {
            self.collab.wallet.account()
        } else {
            None
        }
    }

    // Load

    /// Re-fetches every posting. Records that fail to load or project are
    /// skipped; the result is published only if no newer load was issued.
    pub async fn load(&self) -> Result<LoadOutcome, MarketError> {
        if !self.collab.wallet.is_connected() {
            debug!("load skipped, wallet not connected");
            return Err(MarketError::WalletNotConnected {});
        }

        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _busy = BusyGuard::enter(&self.busy.loads);
        debug!(generation, "loading gigs");

        let ids = match self.collab.reader.get_all_business_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                error!(generation, error = %err, "failed to list gigs");
                self.show_toast(TxState::Error, MSG_LOAD_FAILED);
                return Err(err);
            }
        };

        let mut fetched = Vec::with_capacity(ids.len());
        for id in &ids {
            let record = self.collab.reader.get_business_data(id).await;
            fetched.push((id.as_str(), record));
        }
        let gigs = project_gigs(fetched);
        let stats = compute_market_stats(&gigs);
        let count = gigs.len();

        // disconnects bump the generation under this same lock
        let mut snapshot = self.snapshot.write();
        if self.load_generation.load(Ordering::SeqCst) != generation
            || !self.collab.wallet.is_connected()
        {
            debug!(generation, "discarding stale load result");
            return Ok(LoadOutcome::Discarded);
        }
        *snapshot = Arc::new(MarketSnapshot {
            generation,
            gigs,
            stats,
        });
        drop(snapshot);
        info!(generation, gigs = count, skipped = ids.len() - count, "gigs loaded");
        Ok(LoadOutcome::Applied { gigs: count })
    }

    // Create

    /// Encrypts the draft budget, submits the posting and waits for it to be
    /// confirmed. Returns the new gig id.
    pub async fn create_gig(&self) -> Result<String, MarketError> {
        let caller = match self.session() {
            Some(caller) => caller,
            None => {
                self.show_toast(TxState::Error, MSG_CONNECT_FIRST);
                return Err(MarketError::WalletNotConnected {});
            }
        };

        let draft = self.ui.read().draft.clone();
        if let Err(err) = validate_draft(&draft) {
            self.show_toast(TxState::Error, err.to_string());
            return Err(err);
        }

        let _busy = BusyGuard::enter(&self.busy.creates);
        self.show_toast(TxState::Pending, MSG_CREATING);

        match self.submit_gig(&caller, &draft).await {
            Ok(gig_id) => {
                info!(gig_id = %gig_id, "gig created");
                self.ui
                    .write()
                    .activity
                    .push(format!("Created gig: {}", draft.title));
                self.show_toast(TxState::Success, MSG_CREATED);

                if let Err(err) = self.load().await {
                    warn!(error = %err, "reload after create failed");
                }

                let mut ui = self.ui.write();
                ui.show_create = false;
                ui.draft = NewGigDraft::new(&self.config.default_category);
                Ok(gig_id)
            }
            Err(err) => {
                let message = if err.is_user_rejection() {
                    MSG_REJECTED
                } else {
                    MSG_CREATE_FAILED
                };
                warn!(error = %err, "gig creation failed");
                self.show_toast(TxState::Error, message);
                Err(err)
            }
        }
    }

    async fn submit_gig(&self, caller: &Addr, draft: &NewGigDraft) -> Result<String, MarketError> {
        let contract = self.collab.writer.address().await?;
        let category_code = name_to_code(&draft.category).ok_or_else(|| MarketError::InvalidInput {
            error: format!("Unknown category: {}", draft.category),
        })?;
        let gig_id = format!("gig-{}", Utc::now().timestamp_millis());

        let encrypted = self
            .collab
            .fhe
            .encrypt(&contract, caller, parse_int_or_zero(&draft.budget))
            .await?;

        let tx = self
            .collab
            .writer
            .create_business_data(
                &gig_id,
                &draft.title,
                &encrypted.encrypted_data,
                &encrypted.proof,
                parse_int_or_zero(&draft.deadline),
                category_code as u64,
                &draft.description,
            )
            .await?;

        self.show_toast(TxState::Pending, MSG_WAITING);
        let receipt = self.collab.writer.wait(&tx).await?;
        if !receipt.success {
            return Err(MarketError::Rpc {
                msg: format!("transaction {} reverted", receipt.hash),
            });
        }
        Ok(gig_id)
    }

    // Decrypt

    /// Reveals the budget of a posting. Absent on any failure.
    pub async fn decrypt_budget(&self, gig_id: &str) -> Option<Uint128> {
        match self.try_decrypt_budget(gig_id).await {
            Ok(value) => Some(value),
            Err(err) => {
                error!(gig_id, error = %err, "decryption failed");
                None
            }
        }
    }

    /// Already verified postings return their public value without an FHE
    /// round trip.
    pub async fn try_decrypt_budget(&self, gig_id: &str) -> Result<Uint128, MarketError> {
        if self.session().is_none() {
            self.show_toast(TxState::Error, MSG_CONNECT_FIRST);
            return Err(MarketError::WalletNotConnected {});
        }

        let _busy = BusyGuard::enter(&self.busy.decrypts);
        match self.reveal_budget(gig_id).await {
            Ok(Revealed::AlreadyVerified(value)) => {
                debug!(gig_id, "budget already verified on chain");
                Ok(value)
            }
            Ok(Revealed::Decrypted(value)) => {
                self.ui
                    .write()
                    .activity
                    .push(format!("Decrypted budget for gig: {}", gig_id));
                if let Err(err) = self.load().await {
                    warn!(error = %err, "reload after decryption failed");
                }
                self.remember_local_budget(gig_id, value);
                info!(gig_id, "budget decrypted");
                Ok(value)
            }
            Err(err) => {
                let message = if err.is_user_rejection() {
                    MSG_REJECTED
                } else {
                    MSG_DECRYPT_FAILED
                };
                self.show_toast(TxState::Error, message);
                Err(err)
            }
        }
    }

    async fn reveal_budget(&self, gig_id: &str) -> Result<Revealed, MarketError> {
        let record = self.collab.reader.get_business_data(gig_id).await?;
        let current = project_gig(gig_id, &record)?;
        if current.is_verified {
            return Ok(Revealed::AlreadyVerified(current.decrypted_budget));
        }

        let handle = self.collab.reader.get_encrypted_value(gig_id).await?;
        let contract = self.collab.writer.address().await?;
        let submitter = VerificationSubmitter {
            writer: self.collab.writer.as_ref(),
            gig_id,
        };
        let outcome = self
            .collab
            .fhe
            .verify_decryption(std::slice::from_ref(&handle), &contract, &submitter)
            .await?;

        outcome
            .decryption_result
            .clear_values
            .get(&handle)
            .copied()
            .map(Revealed::Decrypted)
            .ok_or_else(|| MarketError::MissingClearValue {
                handle: handle.to_string(),
            })
    }

    /// Caches a decrypted value on a still-unverified posting until the next load.
    fn remember_local_budget(&self, gig_id: &str, value: Uint128) {
        let mut snapshot = self.snapshot.write();
        if let Some(index) = snapshot
            .gigs
            .iter()
            .position(|g| g.id == gig_id && !g.is_verified)
        {
            let mut next = MarketSnapshot::clone(&snapshot);
            next.gigs[index].local_budget = Some(value);
            *snapshot = Arc::new(next);
        }
    }

    // Liveness

    pub async fn test_contract(&self) -> Result<(), MarketError> {
        match self.collab.reader.is_available().await {
            Ok(true) => {
                info!("contract is available");
                self.show_toast(TxState::Success, MSG_CONTRACT_OK);
                Ok(())
            }
            Ok(false) => {
                warn!("contract reported unavailable");
                self.show_toast(TxState::Error, MSG_CONTRACT_FAILED);
                Err(MarketError::ContractUnavailable {})
            }
            Err(err) => {
                warn!(error = %err, "contract probe failed");
                self.show_toast(TxState::Error, MSG_CONTRACT_FAILED);
                Err(err)
            }
        }
    }

    // Toasts

    fn show_toast(&self, status: TxState, message: impl Into<String>) {
        let now = Utc::now();
        let hide_at = match status {
            TxState::Pending => None,
            TxState::Success => Some(now + self.config.success_toast()),
            TxState::Error => Some(now + self.config.error_toast()),
        };
        self.ui.write().toast = TransactionStatus {
            visible: true,
            status,
            message: message.into(),
            hide_at,
        };
    }

    /// The toast, if still visible at `now`.
    pub fn toast_at(&self, now: DateTime<Utc>) -> Option<TransactionStatus> {
        let ui = self.ui.read();
        ui.toast.is_visible_at(now).then(|| ui.toast.clone())
    }

    /// Hides a terminal toast whose time has passed.
    pub fn dismiss_expired_toast(&self, now: DateTime<Utc>) {
        let mut ui = self.ui.write();
        if ui.toast.visible && !ui.toast.is_visible_at(now) {
            ui.toast = TransactionStatus::default();
        }
    }

    // Read side

    pub fn snapshot(&self) -> Arc<MarketSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn stats(&self) -> MarketStats {
        self.snapshot().stats.clone()
    }

    /// Postings matching the current search query and category filter.
    pub fn visible_gigs(&self) -> Vec<GigPosting> {
        let snapshot = self.snapshot();
        let ui = self.ui.read();
        filter_gigs(&snapshot.gigs, &ui.search_query, ui.category_filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn activity(&self) -> Vec<String> {
        self.ui
            .read()
            .activity
            .recent(self.config.activity_display_limit)
            .to_vec()
    }

    pub fn ui_state(&self) -> UiState {
        self.ui.read().clone()
    }

    pub fn load_status(&self) -> OperationStatus {
        Self::status_of(&self.busy.loads, OperationStatus::Loading)
    }

    pub fn create_status(&self) -> OperationStatus {
        Self::status_of(&self.busy.creates, OperationStatus::Creating)
    }

    pub fn decrypt_status(&self) -> OperationStatus {
        Self::status_of(&self.busy.decrypts, OperationStatus::Decrypting)
    }

    fn status_of(counter: &AtomicUsize, active: OperationStatus) -> OperationStatus {
        if counter.load(Ordering::SeqCst) > 0 {
            active
        } else {
            OperationStatus::Idle
        }
    }

    // UI state

    pub fn set_search(&self, query: impl Into<String>) {
        self.ui.write().search_query = query.into();
    }

    pub fn set_category_filter(&self, filter: CategoryFilter) {
        self.ui.write().category_filter = filter;
    }

    pub fn open_create_form(&self) {
        self.ui.write().show_create = true;
    }

    /// Closing the form discards the draft.
    pub fn cancel_create_form(&self) {
        let mut ui = self.ui.write();
        ui.show_create = false;
        ui.draft = NewGigDraft::new(&self.config.default_category);
    }

    pub fn update_draft(&self, field: DraftField, value: impl Into<String>) {
        self.ui.write().draft.set(field, value);
    }

    pub fn draft(&self) -> NewGigDraft {
        self.ui.read().draft.clone()
    }

    pub fn select_gig(&self, gig_id: impl Into<String>) {
        self.ui.write().selected_gig = Some(gig_id.into());
    }

    pub fn close_detail(&self) {
        self.ui.write().selected_gig = None;
    }

    /// The posting shown in the detail modal, looked up in the current snapshot.
    pub fn selected_gig(&self) -> Option<GigPosting> {
        let selected = self.ui.read().selected_gig.clone()?;
        self.snapshot().gigs.iter().find(|g| g.id == selected).cloned()
    }

    pub fn open_faq(&self) {
        self.ui.write().show_faq = true;
    }

    pub fn close_faq(&self) {
        self.ui.write().show_faq = false;
    }

    // View

    pub fn render(&self, now: DateTime<Utc>) -> Screen {
        let snapshot = self.snapshot();
        let ui = self.ui_state();
        compose(&ViewInput {
            connected: self.collab.wallet.is_connected(),
            load: self.load_status(),
            create: self.create_status(),
            decrypt: self.decrypt_status(),
            snapshot: &snapshot,
            ui: &ui,
            activity_limit: self.config.activity_display_limit,
            now,
        })
    }
}

enum Revealed {
    AlreadyVerified(Uint128),
    Decrypted(Uint128),
}
