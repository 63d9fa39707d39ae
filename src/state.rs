use std::fmt;

use chrono::{DateTime, Utc};
use cosmwasm_std::{Addr, Decimal, Uint128};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::helpers::{code_to_name, format_epoch_date, name_to_code, KNOWN_CATEGORIES};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Development,
    Design,
    Writing,
    Marketing,
    Support,
    Other,
}

impl Category {
    pub fn from_code(code: u64) -> Self {
        Self::from_name(code_to_name(code))
    }

    /// Unknown names map to `Other`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "development" => Category::Development,
            "design" => Category::Design,
            "writing" => Category::Writing,
            "marketing" => Category::Marketing,
            "support" => Category::Support,
            _ => Category::Other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::Development => KNOWN_CATEGORIES[0],
            Category::Design => KNOWN_CATEGORIES[1],
            Category::Writing => KNOWN_CATEGORIES[2],
            Category::Marketing => KNOWN_CATEGORIES[3],
            Category::Support => KNOWN_CATEGORIES[4],
            Category::Other => "other",
        }
    }

    /// `None` for `Other`, which has no on-chain code.
    pub fn code(&self) -> Option<u8> {
        name_to_code(self.name())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default, JsonSchema)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// "all" is the wildcard; any other value selects that category.
    pub fn parse(selector: &str) -> Self {
        if selector == "all" {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(Category::from_name(selector))
        }
    }

    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(selected) => *selected == category,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct GigPosting {
    pub id: String,
    pub title: String,
    pub employer: Addr,
    pub encrypted_budget: String,
    pub public_deadline: u64,
    pub public_category: Category,
    pub description: String,
    /// Epoch seconds.
    pub timestamp: u64,
    pub is_verified: bool,
    /// Value reported by the contract. Zero or stale unless `is_verified`.
    pub decrypted_budget: Uint128,
    /// Set after a successful client-side decryption, replaced by the next load.
    pub local_budget: Option<Uint128>,
}

impl GigPosting {
    /// The budget, when it can be trusted.
    pub fn budget(&self) -> Option<Uint128> {
        if self.is_verified {
            Some(self.decrypted_budget)
        } else {
            self.local_budget
        }
    }

    pub fn deadline_label(&self) -> String {
        format!("{} days", self.public_deadline)
    }

    pub fn posted_on(&self) -> String {
        format_epoch_date(self.timestamp)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct MarketStats {
    pub total_gigs: u64,
    pub verified_gigs: u64,
    pub avg_budget: Decimal,
    pub active_categories: u64,
}

impl Default for MarketStats {
    fn default() -> Self {
        MarketStats {
            total_gigs: 0,
            verified_gigs: 0,
            avg_budget: Decimal::zero(),
            active_categories: 0,
        }
    }
}

/// Fully formed result of one load. Published as a whole, never patched in
/// place except for locally decrypted budgets.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct MarketSnapshot {
    pub generation: u64,
    pub gigs: Vec<GigPosting>,
    pub stats: MarketStats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftField {
    Title,
    Budget,
    Deadline,
    Category,
    Description,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct NewGigDraft {
    pub title: String,
    pub budget: String,
    pub deadline: String,
    pub category: String,
    pub description: String,
}

impl NewGigDraft {
    pub fn new(default_category: &str) -> Self {
        NewGigDraft {
            title: String::new(),
            budget: String::new(),
            deadline: String::new(),
            category: default_category.to_string(),
            description: String::new(),
        }
    }

    pub fn set(&mut self, field: DraftField, value: impl Into<String>) {
        let value = value.into();
        match field {
            DraftField::Title => self.title = value,
            DraftField::Budget => self.budget = value,
            DraftField::Deadline => self.deadline = value,
            DraftField::Category => self.category = value,
            DraftField::Description => self.description = value,
        }
    }

    /// Mirrors the form's submit button: required fields must be filled.
    pub fn is_submittable(&self) -> bool {
        !self.title.is_empty() && !self.budget.is_empty() && !self.deadline.is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxState {
    Pending,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransactionStatus {
    pub visible: bool,
    pub status: TxState,
    pub message: String,
    /// Terminal states hide themselves at this instant; pending never does.
    pub hide_at: Option<DateTime<Utc>>,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus {
            visible: false,
            status: TxState::Pending,
            message: String::new(),
            hide_at: None,
        }
    }
}

impl TransactionStatus {
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.visible && self.hide_at.map_or(true, |deadline| now < deadline)
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct ActivityLog {
    entries: Vec<String>,
}

impl ActivityLog {
    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> &[String] {
        let start = self.entries.len().saturating_sub(limit);
        &self.entries[start..]
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum OperationStatus {
    Idle,
    Loading,
    Creating,
    Decrypting,
}

/// Navigation and form state owned by the controller.
#[derive(Clone, Debug, PartialEq)]
pub struct UiState {
    pub draft: NewGigDraft,
    pub show_create: bool,
    pub selected_gig: Option<String>,
    pub show_faq: bool,
    pub search_query: String,
    pub category_filter: CategoryFilter,
    pub toast: TransactionStatus,
    pub activity: ActivityLog,
}

impl UiState {
    pub fn new(default_category: &str) -> Self {
        UiState {
            draft: NewGigDraft::new(default_category),
            show_create: false,
            selected_gig: None,
            show_faq: false,
            search_query: String::new(),
            category_filter: CategoryFilter::All,
            toast: TransactionStatus::default(),
            activity: ActivityLog::default(),
        }
    }
}
