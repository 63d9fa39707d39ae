//! Turns controller state into a renderer-agnostic view model. Nothing here
//! makes decisions beyond what to show; every action goes back through
//! `GigMarket`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::helpers::{truncate_address, KNOWN_CATEGORIES};
use crate::query_helpers::{filter_gigs, rounded_average};
use crate::state::{
    CategoryFilter, GigPosting, MarketSnapshot, NewGigDraft, OperationStatus, TxState, UiState,
};

pub const FAQ_ENTRIES: [(&str, &str); 3] = [
    (
        "What is FHE?",
        "Fully Homomorphic Encryption allows computations on encrypted data without decryption.",
    ),
    (
        "How are budgets protected?",
        "All budget amounts are encrypted on-chain using Zama FHE technology.",
    ),
    (
        "Who can see the actual budget?",
        "Only the gig poster and selected freelancers can decrypt the budget amount.",
    ),
];

pub struct ViewInput<'a> {
    pub connected: bool,
    pub load: OperationStatus,
    pub create: OperationStatus,
    pub decrypt: OperationStatus,
    pub snapshot: &'a MarketSnapshot,
    pub ui: &'a UiState,
    pub activity_limit: usize,
    pub now: DateTime<Utc>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub enum Screen {
    ConnectPrompt(ConnectPrompt),
    Loading { message: String },
    Market(Box<MarketScreen>),
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ConnectPrompt {
    pub headline: String,
    pub pitch: String,
    pub features: Vec<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MarketScreen {
    pub stats: Vec<StatCard>,
    pub search_query: String,
    pub category_options: Vec<String>,
    pub selected_category: String,
    pub cards: Vec<GigCard>,
    pub empty_state: Option<EmptyState>,
    pub create_modal: Option<CreateModal>,
    pub detail_modal: Option<DetailModal>,
    pub faq_modal: Option<FaqModal>,
    pub activity: Option<ActivityPanel>,
    pub toast: Option<ToastView>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct StatCard {
    pub label: String,
    pub value: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct GigCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status_badge: String,
    pub category: String,
    pub deadline: String,
    pub budget: String,
    pub employer: String,
    pub posted_on: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EmptyState {
    pub title: String,
    pub hint: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CreateModal {
    pub draft: NewGigDraft,
    pub submit_label: String,
    pub submit_enabled: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DetailModal {
    pub id: String,
    pub title: String,
    pub category: String,
    pub deadline: String,
    pub employer: String,
    pub status: String,
    pub description: String,
    pub budget: String,
    pub budget_status: String,
    /// `None` when the posting is already verified.
    pub reveal_button: Option<RevealButton>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RevealButton {
    pub label: String,
    pub enabled: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct FaqModal {
    pub entries: Vec<(String, String)>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ActivityPanel {
    pub entries: Vec<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ToastView {
    pub status: TxState,
    pub icon: String,
    pub message: String,
}

pub fn compose(input: &ViewInput<'_>) -> Screen {
    if !input.connected {
        return Screen::ConnectPrompt(connect_prompt());
    }
    if input.load == OperationStatus::Loading {
        return Screen::Loading {
            message: "Loading Encrypted Marketplace...".to_string(),
        };
    }

    let ui = input.ui;
    let visible = filter_gigs(&input.snapshot.gigs, &ui.search_query, ui.category_filter);
    let cards: Vec<GigCard> = visible.iter().map(|gig| gig_card(gig)).collect();
    let empty_state = cards.is_empty().then(|| EmptyState {
        title: "No gigs found".to_string(),
        hint: "Try adjusting your search or create the first gig!".to_string(),
    });

    let create_modal = ui.show_create.then(|| CreateModal {
        draft: ui.draft.clone(),
        submit_label: if input.create == OperationStatus::Creating {
            "Encrypting...".to_string()
        } else {
            "Create Gig".to_string()
        },
        submit_enabled: input.create == OperationStatus::Idle && ui.draft.is_submittable(),
    });

    let detail_modal = ui
        .selected_gig
        .as_ref()
        .and_then(|id| input.snapshot.gigs.iter().find(|g| &g.id == id))
        .map(|gig| detail_modal(gig, input.decrypt));

    let faq_modal = ui.show_faq.then(|| FaqModal {
        entries: FAQ_ENTRIES
            .iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect(),
    });

    let activity = (!ui.activity.is_empty()).then(|| ActivityPanel {
        entries: ui.activity.recent(input.activity_limit).to_vec(),
    });

    let toast = ui.toast.is_visible_at(input.now).then(|| ToastView {
        status: ui.toast.status,
        icon: match ui.toast.status {
            TxState::Success => "✓",
            TxState::Error => "✗",
            TxState::Pending => "⏳",
        }
        .to_string(),
        message: ui.toast.message.clone(),
    });

    let mut category_options = vec!["all".to_string()];
    category_options.extend(KNOWN_CATEGORIES.iter().map(|c| c.to_string()));

    Screen::Market(Box::new(MarketScreen {
        stats: stat_cards(input.snapshot),
        search_query: ui.search_query.clone(),
        category_options,
        selected_category: match ui.category_filter {
            CategoryFilter::All => "all".to_string(),
            CategoryFilter::Only(category) => category.to_string(),
        },
        cards,
        empty_state,
        create_modal,
        detail_modal,
        faq_modal,
        activity,
        toast,
    }))
}

fn connect_prompt() -> ConnectPrompt {
    ConnectPrompt {
        headline: "Connect Your Wallet".to_string(),
        pitch: "Join the world's first fully encrypted freelance marketplace".to_string(),
        features: vec![
            "Encrypted Budget Bidding".to_string(),
            "Private Proposal System".to_string(),
            "Secure Payment Processing".to_string(),
        ],
    }
}

fn stat_cards(snapshot: &MarketSnapshot) -> Vec<StatCard> {
    let stats = &snapshot.stats;
    let card = |label: &str, value: String| StatCard {
        label: label.to_string(),
        value,
    };
    vec![
        card("Active Gigs", stats.total_gigs.to_string()),
        card("Verified", stats.verified_gigs.to_string()),
        card("Avg Budget", format!("${}", rounded_average(stats))),
        card("Categories", stats.active_categories.to_string()),
    ]
}

fn gig_card(gig: &GigPosting) -> GigCard {
    GigCard {
        id: gig.id.clone(),
        title: gig.title.clone(),
        description: gig.description.clone(),
        status_badge: if gig.is_verified {
            "🔓 Verified"
        } else {
            "🔐 Encrypted"
        }
        .to_string(),
        category: gig.public_category.to_string(),
        deadline: gig.deadline_label(),
        // the grid only shows on-chain verified budgets
        budget: if gig.is_verified {
            format!("${}", gig.decrypted_budget)
        } else {
            "🔒 Encrypted".to_string()
        },
        employer: truncate_address(gig.employer.as_str()),
        posted_on: gig.posted_on(),
    }
}

fn detail_modal(gig: &GigPosting, decrypt: OperationStatus) -> DetailModal {
    let (budget, budget_status) = match (gig.is_verified, gig.budget()) {
        (true, Some(value)) => (format!("${}", value), "On-chain verified"),
        (false, Some(value)) => (format!("${}", value), "Locally decrypted"),
        _ => ("🔒 Encrypted".to_string(), "FHE encrypted"),
    };

    let reveal_button = (!gig.is_verified).then(|| {
        let decrypting = decrypt == OperationStatus::Decrypting;
        RevealButton {
            label: if decrypting {
                "Decrypting..."
            } else if gig.local_budget.is_some() {
                "Decrypted"
            } else {
                "Reveal Budget"
            }
            .to_string(),
            enabled: !decrypting,
        }
    });

    DetailModal {
        id: gig.id.clone(),
        title: gig.title.clone(),
        category: gig.public_category.to_string(),
        deadline: gig.deadline_label(),
        employer: gig.employer.to_string(),
        status: if gig.is_verified { "Verified" } else { "Encrypted" }.to_string(),
        description: gig.description.clone(),
        budget,
        budget_status: budget_status.to_string(),
        reveal_button,
    }
}
