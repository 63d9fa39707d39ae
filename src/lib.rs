pub mod collaborators;
pub mod config;
pub mod contract;
pub mod error;
pub mod helpers;
pub mod logging;
pub mod msg;
pub mod query_helpers;
pub mod state;
pub mod testing;
pub mod view;

pub use crate::config::MarketConfig;
pub use crate::contract::{Collaborators, GigMarket, LoadOutcome};
pub use crate::error::MarketError;
pub use crate::msg::{BusinessData, CiphertextHandle, ConfigMsg};
