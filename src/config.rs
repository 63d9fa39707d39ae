use chrono::Duration;

use crate::error::MarketError;
use crate::helpers::name_to_code;
use crate::msg::ConfigMsg;

const DEFAULT_SUCCESS_TOAST_MS: u64 = 2_000;
const DEFAULT_ERROR_TOAST_MS: u64 = 3_000;
const DEFAULT_ACTIVITY_LIMIT: usize = 5;
const DEFAULT_CATEGORY: &str = "development";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Clone, Debug, PartialEq)]
pub struct MarketConfig {
    pub success_toast_ms: u64,
    pub error_toast_ms: u64,
    pub activity_display_limit: usize,
    pub default_category: String,
    pub log_filter: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig {
            success_toast_ms: DEFAULT_SUCCESS_TOAST_MS,
            error_toast_ms: DEFAULT_ERROR_TOAST_MS,
            activity_display_limit: DEFAULT_ACTIVITY_LIMIT,
            default_category: DEFAULT_CATEGORY.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl MarketConfig {
    pub fn from_msg(msg: ConfigMsg) -> Result<Self, MarketError> {
        let success_toast_ms = msg.success_toast_ms.unwrap_or(DEFAULT_SUCCESS_TOAST_MS);
        let error_toast_ms = msg.error_toast_ms.unwrap_or(DEFAULT_ERROR_TOAST_MS);
        if success_toast_ms == 0 || error_toast_ms == 0 {
            return Err(MarketError::Config {
                error: "toast durations must be positive".to_string(),
            });
        }

        let activity_display_limit = msg.activity_display_limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
        if activity_display_limit == 0 {
            return Err(MarketError::Config {
                error: "activity_display_limit must be at least 1".to_string(),
            });
        }

        let default_category = msg
            .default_category
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        if name_to_code(&default_category).is_none() {
            return Err(MarketError::Config {
                error: format!("unknown default category `{}`", default_category),
            });
        }

        Ok(MarketConfig {
            success_toast_ms,
            error_toast_ms,
            activity_display_limit,
            default_category,
            log_filter: msg
                .log_filter
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, MarketError> {
        let msg: ConfigMsg = serde_json::from_str(json)?;
        Self::from_msg(msg)
    }

    pub fn success_toast(&self) -> Duration {
        Duration::milliseconds(self.success_toast_ms as i64)
    }

    pub fn error_toast(&self) -> Duration {
        Duration::milliseconds(self.error_toast_ms as i64)
    }
}
