use std::time::Duration;

use crate::core::config::data::Config;
use crate::core::constants::{
    DEFAULT_BASE_URL, DEFAULT_CONVERSATIONS_PER_PAGE, DEFAULT_MESSAGES_PER_PAGE,
    DEFAULT_SETTLE_DELAY_MS, DEFAULT_STREAM_THROTTLE_MS, DEFAULT_SWITCH_DEBOUNCE_MS,
    DEFAULT_TITLE_POLL_ATTEMPTS, DEFAULT_TITLE_POLL_INTERVAL_MS, DEFAULT_TITLE_REVEAL_CHAR_MS,
    DEFAULT_TOKEN_ENV,
};
use crate::core::sync::SyncSettings;
use crate::core::title_poll::TitlePollPolicy;
use crate::core::title_reveal::RevealTiming;
use crate::utils::url::normalize_base_url;

impl Config {
    /// A fully populated config, as written by `parley config init`.
    pub fn with_defaults() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            token_env: Some(DEFAULT_TOKEN_ENV.to_string()),
            messages_per_page: Some(DEFAULT_MESSAGES_PER_PAGE),
            conversations_per_page: Some(DEFAULT_CONVERSATIONS_PER_PAGE),
            stream_throttle_ms: Some(DEFAULT_STREAM_THROTTLE_MS),
            switch_debounce_ms: Some(DEFAULT_SWITCH_DEBOUNCE_MS),
            settle_delay_ms: Some(DEFAULT_SETTLE_DELAY_MS),
            title_poll_attempts: Some(DEFAULT_TITLE_POLL_ATTEMPTS),
            title_poll_interval_ms: Some(DEFAULT_TITLE_POLL_INTERVAL_MS),
            title_reveal_char_ms: Some(DEFAULT_TITLE_REVEAL_CHAR_MS),
        }
    }

    pub fn base_url(&self) -> String {
        let configured = self
            .base_url
            .as_deref()
            .map(normalize_base_url)
            .filter(|url| !url.is_empty());
        configured.unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn token_env(&self) -> &str {
        self.token_env
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_TOKEN_ENV)
    }

    /// Bearer token from the configured environment variable, if set.
    pub fn token(&self) -> Option<String> {
        std::env::var(self.token_env())
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    pub fn sync_settings(&self) -> SyncSettings {
        let millis = |value: Option<u64>, default: u64| Duration::from_millis(value.unwrap_or(default));
        SyncSettings {
            messages_per_page: self
                .messages_per_page
                .unwrap_or(DEFAULT_MESSAGES_PER_PAGE)
                .max(1),
            conversations_per_page: self
                .conversations_per_page
                .unwrap_or(DEFAULT_CONVERSATIONS_PER_PAGE)
                .max(1),
            stream_throttle: millis(self.stream_throttle_ms, DEFAULT_STREAM_THROTTLE_MS),
            switch_debounce: millis(self.switch_debounce_ms, DEFAULT_SWITCH_DEBOUNCE_MS),
            settle_delay: millis(self.settle_delay_ms, DEFAULT_SETTLE_DELAY_MS),
            title_poll: TitlePollPolicy {
                attempts: self
                    .title_poll_attempts
                    .unwrap_or(DEFAULT_TITLE_POLL_ATTEMPTS),
                interval: millis(self.title_poll_interval_ms, DEFAULT_TITLE_POLL_INTERVAL_MS),
            },
        }
    }

    pub fn reveal_timing(&self) -> RevealTiming {
        RevealTiming {
            step: Duration::from_millis(
                self.title_reveal_char_ms
                    .unwrap_or(DEFAULT_TITLE_REVEAL_CHAR_MS),
            ),
            ..RevealTiming::default()
        }
    }
}
