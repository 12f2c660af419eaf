use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk settings. Unset fields fall back to the defaults in
/// [`crate::core::constants`]; see the accessors in `defaults.rs`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend root, e.g. `https://chat.example.org/api/chat`
    pub base_url: Option<String>,
    /// Environment variable that holds the bearer token
    pub token_env: Option<String>,
    pub messages_per_page: Option<u32>,
    pub conversations_per_page: Option<u32>,
    /// Minimum gap between transcript updates while a reply streams
    pub stream_throttle_ms: Option<u64>,
    pub switch_debounce_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
    pub title_poll_attempts: Option<u32>,
    pub title_poll_interval_ms: Option<u64>,
    pub title_reveal_char_ms: Option<u64>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.config/parley/config.toml` → `~/.config/parley/config.toml`
/// - macOS: `/Users/user/Library/Application Support/...` → `~/Library/Application Support/...`
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
