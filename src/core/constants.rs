//! Shared constants used across the application

/// Default backend root.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/chat";

/// Environment variable holding the bearer token unless configured otherwise.
pub const DEFAULT_TOKEN_ENV: &str = "PARLEY_TOKEN";

pub const DEFAULT_MESSAGES_PER_PAGE: u32 = 10;
pub const DEFAULT_CONVERSATIONS_PER_PAGE: u32 = 10;
pub const DEFAULT_STREAM_THROTTLE_MS: u64 = 50;
pub const DEFAULT_SWITCH_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;
pub const DEFAULT_TITLE_POLL_ATTEMPTS: u32 = 10;
pub const DEFAULT_TITLE_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_TITLE_REVEAL_CHAR_MS: u64 = 50;

// Transcript and status texts shown when a backend call fails.
pub const SEND_ERROR_TEXT: &str =
    "Sorry, there was an error processing your message. Please try again.";
pub const LOAD_MESSAGES_ERROR_TEXT: &str =
    "Sorry, there was an error loading this conversation. Please try again.";
pub const CREATE_CONVERSATION_ERROR_TEXT: &str =
    "Sorry, there was an error creating a new conversation. Please try again.";
pub const DELETE_CONVERSATION_ERROR_TEXT: &str =
    "Sorry, there was an error deleting the conversation. Please try again.";
pub const RENAME_CONVERSATION_ERROR_TEXT: &str =
    "Sorry, there was an error renaming the conversation. Please try again.";
pub const LOAD_CONVERSATIONS_ERROR_TEXT: &str =
    "Sorry, there was an error loading your conversations. Please try again.";
pub const LOAD_OLDER_ERROR_TEXT: &str = "Could not load older messages.";
