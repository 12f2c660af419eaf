use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::ChatBackend;
use crate::core::conversation::Conversation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitlePollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for TitlePollPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_secs(1),
        }
    }
}

/// Re-fetch a conversation until the backend has replaced its default title.
///
/// The first fetch happens immediately; failed fetches count as attempts and
/// polling carries on. Returns `None` once the attempts are used up.
pub async fn poll_title(
    backend: &dyn ChatBackend,
    conversation_id: i64,
    policy: TitlePollPolicy,
) -> Option<Conversation> {
    for attempt in 1..=policy.attempts {
        match backend.fetch_conversation(conversation_id).await {
            Ok(conversation) if !conversation.has_default_title() => {
                info!(
                    conversation_id,
                    attempt,
                    title = conversation.display_title(),
                    "conversation title generated"
                );
                return Some(conversation);
            }
            Ok(_) => debug!(conversation_id, attempt, "title not generated yet"),
            Err(err) if err.is_not_found() => {
                debug!(conversation_id, "conversation disappeared while polling for title");
                return None;
            }
            Err(err) => warn!(conversation_id, attempt, error = %err, "title poll failed"),
        }
        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    debug!(conversation_id, attempts = policy.attempts, "title poll gave up");
    None
}
