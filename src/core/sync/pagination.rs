use tracing::{debug, warn};

use super::{ConversationLoadMode, SyncAction, SyncCommand, SyncController, SyncState};
use crate::api::{ApiError, MessagePage};
use crate::core::constants::LOAD_OLDER_ERROR_TEXT;

pub(super) fn handle_pagination_action(
    controller: &mut SyncController,
    action: SyncAction,
) -> Vec<SyncCommand> {
    match action {
        SyncAction::LoadOlderMessages => load_older_messages(controller),
        SyncAction::LoadMoreConversations => load_more_conversations(controller),
        SyncAction::OlderMessagesLoaded {
            epoch,
            token,
            page,
            result,
        } => {
            older_messages_loaded(controller, epoch, token, page, result);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn load_older_messages(controller: &mut SyncController) -> Vec<SyncCommand> {
    if controller.state != SyncState::Idle
        || controller.older_page_request.is_some()
        || !controller.store.has_more_older()
    {
        return Vec::new();
    }
    let Some(conversation_id) = controller.active_id() else {
        return Vec::new();
    };

    let token = controller.next_token();
    controller.older_page_request = Some(token);
    let page = controller.store.page() - 1;
    debug!(conversation_id, page, "loading older messages");
    vec![SyncCommand::LoadMessagePage {
        epoch: controller.epoch,
        token,
        conversation_id,
        page,
        per_page: controller.settings.messages_per_page,
    }]
}

fn older_messages_loaded(
    controller: &mut SyncController,
    epoch: u64,
    token: u64,
    page: u32,
    result: Result<MessagePage, ApiError>,
) {
    if !controller.is_current_epoch(epoch, "older messages") {
        return;
    }
    if controller.older_page_request != Some(token) {
        debug!(token, "dropping superseded older-page result");
        return;
    }
    controller.older_page_request = None;
    if controller.state != SyncState::Idle {
        return;
    }
    match result {
        Ok(older) => {
            controller.store.merge_older_page(page, older.items);
        }
        Err(err) => {
            warn!(page, error = %err, "failed to load older messages");
            controller.notice(LOAD_OLDER_ERROR_TEXT);
        }
    }
}

fn load_more_conversations(controller: &mut SyncController) -> Vec<SyncCommand> {
    if !controller.conversations.has_more() || controller.conversation_page_in_flight {
        return Vec::new();
    }
    controller.conversation_page_in_flight = true;
    vec![SyncCommand::LoadConversations {
        mode: ConversationLoadMode::Append,
        page: controller.conversations.page() + 1,
        per_page: controller.settings.conversations_per_page,
    }]
}
