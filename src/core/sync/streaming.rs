use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    ActiveStream, ConversationLoadMode, StreamRequest, SyncAction, SyncCommand, SyncController,
    SyncError, SyncEvent, SyncState,
};
use crate::core::chat_stream::StreamTag;
use crate::core::constants::SEND_ERROR_TEXT;
use crate::core::conversation::{Conversation, ConversationPatch};
use crate::core::message::{Message, MessageId};

pub(super) fn handle_streaming_action(
    controller: &mut SyncController,
    action: SyncAction,
) -> Vec<SyncCommand> {
    match action {
        SyncAction::Send { text } => send(controller, text),
        SyncAction::StreamProgress { tag, content } => {
            if let Some(temp_id) = current_temp_id(controller, tag) {
                controller.store.update_content(temp_id, &content);
            }
            Vec::new()
        }
        SyncAction::StreamCompleted { tag, content } => stream_completed(controller, tag, content),
        SyncAction::StreamFailed { tag, message } => {
            stream_failed(controller, tag, &message);
            Vec::new()
        }
        SyncAction::TitlePolled {
            epoch,
            conversation_id,
            conversation,
        } => {
            title_polled(controller, epoch, conversation_id, conversation);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn current_temp_id(controller: &SyncController, tag: StreamTag) -> Option<MessageId> {
    if !controller.is_current_stream(tag) {
        debug!(
            epoch = tag.epoch,
            stream_id = tag.stream_id,
            "dropping stale stream message"
        );
        return None;
    }
    controller.stream.as_ref().map(|stream| stream.temp_id)
}

fn send(controller: &mut SyncController, text: String) -> Vec<SyncCommand> {
    if text.trim().is_empty() {
        controller.reject(SyncError::EmptyInput);
        return Vec::new();
    }
    if controller.state != SyncState::Idle {
        controller.reject(SyncError::Busy);
        return Vec::new();
    }
    let Some(conversation_id) = controller.active_id() else {
        controller.reject(SyncError::NoConversation);
        return Vec::new();
    };

    let now = Utc::now();
    controller.store.append(Message::user(text.clone(), now));
    let provisional = Message::provisional_assistant(now);
    let temp_id = provisional.id;
    controller.store.append(provisional);

    // An older page merged under a live reply would shift it mid-stream.
    controller.older_page_request = None;

    controller.next_stream_id += 1;
    let stream_id = controller.next_stream_id;
    let cancel_token = CancellationToken::new();
    controller.stream = Some(ActiveStream {
        stream_id,
        temp_id,
        conversation_id,
        cancel: cancel_token.clone(),
    });
    controller.state = SyncState::Streaming;
    info!(conversation_id, stream_id, "sending message");

    vec![SyncCommand::OpenStream(StreamRequest {
        conversation_id,
        text,
        tag: StreamTag {
            epoch: controller.epoch,
            stream_id,
        },
        throttle: controller.settings.stream_throttle,
        cancel_token,
    })]
}

fn stream_completed(
    controller: &mut SyncController,
    tag: StreamTag,
    content: String,
) -> Vec<SyncCommand> {
    if current_temp_id(controller, tag).is_none() {
        return Vec::new();
    }
    let Some(stream) = controller.stream.take() else {
        return Vec::new();
    };

    let final_message = Message::assistant(MessageId::next_local(), content, Utc::now());
    if !controller.store.replace(stream.temp_id, final_message.clone()) {
        controller.store.append(final_message);
    }
    controller.state = SyncState::Idle;
    info!(
        conversation_id = stream.conversation_id,
        stream_id = stream.stream_id,
        "reply finalized"
    );

    let mut commands = vec![SyncCommand::LoadConversations {
        mode: ConversationLoadMode::Refresh,
        page: 1,
        per_page: controller.settings.conversations_per_page,
    }];
    let wants_title = controller
        .active
        .as_ref()
        .is_some_and(|active| active.id == stream.conversation_id && active.has_default_title());
    if wants_title && controller.title_polled.insert(stream.conversation_id) {
        commands.push(SyncCommand::PollTitle {
            epoch: controller.epoch,
            conversation_id: stream.conversation_id,
            policy: controller.settings.title_poll,
        });
    }
    commands
}

fn stream_failed(controller: &mut SyncController, tag: StreamTag, message: &str) {
    if current_temp_id(controller, tag).is_none() {
        return;
    }
    let Some(stream) = controller.stream.take() else {
        return;
    };
    warn!(
        conversation_id = stream.conversation_id,
        stream_id = stream.stream_id,
        error = message,
        "reply stream failed"
    );
    controller.store.remove(stream.temp_id);
    controller.store.append(Message::error(SEND_ERROR_TEXT));
    controller.state = SyncState::Idle;
}

fn title_polled(
    controller: &mut SyncController,
    epoch: u64,
    conversation_id: i64,
    conversation: Option<Conversation>,
) {
    let Some(conversation) = conversation else {
        debug!(conversation_id, "no generated title");
        return;
    };
    let title = conversation.display_title().to_string();
    // Only the title changes; the list keeps its own order and timestamps.
    controller
        .conversations
        .patch(conversation_id, &ConversationPatch::title(title.clone()));

    if epoch != controller.epoch || controller.active_id() != Some(conversation_id) {
        debug!(conversation_id, "title arrived after navigation; list patched only");
        return;
    }
    controller.active = Some(conversation);
    controller.events.push(SyncEvent::TitleRevealed {
        conversation_id,
        title,
    });
}
