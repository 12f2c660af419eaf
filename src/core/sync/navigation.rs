use tracing::{debug, info, warn};

use super::{ConversationLoadMode, SyncAction, SyncCommand, SyncController, SyncError, SyncState};
use crate::api::{ApiError, ConversationPage};
use crate::core::constants::{
    CREATE_CONVERSATION_ERROR_TEXT, DELETE_CONVERSATION_ERROR_TEXT,
    LOAD_CONVERSATIONS_ERROR_TEXT, LOAD_MESSAGES_ERROR_TEXT, RENAME_CONVERSATION_ERROR_TEXT,
};
use crate::core::conversation::{Conversation, ConversationPatch, DEFAULT_TITLE};
use crate::core::message::Message;
use crate::core::message_store::InitialLoad;

pub(super) fn handle_navigation_action(
    controller: &mut SyncController,
    action: SyncAction,
) -> Vec<SyncCommand> {
    match action {
        SyncAction::Bootstrap { open } => vec![controller.load_first_conversation_page(
            ConversationLoadMode::Initial { open },
        )],
        SyncAction::SelectConversation { id } => select_conversation(controller, id),
        SyncAction::OpenConversation { id } => open_conversation(controller, id),
        SyncAction::CreateNewChat => create_new_chat(controller),
        SyncAction::Rename { id, title } => rename(controller, id, &title),
        SyncAction::Delete { id } => vec![SyncCommand::DeleteConversation { id }],
        SyncAction::ConversationsLoaded { mode, result } => {
            conversations_loaded(controller, mode, result)
        }
        SyncAction::MessagesLoaded {
            epoch,
            token,
            result,
        } => messages_loaded(controller, epoch, token, result),
        SyncAction::SettleElapsed { epoch, token } => settle_elapsed(controller, epoch, token),
        SyncAction::DebounceReleased { token } => {
            if controller.debounce == Some(token) {
                controller.debounce = None;
            }
            Vec::new()
        }
        SyncAction::ConversationCreated {
            epoch,
            token,
            result,
            first_page,
        } => conversation_created(controller, epoch, token, result, first_page),
        SyncAction::ConversationUpdated { id, result } => {
            conversation_updated(controller, id, result);
            Vec::new()
        }
        SyncAction::ConversationDeleted { id, result } => {
            conversation_deleted(controller, id, result)
        }
        SyncAction::ConversationFetched { epoch, id, result } => {
            conversation_fetched(controller, epoch, id, result)
        }
        _ => Vec::new(),
    }
}

impl SyncController {
    fn load_first_conversation_page(&self, mode: ConversationLoadMode) -> SyncCommand {
        SyncCommand::LoadConversations {
            mode,
            page: 1,
            per_page: self.settings.conversations_per_page,
        }
    }

    /// Make `conversation` active and start loading its messages. Opens a
    /// fresh debounce window.
    fn switch_to(&mut self, conversation: Conversation) -> Vec<SyncCommand> {
        let token = self.next_token();
        self.debounce = Some(token);
        self.bump_epoch();
        self.store.clear();
        self.creating_from = None;
        self.state = SyncState::SwitchingConversation;

        let conversation_id = conversation.id;
        info!(conversation_id, epoch = self.epoch, "switching conversation");
        self.active = Some(conversation);

        vec![SyncCommand::LoadMessages {
            epoch: self.epoch,
            token,
            conversation_id,
            per_page: self.settings.messages_per_page,
        }]
    }

    fn enter_empty_state(&mut self) {
        self.bump_epoch();
        self.store.clear();
        self.active = None;
        self.debounce = None;
        self.state = SyncState::Idle;
        debug!("no conversation to show");
    }

    /// Keep the current conversation if it is still listed, otherwise move to
    /// the most recent one.
    fn fall_back_to_first(&mut self) -> Vec<SyncCommand> {
        if let Some(active) = self.active_id() {
            if self.conversations.contains(active) {
                return Vec::new();
            }
        }
        match self.conversations.first().cloned() {
            Some(first) => self.switch_to(first),
            None => {
                self.enter_empty_state();
                Vec::new()
            }
        }
    }

    fn sync_active_from_list(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Some(listed) = self.conversations.get(active.id) {
            *active = listed.clone();
        }
    }
}

fn select_conversation(controller: &mut SyncController, id: i64) -> Vec<SyncCommand> {
    if controller.debounce.is_some() {
        debug!(conversation_id = id, "selection ignored while switch settles");
        return Vec::new();
    }
    if controller.active_id() == Some(id) {
        return Vec::new();
    }
    match controller.conversations.get(id).cloned() {
        Some(conversation) => controller.switch_to(conversation),
        None => open_conversation(controller, id),
    }
}

fn open_conversation(controller: &mut SyncController, id: i64) -> Vec<SyncCommand> {
    if let Some(conversation) = controller.conversations.get(id).cloned() {
        if controller.active_id() == Some(id) {
            return Vec::new();
        }
        return controller.switch_to(conversation);
    }
    debug!(conversation_id = id, "conversation not loaded; fetching directly");
    vec![SyncCommand::FetchConversation {
        epoch: controller.epoch,
        id,
    }]
}

fn conversation_fetched(
    controller: &mut SyncController,
    epoch: u64,
    id: i64,
    result: Result<Conversation, ApiError>,
) -> Vec<SyncCommand> {
    if !controller.is_current_epoch(epoch, "fetched conversation") {
        return Vec::new();
    }
    match result {
        Ok(conversation) => {
            let title = conversation.display_title().to_string();
            let mut commands = controller.switch_to(conversation);
            if !controller
                .conversations
                .is_on_first_page(id, controller.settings.conversations_per_page)
            {
                commands.push(SyncCommand::TouchConversation {
                    id,
                    title,
                    per_page: controller.settings.conversations_per_page,
                });
            }
            commands
        }
        Err(err) => {
            if err.is_not_found() {
                info!(conversation_id = id, "requested conversation does not exist");
                controller.notice(format!("Conversation {id} was not found"));
            } else {
                warn!(conversation_id = id, error = %err, "failed to open conversation");
                controller.notice(LOAD_MESSAGES_ERROR_TEXT);
            }
            controller.fall_back_to_first()
        }
    }
}

fn conversations_loaded(
    controller: &mut SyncController,
    mode: ConversationLoadMode,
    result: Result<ConversationPage, ApiError>,
) -> Vec<SyncCommand> {
    match (mode, result) {
        (ConversationLoadMode::Initial { open }, Ok(page)) => {
            controller.conversations.load_first_page(page);
            match open {
                Some(id) => open_conversation(controller, id),
                None => controller.fall_back_to_first(),
            }
        }
        (ConversationLoadMode::Initial { open }, Err(err)) => {
            warn!(error = %err, "failed to load conversations");
            controller.notice(LOAD_CONVERSATIONS_ERROR_TEXT);
            match open {
                Some(id) => open_conversation(controller, id),
                None => Vec::new(),
            }
        }
        (ConversationLoadMode::Refresh, Ok(page)) => {
            controller.conversations.load_first_page(page);
            controller.sync_active_from_list();
            Vec::new()
        }
        (ConversationLoadMode::Append, Ok(page)) => {
            controller.conversation_page_in_flight = false;
            let added = controller.conversations.append_page(page);
            debug!(added, page = controller.conversations.page(), "appended conversations");
            Vec::new()
        }
        (ConversationLoadMode::Refresh | ConversationLoadMode::Append, Err(err)) => {
            if mode == ConversationLoadMode::Append {
                controller.conversation_page_in_flight = false;
            }
            warn!(error = %err, ?mode, "failed to load conversations");
            controller.notice(LOAD_CONVERSATIONS_ERROR_TEXT);
            Vec::new()
        }
    }
}

fn messages_loaded(
    controller: &mut SyncController,
    epoch: u64,
    token: u64,
    result: Result<InitialLoad, ApiError>,
) -> Vec<SyncCommand> {
    if !controller.is_current_epoch(epoch, "messages") {
        return Vec::new();
    }
    match result {
        Ok(load) => controller.store.apply_initial(load),
        Err(err) => {
            warn!(
                conversation_id = ?controller.active_id(),
                error = %err,
                "failed to load messages"
            );
            controller.store.clear();
            controller.store.append(Message::error(LOAD_MESSAGES_ERROR_TEXT));
        }
    }
    vec![SyncCommand::ScheduleSettle {
        epoch,
        token,
        delay: controller.settings.settle_delay,
    }]
}

fn settle_elapsed(controller: &mut SyncController, epoch: u64, token: u64) -> Vec<SyncCommand> {
    if epoch == controller.epoch && controller.state == SyncState::SwitchingConversation {
        controller.state = SyncState::Idle;
    }
    vec![SyncCommand::ScheduleDebounceRelease {
        token,
        delay: controller.settings.switch_debounce,
    }]
}

fn create_new_chat(controller: &mut SyncController) -> Vec<SyncCommand> {
    if controller.debounce.is_some() || controller.state == SyncState::CreatingConversation {
        debug!(state = ?controller.state, "new chat ignored");
        return Vec::new();
    }
    let token = controller.next_token();
    controller.debounce = Some(token);
    controller.bump_epoch();
    controller.store.clear();
    controller.creating_from = controller.active.take();
    controller.state = SyncState::CreatingConversation;
    info!(epoch = controller.epoch, "creating conversation");

    vec![SyncCommand::CreateConversation {
        epoch: controller.epoch,
        token,
        title: DEFAULT_TITLE.to_string(),
        per_page: controller.settings.conversations_per_page,
    }]
}

fn conversation_created(
    controller: &mut SyncController,
    epoch: u64,
    token: u64,
    result: Result<Conversation, ApiError>,
    first_page: Option<ConversationPage>,
) -> Vec<SyncCommand> {
    if !controller.is_current_epoch(epoch, "created conversation") {
        return Vec::new();
    }
    match result {
        Ok(conversation) => {
            if let Some(page) = first_page {
                controller.conversations.load_first_page(page);
            }
            if !controller.conversations.contains(conversation.id) {
                controller.conversations.prepend(conversation.clone());
            }
            info!(conversation_id = conversation.id, "conversation created");
            controller.active = Some(conversation);
            controller.creating_from = None;
            controller.state = SyncState::SwitchingConversation;
            vec![SyncCommand::ScheduleSettle {
                epoch,
                token,
                delay: controller.settings.settle_delay,
            }]
        }
        Err(err) => {
            warn!(error = %err, "failed to create conversation");
            controller.debounce = None;
            match controller.creating_from.take() {
                Some(previous) => {
                    controller.notice(CREATE_CONVERSATION_ERROR_TEXT);
                    controller.switch_to(previous)
                }
                None => {
                    controller
                        .store
                        .append(Message::error(CREATE_CONVERSATION_ERROR_TEXT));
                    controller.state = SyncState::Idle;
                    Vec::new()
                }
            }
        }
    }
}

fn rename(controller: &mut SyncController, id: i64, title: &str) -> Vec<SyncCommand> {
    let title = title.trim();
    if title.is_empty() {
        controller.reject(SyncError::EmptyInput);
        return Vec::new();
    }
    // A title chosen by hand must not be replaced by a late auto-title.
    controller.title_polled.insert(id);
    vec![SyncCommand::UpdateConversation {
        id,
        patch: ConversationPatch::title(title),
    }]
}

fn conversation_updated(
    controller: &mut SyncController,
    id: i64,
    result: Result<Conversation, ApiError>,
) {
    match result {
        Ok(conversation) => {
            controller.conversations.update(conversation.clone());
            if controller.active_id() == Some(id) {
                controller.active = Some(conversation);
            }
        }
        Err(err) => {
            warn!(conversation_id = id, error = %err, "failed to rename conversation");
            controller.notice(RENAME_CONVERSATION_ERROR_TEXT);
        }
    }
}

fn conversation_deleted(
    controller: &mut SyncController,
    id: i64,
    result: Result<(), ApiError>,
) -> Vec<SyncCommand> {
    if let Err(err) = result {
        warn!(conversation_id = id, error = %err, "failed to delete conversation");
        controller.notice(DELETE_CONVERSATION_ERROR_TEXT);
        return Vec::new();
    }

    info!(conversation_id = id, "conversation deleted");
    controller.conversations.remove(id);
    controller.title_polled.remove(&id);
    if controller
        .creating_from
        .as_ref()
        .is_some_and(|previous| previous.id == id)
    {
        controller.creating_from = None;
    }

    let mut commands = Vec::new();
    if controller.active_id() == Some(id) {
        match controller.conversations.first().cloned() {
            Some(next) => commands.extend(controller.switch_to(next)),
            None => controller.enter_empty_state(),
        }
    }
    commands.push(controller.load_first_conversation_page(ConversationLoadMode::Refresh));
    commands
}
