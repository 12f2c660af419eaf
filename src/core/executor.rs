//! Runs [`SyncCommand`]s against a [`ChatBackend`].
//!
//! Every command becomes its own Tokio task; results come back to the
//! controller as [`SyncAction`]s through the dispatcher, tagged with whatever
//! epoch and token the command carried.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::ChatBackend;
use crate::core::chat_stream::{ChatStreamService, StreamParams};
use crate::core::conversation::ConversationPatch;
use crate::core::message_store::load_initial;
use crate::core::sync::{ConversationLoadMode, StreamRequest, SyncAction, SyncCommand, SyncDispatcher};
use crate::core::title_poll::poll_title;

#[derive(Clone)]
pub struct CommandExecutor {
    backend: Arc<dyn ChatBackend>,
    dispatcher: SyncDispatcher,
    streams: ChatStreamService,
}

impl CommandExecutor {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        dispatcher: SyncDispatcher,
        streams: ChatStreamService,
    ) -> Self {
        Self {
            backend,
            dispatcher,
            streams,
        }
    }

    pub fn execute_all(&self, commands: impl IntoIterator<Item = SyncCommand>) {
        for command in commands {
            self.execute(command);
        }
    }

    pub fn execute(&self, command: SyncCommand) {
        match command {
            SyncCommand::LoadConversations {
                mode,
                page,
                per_page,
            } => self.spawn_conversation_page(mode, page, per_page),
            SyncCommand::LoadMessages {
                epoch,
                token,
                conversation_id,
                per_page,
            } => {
                let backend = self.backend.clone();
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    let result = load_initial(backend.as_ref(), conversation_id, per_page).await;
                    dispatcher.dispatch(SyncAction::MessagesLoaded {
                        epoch,
                        token,
                        result,
                    });
                });
            }
            SyncCommand::LoadMessagePage {
                epoch,
                token,
                conversation_id,
                page,
                per_page,
            } => {
                let backend = self.backend.clone();
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    let result = backend.list_messages(conversation_id, page, per_page).await;
                    dispatcher.dispatch(SyncAction::OlderMessagesLoaded {
                        epoch,
                        token,
                        page,
                        result,
                    });
                });
            }
            SyncCommand::OpenStream(request) => self.open_stream(request),
            SyncCommand::CreateConversation {
                epoch,
                token,
                title,
                per_page,
            } => {
                let backend = self.backend.clone();
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    let result = backend.create_conversation(&title).await;
                    let first_page = if result.is_ok() {
                        match backend.list_conversations(1, per_page).await {
                            Ok(page) => Some(page),
                            Err(err) => {
                                warn!(error = %err, "could not refresh conversations after create");
                                None
                            }
                        }
                    } else {
                        None
                    };
                    dispatcher.dispatch(SyncAction::ConversationCreated {
                        epoch,
                        token,
                        result,
                        first_page,
                    });
                });
            }
            SyncCommand::UpdateConversation { id, patch } => {
                let backend = self.backend.clone();
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    let result = backend.update_conversation(id, &patch).await;
                    dispatcher.dispatch(SyncAction::ConversationUpdated { id, result });
                });
            }
            SyncCommand::DeleteConversation { id } => {
                let backend = self.backend.clone();
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    let result = backend.delete_conversation(id).await;
                    dispatcher.dispatch(SyncAction::ConversationDeleted { id, result });
                });
            }
            SyncCommand::FetchConversation { epoch, id } => {
                let backend = self.backend.clone();
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    let result = backend.fetch_conversation(id).await;
                    dispatcher.dispatch(SyncAction::ConversationFetched { epoch, id, result });
                });
            }
            SyncCommand::TouchConversation {
                id,
                title,
                per_page,
            } => self.spawn_touch(id, title, per_page),
            SyncCommand::PollTitle {
                epoch,
                conversation_id,
                policy,
            } => {
                let backend = self.backend.clone();
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    let conversation = poll_title(backend.as_ref(), conversation_id, policy).await;
                    dispatcher.dispatch(SyncAction::TitlePolled {
                        epoch,
                        conversation_id,
                        conversation,
                    });
                });
            }
            SyncCommand::ScheduleSettle {
                epoch,
                token,
                delay,
            } => {
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    dispatcher.dispatch(SyncAction::SettleElapsed { epoch, token });
                });
            }
            SyncCommand::ScheduleDebounceRelease { token, delay } => {
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    dispatcher.dispatch(SyncAction::DebounceReleased { token });
                });
            }
        }
    }

    fn spawn_conversation_page(&self, mode: ConversationLoadMode, page: u32, per_page: u32) {
        let backend = self.backend.clone();
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            let result = backend.list_conversations(page, per_page).await;
            dispatcher.dispatch(SyncAction::ConversationsLoaded { mode, result });
        });
    }

    /// Re-save a conversation unchanged so the backend bumps it to the top of
    /// the list, then reload the first page.
    fn spawn_touch(&self, id: i64, title: String, per_page: u32) {
        let backend = self.backend.clone();
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            match backend
                .update_conversation(id, &ConversationPatch::title(title))
                .await
            {
                Ok(conversation) => dispatcher.dispatch(SyncAction::ConversationUpdated {
                    id,
                    result: Ok(conversation),
                }),
                Err(err) => {
                    warn!(conversation_id = id, error = %err, "could not move conversation to top");
                    return;
                }
            }
            let result = backend.list_conversations(1, per_page).await;
            dispatcher.dispatch(SyncAction::ConversationsLoaded {
                mode: ConversationLoadMode::Refresh,
                result,
            });
        });
    }

    fn open_stream(&self, request: StreamRequest) {
        let StreamRequest {
            conversation_id,
            text,
            tag,
            throttle,
            cancel_token,
        } = request;
        debug!(conversation_id, stream_id = tag.stream_id, "spawning reply stream");
        self.streams.spawn_stream(StreamParams {
            backend: self.backend.clone(),
            conversation_id,
            text,
            throttle,
            cancel_token,
            tag,
        });
    }
}
