//! Glue between the controller, the executor, and whatever front-end drives
//! them.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::api::ChatBackend;
use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamTag};
use crate::core::executor::CommandExecutor;
use crate::core::sync::{
    apply_actions, SyncAction, SyncController, SyncDispatcher, SyncEvent, SyncSettings, ViewModel,
};

fn stream_action(message: StreamMessage, tag: StreamTag) -> SyncAction {
    match message {
        StreamMessage::Progress(content) => SyncAction::StreamProgress { tag, content },
        StreamMessage::Completed(content) => SyncAction::StreamCompleted { tag, content },
        StreamMessage::Failed(message) => SyncAction::StreamFailed { tag, message },
    }
}

pub struct SyncRuntime {
    controller: SyncController,
    executor: CommandExecutor,
    dispatcher: SyncDispatcher,
    action_rx: mpsc::UnboundedReceiver<SyncAction>,
    stream_rx: mpsc::UnboundedReceiver<(StreamMessage, StreamTag)>,
    view_tx: watch::Sender<ViewModel>,
}

impl SyncRuntime {
    pub fn new(backend: Arc<dyn ChatBackend>, settings: SyncSettings) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let dispatcher = SyncDispatcher::new(action_tx);
        let (streams, stream_rx) = ChatStreamService::new();
        let controller = SyncController::new(settings);
        let (view_tx, _) = watch::channel(controller.view_model());
        Self {
            executor: CommandExecutor::new(backend, dispatcher.clone(), streams),
            controller,
            dispatcher,
            action_rx,
            stream_rx,
            view_tx,
        }
    }

    pub fn dispatcher(&self) -> SyncDispatcher {
        self.dispatcher.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.view_tx.subscribe()
    }

    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        self.controller.drain_events()
    }

    /// Apply one action right away and run whatever it asks for.
    pub fn apply(&mut self, action: SyncAction) {
        self.apply_batch(vec![action]);
    }

    /// Wait for the next batch of results or stream messages and apply it.
    pub async fn step(&mut self) {
        let first = tokio::select! {
            Some(action) = self.action_rx.recv() => action,
            Some((message, tag)) = self.stream_rx.recv() => stream_action(message, tag),
            else => return,
        };

        let mut pending = vec![first];
        while let Ok(action) = self.action_rx.try_recv() {
            pending.push(action);
        }
        while let Ok((message, tag)) = self.stream_rx.try_recv() {
            pending.push(stream_action(message, tag));
        }
        self.apply_batch(pending);
    }

    fn apply_batch(&mut self, actions: Vec<SyncAction>) {
        let commands = apply_actions(&mut self.controller, actions);
        self.executor.execute_all(commands);
        self.view_tx.send_replace(self.controller.view_model());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;
    use crate::core::sync::SyncState;
    use crate::core::title_poll::TitlePollPolicy;
    use crate::utils::test_utils::{create_test_conversation, FakeBackend};
    use std::time::Duration;

    fn quick_settings() -> SyncSettings {
        SyncSettings {
            messages_per_page: 10,
            conversations_per_page: 10,
            stream_throttle: Duration::from_millis(1),
            switch_debounce: Duration::from_millis(1),
            settle_delay: Duration::from_millis(1),
            title_poll: TitlePollPolicy {
                attempts: 3,
                interval: Duration::from_millis(1),
            },
        }
    }

    async fn run_until(runtime: &mut SyncRuntime, done: impl Fn(&SyncController) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !done(runtime.controller()) {
                runtime.step().await;
            }
        })
        .await
        .expect("runtime did not reach expected state");
    }

    async fn ready_runtime(backend: Arc<FakeBackend>, open: Option<i64>) -> SyncRuntime {
        let mut runtime = SyncRuntime::new(backend, quick_settings());
        runtime.apply(SyncAction::Bootstrap { open });
        run_until(&mut runtime, |controller| {
            controller.active_id().is_some()
                && controller.state() == SyncState::Idle
                && !controller.is_debounced()
        })
        .await;
        runtime
    }

    #[tokio::test]
    async fn streamed_reply_is_finalized_once() {
        let backend = Arc::new(FakeBackend::new());
        backend.add_conversation(create_test_conversation(42, Some("Greetings"), 0));
        backend.script_stream(42, &["data:Hi\n\n", "data: there\n\n", "data:[DONE]\n\n"]);
        let mut runtime = ready_runtime(backend.clone(), Some(42)).await;
        let view = runtime.subscribe();

        runtime.apply(SyncAction::Send {
            text: "Hello".into(),
        });
        assert!(view.borrow().is_streaming);
        run_until(&mut runtime, |controller| {
            controller.state() == SyncState::Idle
        })
        .await;

        let messages = runtime.controller().store().messages();
        let replies: Vec<_> = messages
            .iter()
            .filter(|message| message.role == Role::Assistant)
            .collect();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].content, "Hi there");
        assert!(!replies[0].provisional);
        assert_eq!(messages[0].content, "Hello");
        assert_eq!(backend.sent_messages(), vec![(42, "Hello".to_string())]);
        assert_eq!(view.borrow().messages.last().unwrap().text, "Hi there");
    }

    #[tokio::test]
    async fn reply_after_switch_stays_out_of_new_conversation() {
        let backend = Arc::new(FakeBackend::new());
        backend.add_conversation(create_test_conversation(1, Some("First"), 10));
        backend.add_conversation(create_test_conversation(2, Some("Second"), 0));
        let chunks = backend.stream_channel(1);
        let mut runtime = ready_runtime(backend.clone(), None).await;
        assert_eq!(runtime.controller().active_id(), Some(1));

        runtime.apply(SyncAction::Send {
            text: "Hello".into(),
        });
        chunks.send(Ok(b"data:partial\n\n".to_vec())).unwrap();
        run_until(&mut runtime, |controller| {
            controller
                .store()
                .messages()
                .iter()
                .any(|message| message.provisional && message.content == "partial")
        })
        .await;

        runtime.apply(SyncAction::SelectConversation { id: 2 });
        let _ = chunks.send(Ok(b"data: reply\n\ndata:[DONE]\n\n".to_vec()));
        drop(chunks);
        run_until(&mut runtime, |controller| {
            controller.active_id() == Some(2) && controller.state() == SyncState::Idle
        })
        .await;

        assert!(runtime.controller().store().is_empty());
        assert_eq!(runtime.controller().state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn default_title_is_polled_and_revealed() {
        let backend = Arc::new(FakeBackend::new());
        backend.add_conversation(create_test_conversation(7, Some("New Chat"), 0));
        backend.title_after(7, 1, "Weekend plans");
        backend.script_stream(7, &["data:Sure\n\n", "data:[DONE]\n\n"]);
        let mut runtime = ready_runtime(backend, Some(7)).await;

        runtime.apply(SyncAction::Send {
            text: "Plan my weekend".into(),
        });
        run_until(&mut runtime, |controller| {
            controller
                .active_conversation()
                .is_some_and(|conversation| conversation.display_title() == "Weekend plans")
        })
        .await;

        let events = runtime.drain_events();
        assert!(events.contains(&SyncEvent::TitleRevealed {
            conversation_id: 7,
            title: "Weekend plans".into()
        }));
    }

    #[tokio::test]
    async fn unknown_conversation_falls_back_to_most_recent() {
        let backend = Arc::new(FakeBackend::new());
        backend.add_conversation(create_test_conversation(1, Some("Only"), 0));
        let mut runtime = ready_runtime(backend, Some(404)).await;

        assert_eq!(runtime.controller().active_id(), Some(1));
        assert_eq!(
            runtime.drain_events(),
            vec![SyncEvent::Notice("Conversation 404 was not found".into())]
        );
    }
}
