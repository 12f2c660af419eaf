//! Main chat event loop
//!
//! Terminal input is read on a dedicated task and forwarded over a channel.
//! The loop multiplexes those events with [`SyncRuntime::step`], so results
//! from the backend and streamed replies are applied as soon as they arrive,
//! and redraws at most once per frame.

mod keybindings;
mod lifecycle;

use std::{
    error::Error,
    sync::Arc,
    time::{Duration, Instant},
};

use ratatui::crossterm::event::{self, Event, KeyEventKind};
use tokio::sync::mpsc;
use tracing::info;

use crate::api::ChatBackend;
use crate::core::runtime::SyncRuntime;
use crate::core::sync::{SyncAction, SyncSettings};
use crate::core::title_reveal::RevealTiming;
use crate::ui::renderer::ui;
use crate::ui::state::UiState;
use crate::ui::theme::Theme;

use self::keybindings::handle_key;
use self::lifecycle::{restore_terminal, setup_terminal};

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
}

const MAX_FPS: u64 = 60;

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || loop {
        if let Ok(true) = event::poll(Duration::from_millis(50)) {
            match event::read() {
                Ok(ev) => {
                    if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => continue,
            }
        } else if event_tx.is_closed() {
            break;
        }
    })
}

/// Apply one terminal event. Returns true when the screen needs a redraw.
fn process_ui_event(
    runtime: &mut SyncRuntime,
    state: &mut UiState,
    event: UiEvent,
    now: Instant,
) -> bool {
    match event {
        UiEvent::Crossterm(Event::Key(key)) if key.kind == KeyEventKind::Press => {
            let view = runtime.controller().view_model();
            if let Some(action) = handle_key(state, &view, key, now) {
                runtime.apply(action);
            }
            true
        }
        UiEvent::Crossterm(Event::Paste(text)) => {
            state
                .input
                .extend(text.chars().filter(|ch| !ch.is_control()));
            true
        }
        UiEvent::Crossterm(Event::Resize(_, _)) => true,
        UiEvent::Crossterm(_) => false,
    }
}

pub async fn run_chat(
    backend: Arc<dyn ChatBackend>,
    settings: SyncSettings,
    reveal_timing: RevealTiming,
    open: Option<i64>,
) -> Result<(), Box<dyn Error>> {
    let mut runtime = SyncRuntime::new(backend, settings);
    let view_rx = runtime.subscribe();
    runtime.apply(SyncAction::Bootstrap { open });
    info!(?open, "chat session started");

    let mut terminal = setup_terminal()?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader = spawn_event_reader(event_tx);

    let theme = Theme::default();
    let mut state = UiState::new(reveal_timing);
    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut ticker = tokio::time::interval(frame_duration);
    let mut request_redraw = true;

    let result: Result<(), Box<dyn Error>> = loop {
        if request_redraw {
            let now = Instant::now();
            let view = view_rx.borrow().clone();
            state.sync_selection(&view);
            if let Err(err) = terminal.draw(|f| ui(f, &view, &state, &theme, now)) {
                break Err(err.into());
            }
            request_redraw = false;
        }

        tokio::select! {
            Some(event) = event_rx.recv() => {
                let now = Instant::now();
                request_redraw |= process_ui_event(&mut runtime, &mut state, event, now);
                while let Ok(event) = event_rx.try_recv() {
                    request_redraw |= process_ui_event(&mut runtime, &mut state, event, now);
                }
            }
            _ = runtime.step() => {
                request_redraw = true;
            }
            _ = ticker.tick() => {
                request_redraw |= state.tick(Instant::now());
            }
        }

        let now = Instant::now();
        for event in runtime.drain_events() {
            state.handle_event(event, now);
            request_redraw = true;
        }

        if state.exit_requested {
            break Ok(());
        }
    };

    drop(event_rx);
    restore_terminal(&mut terminal)?;
    let _ = event_reader.await;
    info!("chat session ended");
    result
}
