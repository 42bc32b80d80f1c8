//! Interactive chat: terminal setup, input handling, and the frame loop.

mod keybindings;
mod lifecycle;

use std::error::Error;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::event::{self, Event};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::app::{
    apply_actions, App, AppAction, AppActionContext, AppActionDispatcher, AppActionEnvelope,
    AppCommand,
};
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::ui::renderer::ui;
use crate::ui::theme::Theme;
use crate::utils::clipboard::copy_to_clipboard;

use keybindings::{edit_input, latest_code_block, map_key, KeyCommand};
use lifecycle::{restore_terminal, setup_terminal, ChatTerminal};

const MAX_FPS: u64 = 60;
const EVENT_POLL: Duration = Duration::from_millis(10);
const IDLE_SLEEP: Duration = Duration::from_millis(16);

enum UiEvent {
    Crossterm(Event),
}

enum LoopControl {
    Continue,
    Quit,
}

fn spawn_event_reader(
    event_tx: mpsc::UnboundedSender<UiEvent>,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !stop.load(Ordering::Relaxed) {
            match event::poll(EVENT_POLL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(err) => debug!(%err, "failed to read terminal event"),
                },
                Ok(false) => {}
                Err(err) => {
                    debug!(%err, "terminal event poll failed");
                    break;
                }
            }
        }
    })
}

fn current_context(terminal: &ChatTerminal) -> AppActionContext {
    let size = terminal.size().unwrap_or_default();
    AppActionContext {
        term_width: size.width,
        term_height: size.height,
    }
}

fn handle_ui_event(
    app: &mut App,
    event: Event,
    dispatcher: &AppActionDispatcher,
    ctx: AppActionContext,
) -> LoopControl {
    match event {
        Event::Key(key) => match map_key(&key) {
            KeyCommand::Quit => return LoopControl::Quit,
            KeyCommand::Action(action) => dispatcher.dispatch(action, ctx),
            KeyCommand::Submit => {
                let text = app.ui.input_text();
                if !text.trim().is_empty() {
                    app.ui.clear_input();
                    dispatcher.dispatch(AppAction::SubmitMessage { text }, ctx);
                }
            }
            KeyCommand::CopyLatestCode => copy_latest_code(app, dispatcher, ctx),
            KeyCommand::Edit => {
                edit_input(&mut app.ui, key);
            }
            KeyCommand::Ignore => {}
        },
        Event::Paste(text) => {
            app.ui.textarea.insert_str(text);
        }
        _ => {}
    }
    LoopControl::Continue
}

fn copy_latest_code(app: &App, dispatcher: &AppActionDispatcher, ctx: AppActionContext) {
    let action = match latest_code_block(&app.store) {
        Some((message_id, block_index, code)) => match copy_to_clipboard(&code) {
            Ok(()) => AppAction::CodeBlockCopied {
                message_id,
                block_index,
            },
            Err(message) => AppAction::SetStatus { message },
        },
        None => AppAction::SetStatus {
            message: "No code block to copy".to_string(),
        },
    };
    dispatcher.dispatch(action, ctx);
}

/// Moves stream messages onto the action queue. Consecutive chunks of one
/// stream are joined into a single action.
fn process_stream_updates(
    dispatcher: &AppActionDispatcher,
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    ctx: AppActionContext,
) -> bool {
    let mut actions = Vec::new();
    let mut pending: Option<(u64, String)> = None;

    while let Ok((message, stream_id)) = rx.try_recv() {
        match message {
            StreamMessage::Chunk(content) => match pending.as_mut() {
                Some((id, buffer)) if *id == stream_id => buffer.push_str(&content),
                _ => {
                    if let Some((id, buffer)) = pending.replace((stream_id, content)) {
                        actions.push(AppAction::from_stream(StreamMessage::Chunk(buffer), id));
                    }
                }
            },
            other => {
                if let Some((id, buffer)) = pending.take() {
                    actions.push(AppAction::from_stream(StreamMessage::Chunk(buffer), id));
                }
                actions.push(AppAction::from_stream(other, stream_id));
            }
        }
    }
    if let Some((id, buffer)) = pending {
        actions.push(AppAction::from_stream(StreamMessage::Chunk(buffer), id));
    }

    if actions.is_empty() {
        return false;
    }
    dispatcher.dispatch_many(actions, ctx);
    true
}

fn drain_action_queue(
    app: &mut App,
    stream_service: &ChatStreamService,
    action_rx: &mut mpsc::UnboundedReceiver<AppActionEnvelope>,
) -> bool {
    let mut pending = Vec::new();
    while let Ok(envelope) = action_rx.try_recv() {
        pending.push(envelope);
    }
    if pending.is_empty() {
        return false;
    }

    for cmd in apply_actions(app, pending) {
        match cmd {
            AppCommand::SpawnStream(params) => stream_service.spawn_stream(params),
        }
    }
    true
}

pub async fn run_chat(mut app: App) -> Result<(), Box<dyn Error>> {
    let theme = Theme::dark_default();
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<AppActionEnvelope>();
    let dispatcher = AppActionDispatcher::new(action_tx);
    let (stream_service, mut stream_rx) = ChatStreamService::new();

    let mut terminal = setup_terminal()?;
    info!(model = %app.settings().model, transport = %app.settings().transport, "chat started");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let stop_reader = Arc::new(AtomicBool::new(false));
    let reader = spawn_event_reader(event_tx, stop_reader.clone());

    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut last_draw = Instant::now() - frame_duration;
    let mut request_redraw = true;

    let result: io::Result<()> = 'main_loop: loop {
        let ctx = current_context(&terminal);

        let mut events_processed = false;
        while let Ok(UiEvent::Crossterm(ev)) = event_rx.try_recv() {
            events_processed = true;
            if let LoopControl::Quit = handle_ui_event(&mut app, ev, &dispatcher, ctx) {
                break 'main_loop Ok(());
            }
        }

        let received_any = process_stream_updates(&dispatcher, &mut stream_rx, ctx);
        let actions_applied = drain_action_queue(&mut app, &stream_service, &mut action_rx);

        let now = Instant::now();
        let feedback_expired = app.ui.expire_feedback(now);
        let animating = app.is_loading || app.ui.current_status(now).is_some();
        if events_processed || received_any || actions_applied || feedback_expired || animating {
            request_redraw = true;
        }

        if request_redraw && now.duration_since(last_draw) >= frame_duration {
            if let Err(err) = terminal.draw(|f| ui(f, &mut app, &theme)) {
                break 'main_loop Err(err);
            }
            last_draw = now;
            request_redraw = false;
        }

        if !events_processed && !received_any && !actions_applied {
            tokio::time::sleep(IDLE_SLEEP).await;
        }
    };

    app.controller.cancel_active();
    stop_reader.store(true, Ordering::Relaxed);
    let _ = reader.await;
    restore_terminal(&mut terminal)?;
    info!("chat closed");
    result.map_err(Into::into)
}
