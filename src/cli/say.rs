//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};

use ratatui::crossterm::terminal;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::app::{apply_action, App, AppAction, AppActionContext, AppCommand};
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::core::message::{Message, Role};
use crate::ui::markdown::{render_markdown, RenderOptions};
use crate::ui::theme::Theme;
use crate::ui::typewriter::replay;

const FALLBACK_WIDTH: u16 = 80;

pub async fn run_say(
    mut app: App,
    prompt: Vec<String>,
    typewriter: bool,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        return Err("Usage: diybot say <prompt>".into());
    }

    let (width, height) = terminal::size().unwrap_or((FALLBACK_WIDTH, 0));
    let ctx = AppActionContext {
        term_width: width,
        term_height: height,
    };

    let (stream_service, mut rx) = ChatStreamService::new();
    match apply_action(&mut app, AppAction::SubmitMessage { text: prompt }, ctx) {
        Some(AppCommand::SpawnStream(params)) => stream_service.spawn_stream(params),
        None => {
            let reason = app.ui.status.take().map(|(text, _)| text);
            return Err(reason.unwrap_or_else(|| "nothing to send".to_string()).into());
        }
    }
    info!(model = %app.settings().model, "say request sent");

    let reply = await_reply(&mut app, &mut rx, ctx)
        .await
        .ok_or("the reply stream closed without an answer")?;

    match reply.role {
        Role::Error => Err(reply.text_or_empty().to_string().into()),
        _ if typewriter => print_typewriter(&app, reply.text_or_empty()).await,
        _ => print_markdown(&app, reply.text_or_empty(), width),
    }
}

/// Feeds stream messages through the state machine until the session ends.
/// Returns the finished bot or error message.
async fn await_reply(
    app: &mut App,
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    ctx: AppActionContext,
) -> Option<Message> {
    let message_id = app.stream.as_ref()?.message_id.clone();
    while app.stream.is_some() {
        let (message, stream_id) = rx.recv().await?;
        debug!(stream_id, "say received stream message");
        apply_action(app, AppAction::from_stream(message, stream_id), ctx);
    }
    app.store.get(&message_id).cloned()
}

fn print_markdown(app: &App, text: &str, width: u16) -> Result<(), Box<dyn Error>> {
    let theme = Theme::dark_default();
    let mut opts = RenderOptions::new(&theme);
    opts.syntax_highlighting = app.settings().syntax_highlighting;
    opts.width = usize::from(width);

    let mut stdout = io::stdout().lock();
    for line in render_markdown(text, &opts) {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;
    Ok(())
}

async fn print_typewriter(app: &App, text: &str) -> Result<(), Box<dyn Error>> {
    let mut stdout = io::stdout();
    let mut failure: Option<io::Error> = None;
    replay(text, app.settings().reveal_interval, |token| {
        if failure.is_some() {
            return;
        }
        if let Err(err) = stdout.write_all(token.as_bytes()).and_then(|()| stdout.flush()) {
            failure = Some(err);
        }
    })
    .await;
    if let Some(err) = failure {
        return Err(err.into());
    }
    writeln!(stdout)?;
    Ok(())
}
