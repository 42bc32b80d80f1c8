use super::{App, AppAction, AppActionContext};

/// Rows kept from the previous page when paging.
const PAGE_OVERLAP: u16 = 2;

pub(super) fn handle_input_action(app: &mut App, action: AppAction, ctx: AppActionContext) {
    match action {
        AppAction::SetStatus { message } => app.ui.set_status(message),
        AppAction::ClearStatus => app.ui.clear_status(),
        AppAction::ScrollUp { lines } => app.ui.scroll_up(lines),
        AppAction::ScrollDown { lines } => app.ui.scroll_down(lines),
        AppAction::PageUp => {
            let page = page_size(app, ctx);
            app.ui.scroll_up(page);
        }
        AppAction::PageDown => {
            let page = page_size(app, ctx);
            app.ui.scroll_down(page);
        }
        AppAction::ScrollToEnd => app.ui.enable_auto_scroll(),
        AppAction::CodeBlockCopied {
            message_id,
            block_index,
        } => {
            let ttl = app.settings().copy_feedback;
            app.ui.mark_copied(message_id, block_index, ttl);
            app.ui.set_status("Copied code block to clipboard");
        }
        _ => unreachable!("non-input action routed to input handler"),
    }
}

fn page_size(app: &App, ctx: AppActionContext) -> u16 {
    let visible = if app.ui.transcript_height > 0 {
        app.ui.transcript_height
    } else {
        ctx.term_height
    };
    visible.saturating_sub(PAGE_OVERLAP).max(1)
}
