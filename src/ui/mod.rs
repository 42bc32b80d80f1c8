//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: terminal setup, key handling, and the frame loop that
//!   feeds stream updates into [`crate::core::app`].
//! - [`renderer`]: lays out the transcript, status line, and input box.
//! - [`markdown`]: incremental Markdown rendering with the streaming cursor.
//! - [`typewriter`]: timed word-by-word replay used by `diybot say`.
//!
//! This layer presents state; [`crate::core`] owns it.

pub mod chat_loop;
pub mod markdown;
pub mod renderer;
pub mod theme;
pub mod typewriter;
