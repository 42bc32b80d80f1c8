//! diybot is a terminal chat client that streams completions from a chat
//! proxy (or the OpenAI legacy completions API) and renders them as Markdown
//! while they arrive.
//!
//! - [`core`] owns the message store, the completion parser, stream
//!   sessions and cancellation, and the [`core::app::App`] state machine.
//! - [`ui`] renders the transcript and runs the interactive loop.
//! - [`api`] defines the wire payloads.
//! - [`auth`] stores and looks up credentials.
//!
//! The binary routes through [`cli::main`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
