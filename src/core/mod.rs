pub mod app;
pub mod chat_stream;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod keyring;
pub mod message;
pub mod prompt;
pub mod session;
