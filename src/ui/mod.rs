//! Terminal UI for the chat session

pub mod app;
pub mod commands;
pub mod composer;
pub mod history;
