pub mod app;
pub mod attachments;
pub mod broker;
pub mod channel;
pub mod clipboard;
pub mod config;
pub mod editor;
pub mod launcher;
pub mod logging;
pub mod message;
pub mod terminal;
pub mod tool;
pub mod ui;

#[cfg(test)]
pub mod test_support;
