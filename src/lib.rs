pub mod assembler;
pub mod config;
pub mod conversation;
pub mod logging;
pub mod prompts;
pub mod render;
pub mod session;
pub mod storage;
pub mod theme;
pub mod transport;
pub mod types;

#[cfg(feature = "ui")]
pub mod ui;
#[cfg(feature = "ui")]
pub mod views;
