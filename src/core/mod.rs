pub mod app;
pub mod channel;
pub mod config;
pub mod history;
pub mod message;
pub mod reducer;
pub mod session;
