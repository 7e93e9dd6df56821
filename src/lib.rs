pub mod bot;
pub mod config;
pub mod conversation;
pub mod daemon;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod presentation;
pub mod runtime_paths;
pub mod store;
pub mod wizard_fsm;

pub type Result<T> = std::result::Result<T, error::GymJournalError>;
