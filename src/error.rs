use thiserror::Error;

#[derive(Debug, Error)]
pub enum GymJournalError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub use crate::Result;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_category() {
        let err = GymJournalError::Config("x".to_string());
        assert!(format!("{err}").contains("configuration error"));

        let err = GymJournalError::Storage("no such table: users".to_string());
        assert_eq!(format!("{err}"), "storage error: no such table: users");
    }
}
