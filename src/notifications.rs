//! User-visible notices.
//!
//! Every validation failure, wallet or gateway error and transaction outcome
//! becomes a `Notice`. The controller keeps the most recent ones for the UI.

use std::collections::VecDeque;

/// Most recent notices kept in the snapshot.
pub const MAX_NOTICES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A notification entry with message and timestamp
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: chrono::Local::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    pub fn time_ago(&self) -> String {
        let now = chrono::Local::now();
        let duration = now.signed_duration_since(self.timestamp);
        if duration.num_seconds() < 60 {
            "just now".to_string()
        } else if duration.num_minutes() < 60 {
            format!("{}m ago", duration.num_minutes())
        } else if duration.num_hours() < 24 {
            format!("{}h ago", duration.num_hours())
        } else {
            self.timestamp.format("%m/%d %H:%M").to_string()
        }
    }
}

/// Append a notice, dropping the oldest beyond `MAX_NOTICES`.
pub fn push_notice(notices: &mut VecDeque<Notice>, notice: Notice) {
    match notice.level {
        NoticeLevel::Error => tracing::error!("{}", notice.message),
        NoticeLevel::Warning => tracing::warn!("{}", notice.message),
        NoticeLevel::Info => tracing::info!("{}", notice.message),
    }
    notices.push_back(notice);
    while notices.len() > MAX_NOTICES {
        notices.pop_front();
    }
}
