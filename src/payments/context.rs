//! Request-scoped workflow state
//!
//! Built once per inbound request and passed by reference into every
//! workflow call; nothing here outlives the request.

use crate::payments::types::{Notice, NoticeLevel};

#[derive(Debug, Clone, Default)]
pub struct WorkflowContext {
    /// Logged-in customer, `None` for guests
    pub current_user: Option<String>,
    notices: Vec<Notice>,
}

impl WorkflowContext {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            current_user: Some(user_id.into()),
            notices: Vec::new(),
        }
    }

    pub fn add_notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.add_notice(NoticeLevel::Success, message);
    }

    pub fn notice(&mut self, message: impl Into<String>) {
        self.add_notice(NoticeLevel::Notice, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.add_notice(NoticeLevel::Error, message);
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
