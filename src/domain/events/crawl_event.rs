// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// 领域事件
///
/// 构建后不可变，携带创建时间和不透明的事件标识。
#[derive(Debug, Clone, Serialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: EventPayload,
}

/// 事件内容
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    IssueStarted {
        issue_id: String,
    },
    IssueCompleted {
        issue_id: String,
        success: bool,
        attachments_downloaded: u32,
        document_generated: bool,
    },
    IssueFailed {
        issue_id: String,
        reason: String,
    },
    AttachmentStarted {
        issue_id: String,
        filename: String,
    },
    AttachmentCompleted {
        issue_id: String,
        filename: String,
        bytes: u64,
    },
    DocumentStarted {
        issue_id: String,
    },
    DocumentCompleted {
        issue_id: String,
        bytes: u64,
    },
    SessionStarted {
        session_id: String,
        total: u32,
    },
    SessionCompleted {
        session_id: String,
        total: u32,
        successful: u32,
        #[serde(with = "duration_secs")]
        duration: Duration,
    },
}

/// 事件类型，用于按类型订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    IssueStarted,
    IssueCompleted,
    IssueFailed,
    AttachmentStarted,
    AttachmentCompleted,
    DocumentStarted,
    DocumentCompleted,
    SessionStarted,
    SessionCompleted,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::IssueStarted,
        EventKind::IssueCompleted,
        EventKind::IssueFailed,
        EventKind::AttachmentStarted,
        EventKind::AttachmentCompleted,
        EventKind::DocumentStarted,
        EventKind::DocumentCompleted,
        EventKind::SessionStarted,
        EventKind::SessionCompleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::IssueStarted => "IssueStarted",
            EventKind::IssueCompleted => "IssueCompleted",
            EventKind::IssueFailed => "IssueFailed",
            EventKind::AttachmentStarted => "AttachmentStarted",
            EventKind::AttachmentCompleted => "AttachmentCompleted",
            EventKind::DocumentStarted => "DocumentStarted",
            EventKind::DocumentCompleted => "DocumentCompleted",
            EventKind::SessionStarted => "SessionStarted",
            EventKind::SessionCompleted => "SessionCompleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DomainEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn issue_started(issue_id: impl Into<String>) -> Self {
        Self::new(EventPayload::IssueStarted {
            issue_id: issue_id.into(),
        })
    }

    pub fn issue_completed(
        issue_id: impl Into<String>,
        success: bool,
        attachments_downloaded: u32,
        document_generated: bool,
    ) -> Self {
        Self::new(EventPayload::IssueCompleted {
            issue_id: issue_id.into(),
            success,
            attachments_downloaded,
            document_generated,
        })
    }

    pub fn issue_failed(issue_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(EventPayload::IssueFailed {
            issue_id: issue_id.into(),
            reason: reason.into(),
        })
    }

    pub fn attachment_started(issue_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::new(EventPayload::AttachmentStarted {
            issue_id: issue_id.into(),
            filename: filename.into(),
        })
    }

    pub fn attachment_completed(
        issue_id: impl Into<String>,
        filename: impl Into<String>,
        bytes: u64,
    ) -> Self {
        Self::new(EventPayload::AttachmentCompleted {
            issue_id: issue_id.into(),
            filename: filename.into(),
            bytes,
        })
    }

    pub fn document_started(issue_id: impl Into<String>) -> Self {
        Self::new(EventPayload::DocumentStarted {
            issue_id: issue_id.into(),
        })
    }

    pub fn document_completed(issue_id: impl Into<String>, bytes: u64) -> Self {
        Self::new(EventPayload::DocumentCompleted {
            issue_id: issue_id.into(),
            bytes,
        })
    }

    pub fn session_started(session_id: impl Into<String>, total: u32) -> Self {
        Self::new(EventPayload::SessionStarted {
            session_id: session_id.into(),
            total,
        })
    }

    pub fn session_completed(
        session_id: impl Into<String>,
        total: u32,
        successful: u32,
        duration: Duration,
    ) -> Self {
        Self::new(EventPayload::SessionCompleted {
            session_id: session_id.into(),
            total,
            successful,
            duration,
        })
    }

    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::IssueStarted { .. } => EventKind::IssueStarted,
            EventPayload::IssueCompleted { .. } => EventKind::IssueCompleted,
            EventPayload::IssueFailed { .. } => EventKind::IssueFailed,
            EventPayload::AttachmentStarted { .. } => EventKind::AttachmentStarted,
            EventPayload::AttachmentCompleted { .. } => EventKind::AttachmentCompleted,
            EventPayload::DocumentStarted { .. } => EventKind::DocumentStarted,
            EventPayload::DocumentCompleted { .. } => EventKind::DocumentCompleted,
            EventPayload::SessionStarted { .. } => EventKind::SessionStarted,
            EventPayload::SessionCompleted { .. } => EventKind::SessionCompleted,
        }
    }

    /// 与 Issue 相关的事件返回 Issue 编号
    pub fn issue_id(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::IssueStarted { issue_id }
            | EventPayload::IssueCompleted { issue_id, .. }
            | EventPayload::IssueFailed { issue_id, .. }
            | EventPayload::AttachmentStarted { issue_id, .. }
            | EventPayload::AttachmentCompleted { issue_id, .. }
            | EventPayload::DocumentStarted { issue_id }
            | EventPayload::DocumentCompleted { issue_id, .. } => Some(issue_id.as_str()),
            EventPayload::SessionStarted { .. } | EventPayload::SessionCompleted { .. } => None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::SessionStarted { session_id, .. }
            | EventPayload::SessionCompleted { session_id, .. } => Some(session_id.as_str()),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.payload, EventPayload::IssueFailed { .. })
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}
