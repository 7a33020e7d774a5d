//! File attachments on tickets and ticket messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored file metadata. Rows with `message_id = None` belong to the ticket itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub ticket_id: i64,
    pub message_id: Option<i64>,
    pub original_name: String,
    /// Storage key relative to the upload root. Never exposed.
    #[serde(skip_serializing)]
    pub stored_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    pub fn scope(&self) -> AttachmentScope {
        match self.message_id {
            Some(message_id) => AttachmentScope::Message {
                ticket_id: self.ticket_id,
                message_id,
            },
            None => AttachmentScope::Ticket {
                ticket_id: self.ticket_id,
            },
        }
    }
}

/// Parent an attachment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentScope {
    Ticket { ticket_id: i64 },
    Message { ticket_id: i64, message_id: i64 },
}

impl AttachmentScope {
    pub fn ticket_id(&self) -> i64 {
        match self {
            AttachmentScope::Ticket { ticket_id } => *ticket_id,
            AttachmentScope::Message { ticket_id, .. } => *ticket_id,
        }
    }

    pub fn message_id(&self) -> Option<i64> {
        match self {
            AttachmentScope::Ticket { .. } => None,
            AttachmentScope::Message { message_id, .. } => Some(*message_id),
        }
    }
}

/// Metadata for an attachment row about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub scope: AttachmentScope,
    pub original_name: String,
    pub stored_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_message_id() {
        let mut attachment = Attachment {
            id: 7,
            ticket_id: 3,
            message_id: None,
            original_name: "print.png".into(),
            stored_path: "tickets/3/abc.png".into(),
            mime_type: "image/png".into(),
            size_bytes: 1024,
            created_at: Utc::now(),
        };
        assert_eq!(attachment.scope(), AttachmentScope::Ticket { ticket_id: 3 });

        attachment.message_id = Some(9);
        let scope = attachment.scope();
        assert_eq!(scope.ticket_id(), 3);
        assert_eq!(scope.message_id(), Some(9));
    }

    #[test]
    fn test_stored_path_is_not_serialized() {
        let attachment = Attachment {
            id: 1,
            ticket_id: 1,
            message_id: None,
            original_name: "a.pdf".into(),
            stored_path: "tickets/1/secret.pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: 10,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&attachment).unwrap();
        assert!(json.get("stored_path").is_none());
        assert_eq!(json["original_name"], "a.pdf");
    }
}
