use chrono::{DateTime, Utc};
use serde::Serialize;

/// File attached to a proposal. `url` is the blob store's unsigned reference.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: i64,
    pub proposal_id: i64,
    #[serde(skip_serializing)]
    pub url: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Metadata recorded for a freshly uploaded file.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub proposal_id: i64,
    pub url: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: i64,
}
