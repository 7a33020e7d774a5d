//! Activity log entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{ActivityAction, ActivityLog};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Database row mapping for the activity_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct ActivityLogEntity {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub model_type: String,
    pub model_id: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ActivityLogEntity {
    /// Rows with an action this build does not know are skipped by callers.
    pub fn into_domain(self) -> Option<ActivityLog> {
        let action = ActivityAction::from_str(&self.action).ok()?;
        Some(ActivityLog {
            id: self.id,
            user_id: self.user_id,
            action,
            model_type: self.model_type,
            model_id: self.model_id,
            old_values: self.old_values,
            new_values: self.new_values,
            description: self.description,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}
