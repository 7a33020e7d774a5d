//! Activity log domain models.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use shared::pagination::PageRequest;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const DEFAULT_PER_PAGE: u32 = 50;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    Assigned,
    StatusChanged,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Created => "created",
            ActivityAction::Updated => "updated",
            ActivityAction::Deleted => "deleted",
            ActivityAction::Assigned => "assigned",
            ActivityAction::StatusChanged => "status_changed",
        }
    }
}

impl FromStr for ActivityAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(ActivityAction::Created),
            "updated" => Ok(ActivityAction::Updated),
            "deleted" => Ok(ActivityAction::Deleted),
            "assigned" => Ok(ActivityAction::Assigned),
            "status_changed" => Ok(ActivityAction::StatusChanged),
            _ => Err(format!("Unknown activity action: {}", s)),
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model types recorded in the log.
pub mod model_type {
    pub const TICKET: &str = "ticket";
    pub const TICKET_MESSAGE: &str = "ticket_message";
    pub const ATTACHMENT: &str = "attachment";
    pub const USER: &str = "user";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub action: ActivityAction,
    pub model_type: String,
    pub model_id: Option<String>,
    pub old_values: Option<JsonValue>,
    pub new_values: Option<JsonValue>,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting an activity log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivityLog {
    pub user_id: Option<Uuid>,
    pub action: ActivityAction,
    pub model_type: String,
    pub model_id: Option<String>,
    pub old_values: Option<JsonValue>,
    pub new_values: Option<JsonValue>,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<JsonValue>,
}

/// Predefined lookback windows for the log listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
    All,
}

impl Period {
    /// Lower bound of the window, `None` for `All`.
    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::Day => Some(now - Duration::days(1)),
            Period::Week => Some(now - Duration::weeks(1)),
            Period::Month => Some(now - Duration::days(30)),
            Period::Year => Some(now - Duration::days(365)),
            Period::All => None,
        }
    }
}

/// Query parameters for `GET /activity-logs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityLogQuery {
    pub user_id: Option<Uuid>,
    pub action: Option<ActivityAction>,
    pub model_type: Option<String>,
    pub model_id: Option<String>,
    pub period: Option<Period>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Resolved filter handed to the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityLogFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<ActivityAction>,
    pub model_type: Option<String>,
    pub model_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ActivityLogQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            per_page: self.per_page,
        }
    }

    /// Builds the repository filter. An explicit `from`/`to` pair wins over `period`.
    pub fn to_filter(&self, now: DateTime<Utc>) -> ActivityLogFilter {
        let (from, to) = match (self.from, self.to) {
            (Some(from), Some(to)) => (
                from.and_hms_opt(0, 0, 0).map(|d| d.and_utc()),
                to.and_hms_opt(23, 59, 59).map(|d| d.and_utc()),
            ),
            _ => (self.period.and_then(|p| p.start(now)), None),
        };
        ActivityLogFilter {
            user_id: self.user_id,
            action: self.action,
            model_type: self.model_type.clone(),
            model_id: self.model_id.clone(),
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_action_roundtrip() {
        for action in [
            ActivityAction::Created,
            ActivityAction::Updated,
            ActivityAction::Deleted,
            ActivityAction::Assigned,
            ActivityAction::StatusChanged,
        ] {
            assert_eq!(ActivityAction::from_str(action.as_str()).unwrap(), action);
        }
    }

    #[test]
    fn test_period_start() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(
            Period::Week.start(now),
            Some(Utc.with_ymd_and_hms(2024, 6, 8, 12, 0, 0).unwrap())
        );
        assert_eq!(Period::All.start(now), None);
    }

    #[test]
    fn test_filter_explicit_range_wins_over_period() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let query = ActivityLogQuery {
            period: Some(Period::Day),
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            to: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..Default::default()
        };
        let filter = query.to_filter(now);
        assert_eq!(filter.from, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(filter.to, Some(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap()));
    }

    #[test]
    fn test_filter_period_only() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let query = ActivityLogQuery {
            period: Some(Period::Day),
            ..Default::default()
        };
        let filter = query.to_filter(now);
        assert_eq!(filter.from, Some(Utc.with_ymd_and_hms(2024, 6, 14, 12, 0, 0).unwrap()));
        assert_eq!(filter.to, None);
    }
}
