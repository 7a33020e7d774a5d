//! Activity log repository for database operations.

use domain::models::{ActivityLogFilter, NewActivityLog};
use shared::pagination::Page;
use sqlx::PgPool;

use crate::entities::ActivityLogEntity;
use crate::metrics::QueryTimer;

const ACTIVITY_COLUMNS: &str = "id, user_id, action, model_type, model_id, old_values, \
     new_values, description, ip_address, user_agent, metadata, created_at";

/// Builds dynamic WHERE clauses from activity log filters.
struct ActivityLogFilterBuilder {
    conditions: Vec<String>,
    param_count: i32,
}

impl ActivityLogFilterBuilder {
    fn build(filter: &ActivityLogFilter) -> Self {
        let mut conditions = vec!["TRUE".to_string()];
        let mut param_count = 0;

        if filter.user_id.is_some() {
            param_count += 1;
            conditions.push(format!("user_id = ${}", param_count));
        }
        if filter.action.is_some() {
            param_count += 1;
            conditions.push(format!("action = ${}", param_count));
        }
        if filter.model_type.is_some() {
            param_count += 1;
            conditions.push(format!("model_type = ${}", param_count));
        }
        if filter.model_id.is_some() {
            param_count += 1;
            conditions.push(format!("model_id = ${}", param_count));
        }
        if filter.from.is_some() {
            param_count += 1;
            conditions.push(format!("created_at >= ${}", param_count));
        }
        if filter.to.is_some() {
            param_count += 1;
            conditions.push(format!("created_at <= ${}", param_count));
        }

        Self {
            conditions,
            param_count,
        }
    }

    fn where_clause(&self) -> String {
        self.conditions.join(" AND ")
    }

    fn param_count(&self) -> i32 {
        self.param_count
    }
}

/// Binds filter parameters in builder order.
macro_rules! bind_activity_filters {
    ($builder:expr, $filter:expr) => {{
        let mut b = $builder;
        if let Some(user_id) = $filter.user_id {
            b = b.bind(user_id);
        }
        if let Some(action) = $filter.action {
            b = b.bind(action.as_str());
        }
        if let Some(ref model_type) = $filter.model_type {
            b = b.bind(model_type.clone());
        }
        if let Some(ref model_id) = $filter.model_id {
            b = b.bind(model_id.clone());
        }
        if let Some(from) = $filter.from {
            b = b.bind(from);
        }
        if let Some(to) = $filter.to {
            b = b.bind(to);
        }
        b
    }};
}

#[derive(Clone)]
pub struct ActivityLogRepository {
    pool: PgPool,
}

impl ActivityLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: NewActivityLog) -> Result<ActivityLogEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_activity_log");
        let result = sqlx::query_as::<_, ActivityLogEntity>(&format!(
            r#"
            INSERT INTO activity_logs (
                user_id, action, model_type, model_id, old_values, new_values,
                description, ip_address, user_agent, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(&entry.model_type)
        .bind(&entry.model_id)
        .bind(&entry.old_values)
        .bind(&entry.new_values)
        .bind(&entry.description)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(&entry.metadata)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert without waiting (fire and forget). Failures are only logged.
    pub fn insert_async(&self, entry: NewActivityLog) {
        let repo = self.clone();
        tokio::spawn(async move {
            let action = entry.action;
            if let Err(e) = repo.insert(entry).await {
                tracing::error!(action = %action, error = %e, "Failed to insert activity log");
            }
        });
    }

    /// List entries, newest first.
    pub async fn list(
        &self,
        filter: &ActivityLogFilter,
        page: Page,
    ) -> Result<(Vec<ActivityLogEntity>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_activity_logs");
        let builder = ActivityLogFilterBuilder::build(filter);
        let where_clause = builder.where_clause();
        let param_count = builder.param_count();

        let count_query = format!("SELECT COUNT(*) FROM activity_logs WHERE {}", where_clause);
        let count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        let count_builder = bind_activity_filters!(count_builder, filter);
        let total = count_builder.fetch_one(&self.pool).await?;

        let list_query = format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM activity_logs
            WHERE {}
            ORDER BY created_at DESC, id DESC
            LIMIT ${} OFFSET ${}
            "#,
            where_clause,
            param_count + 1,
            param_count + 2
        );
        let list_builder = sqlx::query_as::<_, ActivityLogEntity>(&list_query);
        let list_builder = bind_activity_filters!(list_builder, filter);
        let rows = list_builder
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        timer.record();

        Ok((rows, total))
    }
}
