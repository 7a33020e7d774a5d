//! Ticket repository for database operations.
//!
//! Updates write the whole row: concurrent edits of the same ticket resolve
//! as last-write-wins.

use chrono::NaiveDate;
use domain::models::ticket::NewTicket;
use domain::models::{Ticket, TicketPriority, TicketQuery, TicketStatus};
use shared::pagination::Page;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{TicketEntity, TicketOriginDb, TicketPriorityDb, TicketStatusDb};
use crate::metrics::QueryTimer;

const TICKET_COLUMNS: &str = "id, title, client_name, description, whatsapp_number, status, \
     priority, origin, user_id, cliente_id, resolution_time_minutes, created_at, updated_at";

/// Which tickets the caller may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketVisibility {
    All,
    AssignedTo(Uuid),
    OwnedBy(Uuid),
}

/// Resolved list filter.
#[derive(Debug, Clone, Default)]
pub struct TicketListFilter {
    pub search: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub user_id: Option<Uuid>,
    pub cliente_id: Option<Uuid>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub visible_user_id: Option<Uuid>,
    pub visible_cliente_id: Option<Uuid>,
}

impl TicketListFilter {
    pub fn new(query: &TicketQuery, visibility: TicketVisibility) -> Self {
        let (visible_user_id, visible_cliente_id) = match visibility {
            TicketVisibility::All => (None, None),
            TicketVisibility::AssignedTo(id) => (Some(id), None),
            TicketVisibility::OwnedBy(id) => (None, Some(id)),
        };
        Self {
            search: query
                .q
                .as_ref()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            status: query.status,
            priority: query.priority,
            user_id: query.user_id,
            cliente_id: query.cliente_id,
            date_range: query.date_range(),
            visible_user_id,
            visible_cliente_id,
        }
    }
}

/// Builds the WHERE clause for ticket listings, tracking parameter positions.
struct TicketFilterBuilder {
    conditions: Vec<String>,
    param_count: i32,
}

impl TicketFilterBuilder {
    fn build(filter: &TicketListFilter) -> Self {
        let mut conditions = vec!["TRUE".to_string()];
        let mut param_count = 0;

        if filter.search.is_some() {
            param_count += 2;
            conditions.push(format!(
                "(CAST(id AS TEXT) = ${} OR client_name ILIKE ${p} ESCAPE '\\' \
                 OR title ILIKE ${p} ESCAPE '\\' OR description ILIKE ${p} ESCAPE '\\')",
                param_count - 1,
                p = param_count
            ));
        }
        if filter.status.is_some() {
            param_count += 1;
            conditions.push(format!("status = ${}", param_count));
        }
        if filter.priority.is_some() {
            param_count += 1;
            conditions.push(format!("priority = ${}", param_count));
        }
        if filter.user_id.is_some() {
            param_count += 1;
            conditions.push(format!("user_id = ${}", param_count));
        }
        if filter.cliente_id.is_some() {
            param_count += 1;
            conditions.push(format!("cliente_id = ${}", param_count));
        }
        if filter.date_range.is_some() {
            param_count += 2;
            conditions.push(format!(
                "created_at::date BETWEEN ${} AND ${}",
                param_count - 1,
                param_count
            ));
        }
        if filter.visible_user_id.is_some() {
            param_count += 1;
            conditions.push(format!("user_id = ${}", param_count));
        }
        if filter.visible_cliente_id.is_some() {
            param_count += 1;
            conditions.push(format!("cliente_id = ${}", param_count));
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

/// Escapes LIKE wildcards so the term matches literally (`ESCAPE '\'`).
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Binds ticket filter parameters in the same order the builder numbered them.
macro_rules! bind_ticket_filters {
    ($builder:expr, $filter:expr) => {{
        let mut b = $builder;
        if let Some(ref search) = $filter.search {
            b = b.bind(search.clone());
            b = b.bind(format!("%{}%", escape_like(search)));
        }
        if let Some(status) = $filter.status {
            b = b.bind(TicketStatusDb::from(status));
        }
        if let Some(priority) = $filter.priority {
            b = b.bind(TicketPriorityDb::from(priority));
        }
        if let Some(user_id) = $filter.user_id {
            b = b.bind(user_id);
        }
        if let Some(cliente_id) = $filter.cliente_id {
            b = b.bind(cliente_id);
        }
        if let Some((from, to)) = $filter.date_range {
            b = b.bind(from);
            b = b.bind(to);
        }
        if let Some(id) = $filter.visible_user_id {
            b = b.bind(id);
        }
        if let Some(id) = $filter.visible_cliente_id {
            b = b.bind(id);
        }
        b
    }};
}

#[derive(Clone)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: &NewTicket) -> Result<TicketEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_ticket");
        let result = sqlx::query_as::<_, TicketEntity>(&format!(
            r#"
            INSERT INTO tickets (
                title, client_name, description, whatsapp_number, status, priority,
                origin, user_id, cliente_id, resolution_time_minutes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(&new.title)
        .bind(&new.client_name)
        .bind(&new.description)
        .bind(&new.whatsapp_number)
        .bind(TicketStatusDb::from(new.status))
        .bind(TicketPriorityDb::from(new.priority))
        .bind(new.origin.map(TicketOriginDb::from))
        .bind(new.user_id)
        .bind(new.cliente_id)
        .bind(new.resolution_time_minutes)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<TicketEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_ticket_by_id");
        let result = sqlx::query_as::<_, TicketEntity>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Write every mutable column of the ticket. Returns `None` if it vanished.
    pub async fn update(&self, ticket: &Ticket) -> Result<Option<TicketEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_ticket");
        let result = sqlx::query_as::<_, TicketEntity>(&format!(
            r#"
            UPDATE tickets
            SET title = $2, client_name = $3, description = $4, whatsapp_number = $5,
                status = $6, priority = $7, origin = $8, user_id = $9, cliente_id = $10,
                resolution_time_minutes = $11, updated_at = $12
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(ticket.id)
        .bind(&ticket.title)
        .bind(&ticket.client_name)
        .bind(&ticket.description)
        .bind(&ticket.whatsapp_number)
        .bind(TicketStatusDb::from(ticket.status))
        .bind(TicketPriorityDb::from(ticket.priority))
        .bind(ticket.origin.map(TicketOriginDb::from))
        .bind(ticket.user_id)
        .bind(ticket.cliente_id)
        .bind(ticket.resolution_time_minutes)
        .bind(ticket.updated_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Delete a ticket. Messages and attachment rows go with it (FK cascade).
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_ticket");
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// List tickets, newest first.
    pub async fn list(
        &self,
        filter: &TicketListFilter,
        page: Page,
    ) -> Result<(Vec<TicketEntity>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_tickets");
        let builder = TicketFilterBuilder::build(filter);
        let where_clause = builder.where_clause();
        let param_count = builder.param_count();

        let count_query = format!("SELECT COUNT(*) FROM tickets WHERE {}", where_clause);
        let count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        let count_builder = bind_ticket_filters!(count_builder, filter);
        let total = count_builder.fetch_one(&self.pool).await?;

        let list_query = format!(
            r#"
            SELECT {TICKET_COLUMNS}
            FROM tickets
            WHERE {}
            ORDER BY created_at DESC, id DESC
            LIMIT ${} OFFSET ${}
            "#,
            where_clause,
            param_count + 1,
            param_count + 2
        );
        let list_builder = sqlx::query_as::<_, TicketEntity>(&list_query);
        let list_builder = bind_ticket_filters!(list_builder, filter);
        let tickets = list_builder
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        timer.record();

        Ok((tickets, total))
    }

    /// Oldest aberto/pendente ticket opened from the given WhatsApp number.
    pub async fn find_open_by_whatsapp(
        &self,
        number: &str,
    ) -> Result<Option<TicketEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_open_ticket_by_whatsapp");
        let result = sqlx::query_as::<_, TicketEntity>(&format!(
            r#"
            SELECT {TICKET_COLUMNS}
            FROM tickets
            WHERE whatsapp_number = $1 AND status IN ('aberto', 'pendente')
            ORDER BY created_at ASC
            LIMIT 1
            "#
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}
