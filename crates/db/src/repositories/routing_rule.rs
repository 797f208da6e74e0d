use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use pdsdesk_core::domain::operator_group::OperatorGroupId;
use pdsdesk_core::domain::routing_rule::{RoutingRule, RoutingRuleId};
use pdsdesk_core::rules::store::{RoutingRuleStore, StoreError};

use super::{decode_err, RepositoryError};
use crate::DbPool;

const RULE_COLUMNS: &str = "id, rule_key, priority, is_active, match_mailbox, match_ticket_type,
                            match_category, assignment_group_id, created_at, updated_at";

pub struct SqlRoutingRuleRepository {
    pool: DbPool,
}

impl SqlRoutingRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> Result<Vec<RoutingRule>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM routing_rule ORDER BY priority ASC, rule_key ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_rule).collect()
    }

    pub async fn find_by_id(&self, id: &RoutingRuleId) -> Result<Option<RoutingRule>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {RULE_COLUMNS} FROM routing_rule WHERE id = ?"))
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_rule).transpose()
    }
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_rule(row: &sqlx::sqlite::SqliteRow) -> Result<RoutingRule, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let rule_key: String = row.try_get("rule_key").map_err(decode_err)?;
    let priority: i64 = row.try_get("priority").map_err(decode_err)?;
    let is_active: bool = row.try_get("is_active").map_err(decode_err)?;
    let match_mailbox: Option<String> = row.try_get("match_mailbox").map_err(decode_err)?;
    let match_ticket_type: Option<String> = row.try_get("match_ticket_type").map_err(decode_err)?;
    let match_category: Option<String> = row.try_get("match_category").map_err(decode_err)?;
    let assignment_group_id: Option<String> =
        row.try_get("assignment_group_id").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_err)?;

    let priority = i32::try_from(priority)
        .map_err(|_| RepositoryError::Decode(format!("priority {priority} is out of range")))?;
    let assignment_group_id = assignment_group_id
        .map(|value| Uuid::parse_str(&value).map(OperatorGroupId))
        .transpose()
        .map_err(decode_err)?;

    Ok(RoutingRule {
        id: RoutingRuleId(Uuid::parse_str(&id).map_err(decode_err)?),
        rule_key,
        priority,
        is_active,
        match_mailbox,
        match_ticket_type,
        match_category,
        assignment_group_id,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

/// Maps constraint violations to their typed store errors; anything else
/// means the store is unavailable.
fn write_error(error: sqlx::Error, rule: &RoutingRule) -> StoreError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            return StoreError::DuplicateRuleKey(rule.rule_key.clone());
        }
        if db_error.is_foreign_key_violation() {
            if let Some(group_id) = rule.assignment_group_id {
                return StoreError::UnknownAssignmentGroup(group_id);
            }
        }
    }
    StoreError::Unavailable(error.to_string())
}

fn unavailable(error: RepositoryError) -> StoreError {
    StoreError::Unavailable(error.to_string())
}

#[async_trait]
impl RoutingRuleStore for SqlRoutingRuleRepository {
    async fn list(&self) -> Result<Vec<RoutingRule>, StoreError> {
        self.list_all().await.map_err(unavailable)
    }

    async fn find(&self, id: &RoutingRuleId) -> Result<Option<RoutingRule>, StoreError> {
        self.find_by_id(id).await.map_err(unavailable)
    }

    async fn insert(&self, rule: &RoutingRule) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO routing_rule (id, rule_key, priority, is_active, match_mailbox,
                                       match_ticket_type, match_category, assignment_group_id,
                                       created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(rule.id.0.to_string())
        .bind(&rule.rule_key)
        .bind(rule.priority)
        .bind(rule.is_active)
        .bind(&rule.match_mailbox)
        .bind(&rule.match_ticket_type)
        .bind(&rule.match_category)
        .bind(rule.assignment_group_id.map(|id| id.0.to_string()))
        .bind(rule.created_at.to_rfc3339())
        .bind(rule.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|error| write_error(error, rule))?;

        Ok(())
    }

    async fn update(&self, rule: &RoutingRule) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE routing_rule SET
                 rule_key = ?,
                 priority = ?,
                 is_active = ?,
                 match_mailbox = ?,
                 match_ticket_type = ?,
                 match_category = ?,
                 assignment_group_id = ?,
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(&rule.rule_key)
        .bind(rule.priority)
        .bind(rule.is_active)
        .bind(&rule.match_mailbox)
        .bind(&rule.match_ticket_type)
        .bind(&rule.match_category)
        .bind(rule.assignment_group_id.map(|id| id.0.to_string()))
        .bind(rule.updated_at.to_rfc3339())
        .bind(rule.id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(|error| write_error(error, rule))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &RoutingRuleId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM routing_rule WHERE id = ?")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|error| StoreError::Unavailable(error.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
