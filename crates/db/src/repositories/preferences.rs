use chrono::{DateTime, Utc};
use sqlx::Row;

use pdsdesk_core::domain::operator::OperatorId;
use pdsdesk_core::preferences::{UserPreferences, WidgetPreference};

use super::{RepositoryError, UserPreferencesRepository};
use crate::DbPool;

pub struct SqlUserPreferencesRepository {
    pool: DbPool,
}

impl SqlUserPreferencesRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_preferences(row: &sqlx::sqlite::SqliteRow) -> Result<UserPreferences, RepositoryError> {
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let sidebar_order_json: String =
        row.try_get("sidebar_order_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let widgets_json: String =
        row.try_get("widgets_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let sidebar_order: Vec<String> = serde_json::from_str(&sidebar_order_json)
        .map_err(|e| RepositoryError::Decode(format!("sidebar_order_json: {e}")))?;
    let widgets: Vec<WidgetPreference> = serde_json::from_str(&widgets_json)
        .map_err(|e| RepositoryError::Decode(format!("widgets_json: {e}")))?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("updated_at: {e}")))?;

    let mut preferences =
        UserPreferences { user_id: OperatorId(user_id), sidebar_order, widgets, updated_at };
    preferences.normalize();
    Ok(preferences)
}

#[async_trait::async_trait]
impl UserPreferencesRepository for SqlUserPreferencesRepository {
    async fn find(&self, user_id: &OperatorId) -> Result<Option<UserPreferences>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, sidebar_order_json, widgets_json, updated_at
             FROM user_preferences WHERE user_id = ?",
        )
        .bind(&user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_preferences(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, preferences: UserPreferences) -> Result<(), RepositoryError> {
        let sidebar_order_json = serde_json::to_string(&preferences.sidebar_order)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let widgets_json = serde_json::to_string(&preferences.widgets)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO user_preferences (user_id, sidebar_order_json, widgets_json, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 sidebar_order_json = excluded.sidebar_order_json,
                 widgets_json = excluded.widgets_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&preferences.user_id.0)
        .bind(sidebar_order_json)
        .bind(widgets_json)
        .bind(preferences.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
