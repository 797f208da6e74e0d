use sqlx::Row;
use uuid::Uuid;

use pdsdesk_core::domain::operator_group::{OperatorGroup, OperatorGroupId};

use super::{OperatorGroupRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOperatorGroupRepository {
    pool: DbPool,
}

impl SqlOperatorGroupRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_group(row: &sqlx::sqlite::SqliteRow) -> Result<OperatorGroup, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let group_key: String =
        row.try_get("group_key").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: bool =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let id = Uuid::parse_str(&id).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    Ok(OperatorGroup { id: OperatorGroupId(id), group_key, name, is_active })
}

#[async_trait::async_trait]
impl OperatorGroupRepository for SqlOperatorGroupRepository {
    async fn list(&self) -> Result<Vec<OperatorGroup>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, group_key, name, is_active FROM operator_group ORDER BY name ASC, group_key ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_group).collect()
    }

    async fn find_by_id(
        &self,
        id: &OperatorGroupId,
    ) -> Result<Option<OperatorGroup>, RepositoryError> {
        let row = sqlx::query("SELECT id, group_key, name, is_active FROM operator_group WHERE id = ?")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_group(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_key(&self, group_key: &str) -> Result<Option<OperatorGroup>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, group_key, name, is_active FROM operator_group WHERE group_key = ?",
        )
        .bind(group_key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_group(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, group: OperatorGroup) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO operator_group (id, group_key, name, is_active)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 group_key = excluded.group_key,
                 name = excluded.name,
                 is_active = excluded.is_active",
        )
        .bind(group.id.0.to_string())
        .bind(&group.group_key)
        .bind(&group.name)
        .bind(group.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// What the configured default queue key resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DefaultQueue {
    Unset,
    Active(OperatorGroup),
    Inactive(OperatorGroup),
    Missing(String),
}

impl DefaultQueue {
    /// Only an active group can receive unmatched tickets.
    pub fn active_id(&self) -> Option<OperatorGroupId> {
        match self {
            Self::Active(group) => Some(group.id),
            _ => None,
        }
    }
}

/// Shared by server startup, `pdsdesk route` and `pdsdesk doctor` so all three
/// agree on when the default queue applies.
pub async fn lookup_default_queue(
    groups: &dyn OperatorGroupRepository,
    group_key: Option<&str>,
) -> Result<DefaultQueue, RepositoryError> {
    let Some(group_key) = group_key else {
        return Ok(DefaultQueue::Unset);
    };

    Ok(match groups.find_by_key(group_key).await? {
        Some(group) if group.is_active => DefaultQueue::Active(group),
        Some(group) => DefaultQueue::Inactive(group),
        None => DefaultQueue::Missing(group_key.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use pdsdesk_core::domain::operator_group::{OperatorGroup, OperatorGroupId};

    use super::{lookup_default_queue, DefaultQueue, SqlOperatorGroupRepository};
    use crate::repositories::{OperatorGroupRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlOperatorGroupRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlOperatorGroupRepository::new(pool)
    }

    fn group(group_key: &str, name: &str) -> OperatorGroup {
        OperatorGroup {
            id: OperatorGroupId::new(),
            group_key: group_key.to_string(),
            name: name.to_string(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn save_and_lookup_by_id_and_key() {
        let repo = setup().await;
        let facilities = group("facilities", "Facilities");

        repo.save(facilities.clone()).await.expect("save");

        assert_eq!(repo.find_by_id(&facilities.id).await.expect("by id"), Some(facilities.clone()));
        assert_eq!(repo.find_by_key("facilities").await.expect("by key"), Some(facilities));
        assert_eq!(repo.find_by_key("unknown").await.expect("by key"), None);
    }

    #[tokio::test]
    async fn save_upserts_and_list_is_sorted_by_name() {
        let repo = setup().await;
        let mut security = group("security-ops", "Security Operations");
        repo.save(security.clone()).await.expect("save security");
        repo.save(group("facilities", "Facilities")).await.expect("save facilities");

        security.is_active = false;
        repo.save(security.clone()).await.expect("update security");

        let groups = repo.list().await.expect("list");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group_key, "facilities");
        assert!(!groups[1].is_active);
    }

    #[tokio::test]
    async fn group_keys_are_unique() {
        let repo = setup().await;
        repo.save(group("facilities", "Facilities")).await.expect("save");

        let outcome = repo.save(group("facilities", "Facilities Again")).await;
        assert!(matches!(outcome, Err(RepositoryError::Database(_))));
    }

    #[tokio::test]
    async fn default_queue_applies_only_to_active_groups() {
        let repo = setup().await;
        let service_desk = group("service-desk", "Service Desk");
        let mut night_shift = group("night-shift", "Night Shift");
        night_shift.is_active = false;
        repo.save(service_desk.clone()).await.expect("save");
        repo.save(night_shift.clone()).await.expect("save");

        let active = lookup_default_queue(&repo, Some("service-desk")).await.expect("lookup");
        assert_eq!(active.active_id(), Some(service_desk.id));

        let inactive = lookup_default_queue(&repo, Some("night-shift")).await.expect("lookup");
        assert_eq!(inactive, DefaultQueue::Inactive(night_shift));
        assert_eq!(inactive.active_id(), None);

        let missing = lookup_default_queue(&repo, Some("weekend")).await.expect("lookup");
        assert_eq!(missing, DefaultQueue::Missing("weekend".to_string()));
        assert_eq!(lookup_default_queue(&repo, None).await.expect("lookup"), DefaultQueue::Unset);
    }
}
