use pdsdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use pdsdesk_core::domain::operator_group::OperatorGroupId;
use pdsdesk_db::repositories::{
    lookup_default_queue, DefaultQueue, OperatorGroupRepository, RepositoryError,
    SqlOperatorGroupRepository,
};
use pdsdesk_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    /// Queue for tickets no rule matched, resolved once at startup.
    pub default_group: Option<OperatorGroupId>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("default queue lookup failed: {0}")]
    DefaultQueueLookup(#[source] RepositoryError),
}

#[allow(dead_code)]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let groups = SqlOperatorGroupRepository::new(db_pool.clone());
    let default_group =
        resolve_default_group(config.routing.default_group_key.as_deref(), &groups).await?;

    Ok(Application { config, db_pool, default_group })
}

/// An unknown or inactive default queue is not fatal: unmatched tickets stay
/// unassigned until the configuration is fixed.
pub(crate) async fn resolve_default_group(
    group_key: Option<&str>,
    groups: &dyn OperatorGroupRepository,
) -> Result<Option<OperatorGroupId>, BootstrapError> {
    let queue =
        lookup_default_queue(groups, group_key).await.map_err(BootstrapError::DefaultQueueLookup)?;

    match &queue {
        DefaultQueue::Unset => {}
        DefaultQueue::Active(group) => info!(
            event_name = "system.bootstrap.default_queue_resolved",
            correlation_id = "bootstrap",
            group_key = %group.group_key,
            group_id = %group.id,
            "default queue resolved"
        ),
        DefaultQueue::Inactive(group) => warn!(
            event_name = "system.bootstrap.default_queue_inactive",
            correlation_id = "bootstrap",
            group_key = %group.group_key,
            "default queue is inactive; unmatched tickets stay unassigned"
        ),
        DefaultQueue::Missing(group_key) => warn!(
            event_name = "system.bootstrap.default_queue_missing",
            correlation_id = "bootstrap",
            group_key = %group_key,
            "default queue does not exist; unmatched tickets stay unassigned"
        ),
    }
    Ok(queue.active_id())
}
