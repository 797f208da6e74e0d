use async_trait::async_trait;
use thiserror::Error;

use pdsdesk_core::domain::operator::OperatorId;
use pdsdesk_core::domain::operator_group::{OperatorGroup, OperatorGroupId};
use pdsdesk_core::preferences::UserPreferences;

pub mod memory;
pub mod operator_group;
pub mod preferences;
pub mod routing_rule;

pub use memory::{
    InMemoryOperatorGroupRepository, InMemoryRoutingRuleStore, InMemoryUserPreferencesRepository,
};
pub use operator_group::{lookup_default_queue, DefaultQueue, SqlOperatorGroupRepository};
pub use preferences::SqlUserPreferencesRepository;
pub use routing_rule::SqlRoutingRuleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait OperatorGroupRepository: Send + Sync {
    /// Groups ordered by name.
    async fn list(&self) -> Result<Vec<OperatorGroup>, RepositoryError>;
    async fn find_by_id(&self, id: &OperatorGroupId)
        -> Result<Option<OperatorGroup>, RepositoryError>;
    async fn find_by_key(&self, group_key: &str) -> Result<Option<OperatorGroup>, RepositoryError>;
    async fn save(&self, group: OperatorGroup) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait UserPreferencesRepository: Send + Sync {
    /// Stored record for `user_id`, normalized against the known sidebar
    /// items and widgets.
    async fn find(&self, user_id: &OperatorId) -> Result<Option<UserPreferences>, RepositoryError>;
    async fn save(&self, preferences: UserPreferences) -> Result<(), RepositoryError>;
}

pub(crate) fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
