use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::operator_group::OperatorGroupId;
use crate::domain::routing_rule::{RoutingRule, RoutingRuleId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("rule_key `{0}` already exists")]
    DuplicateRuleKey(String),
    #[error("assignment group `{0}` does not exist")]
    UnknownAssignmentGroup(OperatorGroupId),
    #[error("rule store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence boundary for routing rules.
///
/// Implementations enforce `rule_key` uniqueness; `update` and `delete`
/// report whether a row with the given id existed.
#[async_trait]
pub trait RoutingRuleStore: Send + Sync {
    async fn list(&self) -> Result<Vec<RoutingRule>, StoreError>;
    async fn find(&self, id: &RoutingRuleId) -> Result<Option<RoutingRule>, StoreError>;
    async fn insert(&self, rule: &RoutingRule) -> Result<(), StoreError>;
    async fn update(&self, rule: &RoutingRule) -> Result<bool, StoreError>;
    async fn delete(&self, id: &RoutingRuleId) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S> RoutingRuleStore for Arc<S>
where
    S: RoutingRuleStore + ?Sized,
{
    async fn list(&self) -> Result<Vec<RoutingRule>, StoreError> {
        (**self).list().await
    }

    async fn find(&self, id: &RoutingRuleId) -> Result<Option<RoutingRule>, StoreError> {
        (**self).find(id).await
    }

    async fn insert(&self, rule: &RoutingRule) -> Result<(), StoreError> {
        (**self).insert(rule).await
    }

    async fn update(&self, rule: &RoutingRule) -> Result<bool, StoreError> {
        (**self).update(rule).await
    }

    async fn delete(&self, id: &RoutingRuleId) -> Result<bool, StoreError> {
        (**self).delete(id).await
    }
}
