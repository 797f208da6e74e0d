use std::collections::HashMap;

use tokio::sync::RwLock;

use pdsdesk_core::domain::operator::OperatorId;
use pdsdesk_core::domain::operator_group::{OperatorGroup, OperatorGroupId};
use pdsdesk_core::domain::routing_rule::{RoutingRule, RoutingRuleId};
use pdsdesk_core::preferences::UserPreferences;
use pdsdesk_core::rules::store::{RoutingRuleStore, StoreError};

use super::{OperatorGroupRepository, RepositoryError, UserPreferencesRepository};

/// Rule store for tests and demos. Enforces unique `rule_key` like the SQL
/// store; assignment groups are not checked.
#[derive(Default)]
pub struct InMemoryRoutingRuleStore {
    rules: RwLock<HashMap<RoutingRuleId, RoutingRule>>,
}

impl InMemoryRoutingRuleStore {
    pub fn with_rules(rules: impl IntoIterator<Item = RoutingRule>) -> Self {
        Self { rules: RwLock::new(rules.into_iter().map(|rule| (rule.id, rule)).collect()) }
    }
}

#[async_trait::async_trait]
impl RoutingRuleStore for InMemoryRoutingRuleStore {
    async fn list(&self) -> Result<Vec<RoutingRule>, StoreError> {
        let rules = self.rules.read().await;
        let mut listed: Vec<RoutingRule> = rules.values().cloned().collect();
        listed.sort_by(|left, right| {
            left.priority.cmp(&right.priority).then_with(|| left.rule_key.cmp(&right.rule_key))
        });
        Ok(listed)
    }

    async fn find(&self, id: &RoutingRuleId) -> Result<Option<RoutingRule>, StoreError> {
        let rules = self.rules.read().await;
        Ok(rules.get(id).cloned())
    }

    async fn insert(&self, rule: &RoutingRule) -> Result<(), StoreError> {
        let mut rules = self.rules.write().await;
        if rules.values().any(|existing| existing.rule_key == rule.rule_key) {
            return Err(StoreError::DuplicateRuleKey(rule.rule_key.clone()));
        }
        rules.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn update(&self, rule: &RoutingRule) -> Result<bool, StoreError> {
        let mut rules = self.rules.write().await;
        if !rules.contains_key(&rule.id) {
            return Ok(false);
        }
        if rules.values().any(|existing| existing.id != rule.id && existing.rule_key == rule.rule_key)
        {
            return Err(StoreError::DuplicateRuleKey(rule.rule_key.clone()));
        }
        rules.insert(rule.id, rule.clone());
        Ok(true)
    }

    async fn delete(&self, id: &RoutingRuleId) -> Result<bool, StoreError> {
        let mut rules = self.rules.write().await;
        Ok(rules.remove(id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryOperatorGroupRepository {
    groups: RwLock<HashMap<OperatorGroupId, OperatorGroup>>,
}

#[async_trait::async_trait]
impl OperatorGroupRepository for InMemoryOperatorGroupRepository {
    async fn list(&self) -> Result<Vec<OperatorGroup>, RepositoryError> {
        let groups = self.groups.read().await;
        let mut listed: Vec<OperatorGroup> = groups.values().cloned().collect();
        listed.sort_by(|left, right| {
            left.name.cmp(&right.name).then_with(|| left.group_key.cmp(&right.group_key))
        });
        Ok(listed)
    }

    async fn find_by_id(
        &self,
        id: &OperatorGroupId,
    ) -> Result<Option<OperatorGroup>, RepositoryError> {
        let groups = self.groups.read().await;
        Ok(groups.get(id).cloned())
    }

    async fn find_by_key(&self, group_key: &str) -> Result<Option<OperatorGroup>, RepositoryError> {
        let groups = self.groups.read().await;
        Ok(groups.values().find(|group| group.group_key == group_key).cloned())
    }

    async fn save(&self, group: OperatorGroup) -> Result<(), RepositoryError> {
        let mut groups = self.groups.write().await;
        groups.insert(group.id, group);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUserPreferencesRepository {
    preferences: RwLock<HashMap<OperatorId, UserPreferences>>,
}

#[async_trait::async_trait]
impl UserPreferencesRepository for InMemoryUserPreferencesRepository {
    async fn find(&self, user_id: &OperatorId) -> Result<Option<UserPreferences>, RepositoryError> {
        let preferences = self.preferences.read().await;
        Ok(preferences.get(user_id).cloned().map(|mut found| {
            found.normalize();
            found
        }))
    }

    async fn save(&self, preferences: UserPreferences) -> Result<(), RepositoryError> {
        let mut stored = self.preferences.write().await;
        stored.insert(preferences.user_id.clone(), preferences);
        Ok(())
    }
}
