use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::operator::{Capability, Operator};
use crate::domain::routing_rule::{RoutingRule, RoutingRuleDraft, RoutingRuleId, RoutingRulePatch};
use crate::errors::{ApplicationError, DomainError};
use crate::rules::store::{RoutingRuleStore, StoreError};
use crate::rules::validation;

/// Admin CRUD over the rule store.
///
/// Reads need [`Capability::ViewRules`]; writes need
/// [`Capability::ManageRules`] and are validated before the store is touched.
pub struct RoutingRulesManager<S> {
    store: S,
    audit: Arc<dyn AuditSink>,
}

impl<S> RoutingRulesManager<S>
where
    S: RoutingRuleStore,
{
    pub fn new(store: S, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All rules in evaluation order (priority, then rule_key).
    pub async fn list(
        &self,
        actor: &Operator,
        correlation_id: &str,
    ) -> Result<Vec<RoutingRule>, ApplicationError> {
        self.authorize(actor, Capability::ViewRules, "routing_rule.list", None, correlation_id)?;

        let mut rules = self.store.list().await.map_err(store_error)?;
        rules.sort_by(|left, right| {
            left.priority.cmp(&right.priority).then_with(|| left.rule_key.cmp(&right.rule_key))
        });
        Ok(rules)
    }

    pub async fn create(
        &self,
        actor: &Operator,
        correlation_id: &str,
        draft: RoutingRuleDraft,
    ) -> Result<RoutingRule, ApplicationError> {
        const EVENT: &str = "routing_rule.created";
        self.authorize(actor, Capability::ManageRules, EVENT, None, correlation_id)?;

        let rule = validation::validate_draft(draft, Utc::now())
            .map_err(|error| self.rejected(actor, EVENT, None, correlation_id, error))?;

        if let Err(error) = self.store.insert(&rule).await {
            return Err(self.write_failed(actor, EVENT, &rule.id, correlation_id, error));
        }

        info!(
            event_name = "rules.rule.created",
            correlation_id = %correlation_id,
            actor = %actor.id.0,
            rule_id = %rule.id,
            rule_key = %rule.rule_key,
            priority = rule.priority,
            "routing rule created"
        );
        self.audit_success(actor, EVENT, &rule, correlation_id);
        Ok(rule)
    }

    pub async fn update(
        &self,
        actor: &Operator,
        correlation_id: &str,
        id: &RoutingRuleId,
        patch: RoutingRulePatch,
    ) -> Result<RoutingRule, ApplicationError> {
        const EVENT: &str = "routing_rule.updated";
        self.authorize(actor, Capability::ManageRules, EVENT, Some(id), correlation_id)?;

        let existing = self
            .store
            .find(id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| not_found(id))?;
        let updated = validation::apply_patch(&existing, patch, Utc::now())
            .map_err(|error| self.rejected(actor, EVENT, Some(id), correlation_id, error))?;

        match self.store.update(&updated).await {
            Ok(true) => {}
            Ok(false) => return Err(not_found(id)),
            Err(error) => return Err(self.write_failed(actor, EVENT, id, correlation_id, error)),
        }

        info!(
            event_name = "rules.rule.updated",
            correlation_id = %correlation_id,
            actor = %actor.id.0,
            rule_id = %updated.id,
            rule_key = %updated.rule_key,
            priority = updated.priority,
            is_active = updated.is_active,
            "routing rule updated"
        );
        self.audit_success(actor, EVENT, &updated, correlation_id);
        Ok(updated)
    }

    pub async fn delete(
        &self,
        actor: &Operator,
        correlation_id: &str,
        id: &RoutingRuleId,
    ) -> Result<(), ApplicationError> {
        const EVENT: &str = "routing_rule.deleted";
        self.authorize(actor, Capability::ManageRules, EVENT, Some(id), correlation_id)?;

        match self.store.delete(id).await {
            Ok(true) => {}
            Ok(false) => return Err(not_found(id)),
            Err(error) => return Err(self.write_failed(actor, EVENT, id, correlation_id, error)),
        }

        info!(
            event_name = "rules.rule.deleted",
            correlation_id = %correlation_id,
            actor = %actor.id.0,
            rule_id = %id,
            "routing rule deleted"
        );
        self.audit.emit(AuditEvent::new(
            Some(id.to_string()),
            correlation_id,
            EVENT,
            AuditCategory::RuleAdmin,
            actor.id.0.clone(),
            AuditOutcome::Success,
        ));
        Ok(())
    }

    fn authorize(
        &self,
        actor: &Operator,
        capability: Capability,
        event_type: &str,
        subject: Option<&RoutingRuleId>,
        correlation_id: &str,
    ) -> Result<(), ApplicationError> {
        if actor.has(capability) {
            return Ok(());
        }

        warn!(
            event_name = "rules.authorization.denied",
            correlation_id = %correlation_id,
            actor = %actor.id.0,
            capability = capability.as_str(),
            operation = %event_type,
            "operator lacks capability for routing rule operation"
        );
        if capability == Capability::ManageRules {
            self.audit.emit(
                AuditEvent::new(
                    subject.map(ToString::to_string),
                    correlation_id,
                    event_type,
                    AuditCategory::RuleAdmin,
                    actor.id.0.clone(),
                    AuditOutcome::Rejected,
                )
                .with_metadata("reason", "forbidden"),
            );
        }
        Err(ApplicationError::Forbidden { actor: actor.id.0.clone(), capability: capability.as_str() })
    }

    fn rejected(
        &self,
        actor: &Operator,
        event_type: &str,
        subject: Option<&RoutingRuleId>,
        correlation_id: &str,
        error: DomainError,
    ) -> ApplicationError {
        info!(
            event_name = "rules.validation.rejected",
            correlation_id = %correlation_id,
            actor = %actor.id.0,
            operation = %event_type,
            error = %error,
            "routing rule write rejected by validation"
        );
        self.audit.emit(
            AuditEvent::new(
                subject.map(ToString::to_string),
                correlation_id,
                event_type,
                AuditCategory::RuleAdmin,
                actor.id.0.clone(),
                AuditOutcome::Rejected,
            )
            .with_metadata("reason", error.to_string()),
        );
        error.into()
    }

    fn write_failed(
        &self,
        actor: &Operator,
        event_type: &str,
        subject: &RoutingRuleId,
        correlation_id: &str,
        error: StoreError,
    ) -> ApplicationError {
        let outcome = match error {
            StoreError::Unavailable(_) => AuditOutcome::Failed,
            StoreError::DuplicateRuleKey(_) | StoreError::UnknownAssignmentGroup(_) => {
                AuditOutcome::Rejected
            }
        };
        warn!(
            event_name = "rules.store.write_failed",
            correlation_id = %correlation_id,
            actor = %actor.id.0,
            operation = %event_type,
            rule_id = %subject,
            error = %error,
            "routing rule write failed"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(subject.to_string()),
                correlation_id,
                event_type,
                AuditCategory::RuleAdmin,
                actor.id.0.clone(),
                outcome,
            )
            .with_metadata("reason", error.to_string()),
        );
        store_error(error)
    }

    fn audit_success(
        &self,
        actor: &Operator,
        event_type: &str,
        rule: &RoutingRule,
        correlation_id: &str,
    ) {
        let group = rule.assignment_group_id.map(|id| id.to_string()).unwrap_or_default();
        self.audit.emit(
            AuditEvent::new(
                Some(rule.id.to_string()),
                correlation_id,
                event_type,
                AuditCategory::RuleAdmin,
                actor.id.0.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("rule_key", rule.rule_key.clone())
            .with_metadata("priority", rule.priority.to_string())
            .with_metadata("is_active", rule.is_active.to_string())
            .with_metadata("assignment_group_id", group),
        );
    }
}

fn not_found(id: &RoutingRuleId) -> ApplicationError {
    ApplicationError::NotFound(format!("routing rule `{id}`"))
}

fn store_error(error: StoreError) -> ApplicationError {
    match error {
        StoreError::DuplicateRuleKey(_) => ApplicationError::Conflict(error.to_string()),
        StoreError::UnknownAssignmentGroup(_) => {
            DomainError::RuleValidation(error.to_string()).into()
        }
        StoreError::Unavailable(message) => ApplicationError::Persistence(message),
    }
}
