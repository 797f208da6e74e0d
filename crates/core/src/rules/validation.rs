//! Form-level checks run before any rule write reaches the store.

use chrono::{DateTime, Utc};

use crate::domain::routing_rule::{RoutingRule, RoutingRuleDraft, RoutingRuleId, RoutingRulePatch};
use crate::errors::DomainError;

pub const MAX_RULE_KEY_LEN: usize = 128;

pub fn validate_draft(draft: RoutingRuleDraft, now: DateTime<Utc>) -> Result<RoutingRule, DomainError> {
    Ok(RoutingRule {
        id: RoutingRuleId::new(),
        rule_key: validate_rule_key(&draft.rule_key)?,
        priority: validate_priority(draft.priority)?,
        is_active: draft.is_active,
        match_mailbox: normalize_pattern(draft.match_mailbox),
        match_ticket_type: normalize_pattern(draft.match_ticket_type),
        match_category: normalize_pattern(draft.match_category),
        assignment_group_id: draft.assignment_group_id,
        created_at: now,
        updated_at: now,
    })
}

/// Merges `patch` onto `existing` and re-validates the result.
pub fn apply_patch(
    existing: &RoutingRule,
    patch: RoutingRulePatch,
    now: DateTime<Utc>,
) -> Result<RoutingRule, DomainError> {
    let mut updated = existing.clone();

    if let Some(rule_key) = patch.rule_key {
        updated.rule_key = validate_rule_key(&rule_key)?;
    }
    if let Some(priority) = patch.priority {
        updated.priority = validate_priority(priority)?;
    }
    if let Some(is_active) = patch.is_active {
        updated.is_active = is_active;
    }
    if let Some(match_mailbox) = patch.match_mailbox {
        updated.match_mailbox = normalize_pattern(match_mailbox);
    }
    if let Some(match_ticket_type) = patch.match_ticket_type {
        updated.match_ticket_type = normalize_pattern(match_ticket_type);
    }
    if let Some(match_category) = patch.match_category {
        updated.match_category = normalize_pattern(match_category);
    }
    if let Some(assignment_group_id) = patch.assignment_group_id {
        updated.assignment_group_id = assignment_group_id;
    }

    updated.updated_at = now;
    Ok(updated)
}

pub fn validate_rule_key(raw: &str) -> Result<String, DomainError> {
    let rule_key = raw.trim();
    if rule_key.is_empty() {
        return Err(DomainError::RuleValidation("rule_key must not be empty".to_string()));
    }
    if rule_key.chars().count() > MAX_RULE_KEY_LEN {
        return Err(DomainError::RuleValidation(format!(
            "rule_key must be at most {MAX_RULE_KEY_LEN} characters"
        )));
    }
    Ok(rule_key.to_string())
}

pub fn validate_priority(raw: f64) -> Result<i32, DomainError> {
    if !raw.is_finite() {
        return Err(DomainError::RuleValidation("priority must be a finite number".to_string()));
    }
    if raw.fract() != 0.0 {
        return Err(DomainError::RuleValidation(format!(
            "priority must be a whole number, got {raw}"
        )));
    }
    if raw < f64::from(i32::MIN) || raw > f64::from(i32::MAX) {
        return Err(DomainError::RuleValidation(format!(
            "priority must be within {}..={}",
            i32::MIN,
            i32::MAX
        )));
    }
    Ok(raw as i32)
}

/// Trims a match pattern; blank patterns become wildcards.
pub fn normalize_pattern(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}
