use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::domain::operator_group::OperatorGroupId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoutingRuleId(pub Uuid);

impl RoutingRuleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoutingRuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoutingRuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// An admin-configured mapping from ticket attributes to an assignment group.
///
/// Each `match_*` field is either a concrete value or `None`, which acts as a
/// wildcard. A `None` assignment group on a matching rule means the ticket is
/// intentionally left unassigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub id: RoutingRuleId,
    pub rule_key: String,
    pub priority: i32,
    pub is_active: bool,
    pub match_mailbox: Option<String>,
    pub match_ticket_type: Option<String>,
    pub match_category: Option<String>,
    pub assignment_group_id: Option<OperatorGroupId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unvalidated input for a new rule, as submitted by the admin form.
///
/// `priority` stays an `f64` until validation so that non-integral or
/// non-finite input can be rejected with a form-level message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutingRuleDraft {
    pub rule_key: String,
    pub priority: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub match_mailbox: Option<String>,
    #[serde(default)]
    pub match_ticket_type: Option<String>,
    #[serde(default)]
    pub match_category: Option<String>,
    #[serde(default)]
    pub assignment_group_id: Option<OperatorGroupId>,
}

impl RoutingRuleDraft {
    pub fn new(rule_key: impl Into<String>, priority: f64) -> Self {
        Self {
            rule_key: rule_key.into(),
            priority,
            is_active: true,
            match_mailbox: None,
            match_ticket_type: None,
            match_category: None,
            assignment_group_id: None,
        }
    }
}

/// Partial update for an existing rule. Absent fields are left unchanged;
/// nullable fields use an explicit `null` to clear the stored value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingRulePatch {
    #[serde(default)]
    pub rule_key: Option<String>,
    #[serde(default)]
    pub priority: Option<f64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub match_mailbox: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub match_ticket_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub match_category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub assignment_group_id: Option<Option<OperatorGroupId>>,
}

impl RoutingRulePatch {
    pub fn is_empty(&self) -> bool {
        self.rule_key.is_none()
            && self.priority.is_none()
            && self.is_active.is_none()
            && self.match_mailbox.is_none()
            && self.match_ticket_type.is_none()
            && self.match_category.is_none()
            && self.assignment_group_id.is_none()
    }
}

fn default_active() -> bool {
    true
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
