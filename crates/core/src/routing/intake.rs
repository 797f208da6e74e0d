use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::operator_group::OperatorGroupId;
use crate::domain::routing_rule::RoutingRuleId;
use crate::domain::ticket::TicketAttributes;
use crate::routing::resolver::match_rule;
use crate::rules::store::RoutingRuleStore;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RoutingOutcome {
    /// A rule matched. A `None` group means the rule deliberately leaves the
    /// ticket unassigned; the default queue is not applied.
    Matched {
        rule_id: RoutingRuleId,
        rule_key: String,
        assignment_group_id: Option<OperatorGroupId>,
    },
    /// No rule matched and the configured default queue was applied.
    DefaultQueue { assignment_group_id: OperatorGroupId },
    Unrouted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    #[serde(flatten)]
    pub outcome: RoutingOutcome,
    /// Active rules in the snapshot; inactive rules are never candidates.
    pub rules_evaluated: usize,
    pub snapshot_available: bool,
}

impl RoutingDecision {
    pub fn assignment_group_id(&self) -> Option<OperatorGroupId> {
        match &self.outcome {
            RoutingOutcome::Matched { assignment_group_id, .. } => *assignment_group_id,
            RoutingOutcome::DefaultQueue { assignment_group_id } => Some(*assignment_group_id),
            RoutingOutcome::Unrouted => None,
        }
    }
}

/// Routes newly arrived tickets: one rule snapshot per ticket, resolved
/// independently, with an optional default queue for unmatched tickets.
pub struct TicketRouter<S> {
    store: S,
    default_group: Option<OperatorGroupId>,
}

impl<S> TicketRouter<S>
where
    S: RoutingRuleStore,
{
    pub fn new(store: S, default_group: Option<OperatorGroupId>) -> Self {
        Self { store, default_group }
    }

    /// Never fails: an unavailable rule store is treated as an empty snapshot.
    pub async fn route(&self, ticket: &TicketAttributes, correlation_id: &str) -> RoutingDecision {
        let (rules, snapshot_available) = match self.store.list().await {
            Ok(rules) => (rules, true),
            Err(error) => {
                warn!(
                    event_name = "routing.snapshot.unavailable",
                    correlation_id = %correlation_id,
                    error = %error,
                    "rule snapshot unavailable; routing without rules"
                );
                (Vec::new(), false)
            }
        };

        let outcome = match match_rule(ticket, &rules) {
            Some(rule) => RoutingOutcome::Matched {
                rule_id: rule.id,
                rule_key: rule.rule_key.clone(),
                assignment_group_id: rule.assignment_group_id,
            },
            None => match self.default_group {
                Some(assignment_group_id) => RoutingOutcome::DefaultQueue { assignment_group_id },
                None => RoutingOutcome::Unrouted,
            },
        };

        let rules_evaluated = rules.iter().filter(|rule| rule.is_active).count();
        let decision = RoutingDecision { outcome, rules_evaluated, snapshot_available };
        info!(
            event_name = "routing.ticket.resolved",
            correlation_id = %correlation_id,
            mailbox = ticket.mailbox.as_deref().unwrap_or("none"),
            ticket_type = ticket.ticket_type.as_deref().unwrap_or("none"),
            category = ticket.category.as_deref().unwrap_or("none"),
            outcome = outcome_label(&decision.outcome),
            assignment_group_id = %decision
                .assignment_group_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "none".to_string()),
            rules_evaluated = decision.rules_evaluated,
            "ticket routing resolved"
        );
        decision
    }
}

fn outcome_label(outcome: &RoutingOutcome) -> &'static str {
    match outcome {
        RoutingOutcome::Matched { assignment_group_id: Some(_), .. } => "matched",
        RoutingOutcome::Matched { assignment_group_id: None, .. } => "matched_unassigned",
        RoutingOutcome::DefaultQueue { .. } => "default_queue",
        RoutingOutcome::Unrouted => "unrouted",
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    use super::{RoutingOutcome, TicketRouter};
    use crate::domain::operator_group::OperatorGroupId;
    use crate::domain::routing_rule::{RoutingRule, RoutingRuleId};
    use crate::domain::ticket::TicketAttributes;
    use crate::rules::store::{RoutingRuleStore, StoreError};

    struct SnapshotStore(Result<Vec<RoutingRule>, StoreError>);

    #[async_trait]
    impl RoutingRuleStore for SnapshotStore {
        async fn list(&self) -> Result<Vec<RoutingRule>, StoreError> {
            self.0.clone()
        }

        async fn find(&self, _id: &RoutingRuleId) -> Result<Option<RoutingRule>, StoreError> {
            Ok(None)
        }

        async fn insert(&self, _rule: &RoutingRule) -> Result<(), StoreError> {
            Ok(())
        }

        async fn update(&self, _rule: &RoutingRule) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn delete(&self, _id: &RoutingRuleId) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    const DEFAULT_QUEUE: OperatorGroupId = OperatorGroupId(Uuid::from_u128(99));

    fn mailbox_rule(rule_key: &str, mailbox: &str, group: Option<OperatorGroupId>) -> RoutingRule {
        let now = Utc::now();
        RoutingRule {
            id: RoutingRuleId::new(),
            rule_key: rule_key.to_string(),
            priority: 10,
            is_active: true,
            match_mailbox: Some(mailbox.to_string()),
            match_ticket_type: None,
            match_category: None,
            assignment_group_id: group,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn matched_rule_wins_over_default_queue() {
        let group = OperatorGroupId(Uuid::from_u128(1));
        let router = TicketRouter::new(
            SnapshotStore(Ok(vec![mailbox_rule("facilities", "facilities@x", Some(group))])),
            Some(DEFAULT_QUEUE),
        );

        let decision =
            router.route(&TicketAttributes::default().with_mailbox("facilities@x"), "req-1").await;

        assert!(matches!(decision.outcome, RoutingOutcome::Matched { ref rule_key, .. } if rule_key == "facilities"));
        assert_eq!(decision.assignment_group_id(), Some(group));
        assert_eq!(decision.rules_evaluated, 1);
    }

    #[tokio::test]
    async fn unmatched_ticket_falls_back_to_default_queue() {
        let router = TicketRouter::new(
            SnapshotStore(Ok(vec![mailbox_rule("facilities", "facilities@x", None)])),
            Some(DEFAULT_QUEUE),
        );

        let decision =
            router.route(&TicketAttributes::default().with_mailbox("support@x"), "req-2").await;

        assert_eq!(decision.outcome, RoutingOutcome::DefaultQueue { assignment_group_id: DEFAULT_QUEUE });
    }

    #[tokio::test]
    async fn intentionally_unassigned_match_skips_default_queue() {
        let router = TicketRouter::new(
            SnapshotStore(Ok(vec![mailbox_rule("noreply", "noreply@x", None)])),
            Some(DEFAULT_QUEUE),
        );

        let decision =
            router.route(&TicketAttributes::default().with_mailbox("noreply@x"), "req-3").await;

        assert!(matches!(decision.outcome, RoutingOutcome::Matched { assignment_group_id: None, .. }));
        assert_eq!(decision.assignment_group_id(), None);
    }

    #[tokio::test]
    async fn inactive_rules_are_not_counted_as_evaluated() {
        let mut retired = mailbox_rule("facilities-old", "facilities@x", Some(DEFAULT_QUEUE));
        retired.is_active = false;
        let router = TicketRouter::new(
            SnapshotStore(Ok(vec![retired, mailbox_rule("noreply", "noreply@x", None)])),
            None,
        );

        let decision =
            router.route(&TicketAttributes::default().with_mailbox("facilities@x"), "req-5").await;

        assert_eq!(decision.outcome, RoutingOutcome::Unrouted);
        assert_eq!(decision.rules_evaluated, 1);
    }

    #[tokio::test]
    async fn unavailable_snapshot_is_treated_as_no_rules() {
        let router = TicketRouter::new(
            SnapshotStore(Err(StoreError::Unavailable("timeout".to_string()))),
            None,
        );

        let decision = router.route(&TicketAttributes::default(), "req-4").await;

        assert_eq!(decision.outcome, RoutingOutcome::Unrouted);
        assert!(!decision.snapshot_available);
        assert_eq!(decision.rules_evaluated, 0);
    }

    #[test]
    fn decision_serializes_with_flat_outcome_tag() {
        let decision = super::RoutingDecision {
            outcome: RoutingOutcome::Unrouted,
            rules_evaluated: 3,
            snapshot_available: true,
        };
        let json = serde_json::to_value(&decision).expect("serialize");

        assert_eq!(json["outcome"], "unrouted");
        assert_eq!(json["rules_evaluated"], 3);
    }
}
