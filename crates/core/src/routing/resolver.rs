//! Routing-rule resolution.
//!
//! Given one ticket and a snapshot of rules, select at most one rule:
//! active rules only, every set `match_*` field must equal the ticket's
//! attribute exactly, lowest `priority` first, then the most specific rule,
//! then the smallest `rule_key`, then the smallest `id`. Resolution is pure
//! and never fails.

use std::cmp::Ordering;

use crate::domain::operator_group::OperatorGroupId;
use crate::domain::routing_rule::RoutingRule;
use crate::domain::ticket::TicketAttributes;

impl RoutingRule {
    /// Whether every non-wildcard field of this rule agrees with the ticket.
    pub fn matches(&self, ticket: &TicketAttributes) -> bool {
        field_matches(self.match_mailbox.as_deref(), ticket.mailbox.as_deref())
            && field_matches(self.match_ticket_type.as_deref(), ticket.ticket_type.as_deref())
            && field_matches(self.match_category.as_deref(), ticket.category.as_deref())
    }

    /// Number of non-wildcard match fields.
    pub fn specificity(&self) -> usize {
        usize::from(is_set(self.match_mailbox.as_deref()))
            + usize::from(is_set(self.match_ticket_type.as_deref()))
            + usize::from(is_set(self.match_category.as_deref()))
    }

    pub fn is_catch_all(&self) -> bool {
        self.specificity() == 0
    }
}

/// Returns the winning rule for `ticket`, or `None` when nothing matches.
pub fn match_rule<'a>(ticket: &TicketAttributes, rules: &'a [RoutingRule]) -> Option<&'a RoutingRule> {
    rules
        .iter()
        .filter(|rule| rule.is_active && rule.matches(ticket))
        .min_by(|left, right| precedence(left, right))
}

/// Returns the assignment group of the winning rule.
///
/// `None` covers both "no rule matched" and "the winning rule leaves the
/// ticket unassigned"; use [`match_rule`] to tell them apart.
pub fn resolve(ticket: &TicketAttributes, rules: &[RoutingRule]) -> Option<OperatorGroupId> {
    match_rule(ticket, rules).and_then(|rule| rule.assignment_group_id)
}

fn precedence(left: &RoutingRule, right: &RoutingRule) -> Ordering {
    left.priority
        .cmp(&right.priority)
        .then_with(|| right.specificity().cmp(&left.specificity()))
        .then_with(|| left.rule_key.cmp(&right.rule_key))
        .then_with(|| left.id.cmp(&right.id))
}

fn field_matches(pattern: Option<&str>, value: Option<&str>) -> bool {
    match pattern {
        Some(pattern) if !pattern.is_empty() => value == Some(pattern),
        _ => true,
    }
}

fn is_set(pattern: Option<&str>) -> bool {
    pattern.is_some_and(|value| !value.is_empty())
}
