pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod preferences;
pub mod routing;
pub mod rules;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use domain::operator::{Capability, Operator, OperatorId, OperatorRole};
pub use domain::operator_group::{OperatorGroup, OperatorGroupId};
pub use domain::routing_rule::{RoutingRule, RoutingRuleDraft, RoutingRuleId, RoutingRulePatch};
pub use domain::ticket::TicketAttributes;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use preferences::{PreferencesError, UserPreferences, WidgetPreference};
pub use routing::{match_rule, resolve, RoutingDecision, RoutingOutcome, TicketRouter};
pub use rules::{RoutingRuleStore, RoutingRulesManager, StoreError};
