pub mod manager;
pub mod store;
pub mod validation;

pub use manager::RoutingRulesManager;
pub use store::{RoutingRuleStore, StoreError};
