pub mod operator;
pub mod operator_group;
pub mod routing_rule;
pub mod ticket;
