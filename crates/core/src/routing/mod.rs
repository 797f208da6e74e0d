pub mod intake;
pub mod resolver;

pub use intake::{RoutingDecision, RoutingOutcome, TicketRouter};
pub use resolver::{match_rule, resolve};
