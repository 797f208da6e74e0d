use pdsdesk_core::domain::operator_group::OperatorGroupId;
use pdsdesk_core::domain::ticket::TicketAttributes;
use pdsdesk_core::routing::{RoutingDecision, RoutingOutcome, TicketRouter};
use pdsdesk_db::repositories::{
    lookup_default_queue, OperatorGroupRepository, SqlOperatorGroupRepository,
    SqlRoutingRuleRepository,
};

use crate::commands::{build_runtime, load_config, open_pool, CommandResult, EXIT_QUERY};

#[derive(Debug, Default, Clone)]
pub struct RouteArgs {
    pub mailbox: Option<String>,
    pub ticket_type: Option<String>,
    pub category: Option<String>,
}

impl RouteArgs {
    fn ticket(&self) -> TicketAttributes {
        TicketAttributes {
            mailbox: self.mailbox.clone(),
            ticket_type: self.ticket_type.clone(),
            category: self.category.clone(),
        }
    }
}

pub fn run(args: RouteArgs) -> CommandResult {
    let config = match load_config("route") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("route") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let ticket = args.ticket();
    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let groups = SqlOperatorGroupRepository::new(pool.clone());

        let default_group =
            lookup_default_queue(&groups, config.routing.default_group_key.as_deref())
                .await
                .map_err(|error| ("query", error.to_string(), EXIT_QUERY))?
                .active_id();

        let router = TicketRouter::new(SqlRoutingRuleRepository::new(pool.clone()), default_group);
        let decision = router.route(&ticket, "cli-route").await;

        let group_key = match decision.assignment_group_id() {
            Some(id) => groups
                .find_by_id(&id)
                .await
                .map_err(|error| ("query", error.to_string(), EXIT_QUERY))?
                .map(|group| group.group_key),
            None => None,
        };

        pool.close().await;
        Ok::<_, crate::commands::CommandFailure>((decision, group_key))
    });

    match result {
        Ok((decision, group_key)) => {
            let message = describe(&decision, group_key.as_deref());
            let data = serde_json::to_value(&decision).ok();
            CommandResult::success_with_data("route", message, data)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("route", error_class, message, exit_code)
        }
    }
}

fn describe(decision: &RoutingDecision, group_key: Option<&str>) -> String {
    let group_label = |id: &OperatorGroupId| {
        group_key.map(|key| key.to_string()).unwrap_or_else(|| id.to_string())
    };

    let mut message = match &decision.outcome {
        RoutingOutcome::Matched { rule_key, assignment_group_id: Some(id), .. } => {
            format!("rule `{rule_key}` routes the ticket to `{}`", group_label(id))
        }
        RoutingOutcome::Matched { rule_key, assignment_group_id: None, .. } => {
            format!("rule `{rule_key}` matched and leaves the ticket unassigned")
        }
        RoutingOutcome::DefaultQueue { assignment_group_id } => {
            format!("no rule matched; default queue `{}` applies", group_label(assignment_group_id))
        }
        RoutingOutcome::Unrouted => "no rule matched; ticket stays unassigned".to_string(),
    };

    if !decision.snapshot_available {
        message.push_str(" (rule store unavailable)");
    }
    message
}
