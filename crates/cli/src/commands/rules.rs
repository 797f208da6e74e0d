use std::sync::Arc;

use pdsdesk_core::audit::TracingAuditSink;
use pdsdesk_core::domain::operator::{Operator, OperatorRole};
use pdsdesk_core::domain::routing_rule::RoutingRule;
use pdsdesk_core::errors::ApplicationError;
use pdsdesk_core::rules::RoutingRulesManager;
use pdsdesk_db::repositories::SqlRoutingRuleRepository;

use crate::commands::{build_runtime, load_config, open_pool, CommandResult, EXIT_QUERY};

/// Identity the CLI reads rules as.
pub(crate) const CLI_OPERATOR_ID: &str = "cli";

pub fn run(include_inactive: bool) -> CommandResult {
    let config = match load_config("rules") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("rules") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let manager = RoutingRulesManager::new(
            SqlRoutingRuleRepository::new(pool.clone()),
            Arc::new(TracingAuditSink),
        );
        let actor = Operator::with_role(CLI_OPERATOR_ID, OperatorRole::Operator);

        let listed = manager
            .list(&actor, "cli-rules")
            .await
            .map_err(|error| ("query", query_error_message(&error), EXIT_QUERY));
        pool.close().await;
        listed
    });

    match result {
        Ok(rules) => {
            let shown = filter_rules(rules, include_inactive);
            let message = format!("{} routing rules", shown.len());
            let data = serde_json::to_value(&shown).ok();
            CommandResult::success_with_data("rules", message, data)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("rules", error_class, message, exit_code)
        }
    }
}

fn filter_rules(rules: Vec<RoutingRule>, include_inactive: bool) -> Vec<RoutingRule> {
    if include_inactive {
        rules
    } else {
        rules.into_iter().filter(|rule| rule.is_active).collect()
    }
}

fn query_error_message(error: &ApplicationError) -> String {
    match error {
        ApplicationError::Persistence(message) => {
            format!("{message} (has `pdsdesk migrate` been run?)")
        }
        other => other.to_string(),
    }
}
