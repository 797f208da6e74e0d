use std::env;
use std::sync::{Mutex, OnceLock};

use pdsdesk_cli::commands::{doctor, migrate, route, rules, seed};
use pdsdesk_db::connect_with_settings;
use pdsdesk_db::repositories::{OperatorGroupRepository, SqlOperatorGroupRepository};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("PDSDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("PDSDESK_DATABASE_URL", "postgres://localhost/pdsdesk")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_reports_groups_and_rules_and_is_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let url = file_database_url(&dir);

    with_env(&[("PDSDESK_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");

        let message = first_payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("4 groups"));
        assert!(message.contains("facilities-mailbox"));

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        assert_eq!(first_payload["message"], parse_payload(&second.output)["message"]);
    });
}

#[test]
fn rules_lists_active_rules_in_priority_order() {
    let dir = TempDir::new().expect("tempdir");
    let url = file_database_url(&dir);

    with_env(&[("PDSDESK_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);

        let active = parse_payload(&rules::run(false).output);
        let keys: Vec<&str> = active["data"]
            .as_array()
            .expect("rules array")
            .iter()
            .filter_map(|rule| rule["rule_key"].as_str())
            .collect();
        assert_eq!(
            keys,
            vec![
                "noreply-discard",
                "security-phishing",
                "facilities-mailbox",
                "hardware-incidents",
                "incident-catch-all"
            ]
        );

        let all = parse_payload(&rules::run(true).output);
        assert_eq!(all["data"].as_array().map(Vec::len), Some(6));
    });
}

#[test]
fn rules_without_schema_is_a_query_failure() {
    with_env(&[("PDSDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = rules::run(false);
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "query");
    });
}

#[test]
fn route_uses_rules_then_default_queue() {
    let dir = TempDir::new().expect("tempdir");
    let url = file_database_url(&dir);

    with_env(
        &[
            ("PDSDESK_DATABASE_URL", url.as_str()),
            ("PDSDESK_ROUTING_DEFAULT_GROUP_KEY", "service-desk"),
        ],
        || {
            assert_eq!(seed::run().exit_code, 0);

            let matched = parse_payload(
                &route::run(route::RouteArgs {
                    mailbox: Some("facilities@pdsdesk.example".to_string()),
                    ..route::RouteArgs::default()
                })
                .output,
            );
            assert_eq!(matched["status"], "ok");
            assert_eq!(matched["data"]["outcome"], "matched");
            assert_eq!(matched["data"]["rule_key"], "facilities-mailbox");

            let fallback = parse_payload(
                &route::run(route::RouteArgs {
                    ticket_type: Some("request".to_string()),
                    ..route::RouteArgs::default()
                })
                .output,
            );
            assert_eq!(fallback["data"]["outcome"], "default_queue");
            assert!(fallback["message"]
                .as_str()
                .unwrap_or_default()
                .contains("`service-desk`"));
        },
    );
}

#[test]
fn route_skips_inactive_default_queue() {
    let dir = TempDir::new().expect("tempdir");
    let url = file_database_url(&dir);

    with_env(
        &[
            ("PDSDESK_DATABASE_URL", url.as_str()),
            ("PDSDESK_ROUTING_DEFAULT_GROUP_KEY", "service-desk"),
        ],
        || {
            assert_eq!(seed::run().exit_code, 0);
            deactivate_group(&url, "service-desk");

            let result = route::run(route::RouteArgs {
                ticket_type: Some("request".to_string()),
                ..route::RouteArgs::default()
            });
            assert_eq!(result.exit_code, 0);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["data"]["outcome"], "unrouted");
            assert!(payload["message"].as_str().unwrap_or_default().contains("unassigned"));

            let report = parse_payload(&doctor::run(true));
            let queue = report["checks"]
                .as_array()
                .expect("checks")
                .iter()
                .find(|check| check["name"] == "default_queue")
                .cloned()
                .expect("default_queue check");
            assert_eq!(queue["status"], "fail");
            assert!(queue["details"].as_str().unwrap_or_default().contains("inactive"));
        },
    );
}

#[test]
fn doctor_json_reports_missing_default_queue() {
    let dir = TempDir::new().expect("tempdir");
    let url = file_database_url(&dir);

    with_env(
        &[
            ("PDSDESK_DATABASE_URL", url.as_str()),
            ("PDSDESK_ROUTING_DEFAULT_GROUP_KEY", "night-shift"),
        ],
        || {
            assert_eq!(migrate::run().exit_code, 0);

            let report = parse_payload(&doctor::run(true));
            assert_eq!(report["overall_status"], "fail");

            let checks = report["checks"].as_array().expect("checks");
            let queue = checks
                .iter()
                .find(|check| check["name"] == "default_queue")
                .expect("default_queue check");
            assert_eq!(queue["status"], "fail");
            assert!(queue["details"].as_str().unwrap_or_default().contains("night-shift"));
        },
    );
}

fn file_database_url(dir: &TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("pdsdesk.db").display())
}

fn deactivate_group(database_url: &str, group_key: &str) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    runtime.block_on(async {
        let pool = connect_with_settings(database_url, 1, 5).await.expect("connect");
        let groups = SqlOperatorGroupRepository::new(pool.clone());
        let mut group = groups.find_by_key(group_key).await.expect("lookup").expect("seeded group");
        group.is_active = false;
        groups.save(group).await.expect("save");
        pool.close().await;
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PDSDESK_DATABASE_URL",
        "PDSDESK_DATABASE_MAX_CONNECTIONS",
        "PDSDESK_DATABASE_TIMEOUT_SECS",
        "PDSDESK_SERVER_BIND_ADDRESS",
        "PDSDESK_SERVER_PORT",
        "PDSDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "PDSDESK_AUTH_API_TOKEN",
        "PDSDESK_ROUTING_DEFAULT_GROUP_KEY",
        "PDSDESK_LOGGING_LEVEL",
        "PDSDESK_LOGGING_FORMAT",
        "PDSDESK_LOG_LEVEL",
        "PDSDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
