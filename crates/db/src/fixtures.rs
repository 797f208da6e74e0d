use serde::Serialize;
use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Demo operator groups; ids match `config/fixtures/routing_seed.sql`.
const SEED_GROUPS: &[SeedGroupContract] = &[
    SeedGroupContract { id: "6f1c2a40-0000-4000-8000-000000000001", group_key: "service-desk" },
    SeedGroupContract { id: "6f1c2a40-0000-4000-8000-000000000002", group_key: "facilities" },
    SeedGroupContract { id: "6f1c2a40-0000-4000-8000-000000000003", group_key: "it-hardware" },
    SeedGroupContract { id: "6f1c2a40-0000-4000-8000-000000000004", group_key: "security-ops" },
];

const SEED_RULES: &[SeedRuleContract] = &[
    SeedRuleContract {
        id: "9a7e3b10-0000-4000-8000-000000000001",
        rule_key: "noreply-discard",
        priority: 1,
        is_active: true,
        assignment_group_key: None,
    },
    SeedRuleContract {
        id: "9a7e3b10-0000-4000-8000-000000000002",
        rule_key: "security-phishing",
        priority: 5,
        is_active: true,
        assignment_group_key: Some("security-ops"),
    },
    SeedRuleContract {
        id: "9a7e3b10-0000-4000-8000-000000000003",
        rule_key: "facilities-mailbox",
        priority: 10,
        is_active: true,
        assignment_group_key: Some("facilities"),
    },
    SeedRuleContract {
        id: "9a7e3b10-0000-4000-8000-000000000004",
        rule_key: "hardware-incidents",
        priority: 20,
        is_active: true,
        assignment_group_key: Some("it-hardware"),
    },
    SeedRuleContract {
        id: "9a7e3b10-0000-4000-8000-000000000005",
        rule_key: "incident-catch-all",
        priority: 100,
        is_active: true,
        assignment_group_key: Some("service-desk"),
    },
    SeedRuleContract {
        id: "9a7e3b10-0000-4000-8000-000000000006",
        rule_key: "legacy-facilities",
        priority: 0,
        is_active: false,
        assignment_group_key: Some("service-desk"),
    },
];

/// Demo routing dataset: a handful of operator groups plus rules that cover
/// mailbox, type and category matching, an intentionally unassigned rule and
/// an inactive rule.
pub struct RoutingSeedDataset;

impl RoutingSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/routing_seed.sql");

    /// Loads the dataset. Rows that already exist are left untouched.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            groups_seeded: SEED_GROUPS.iter().map(|group| group.group_key).collect(),
            rules_seeded: SEED_RULES.iter().map(|rule| rule.rule_key).collect(),
        })
    }

    /// Checks that every seeded row exists with the expected key, priority,
    /// active flag and group.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for group in SEED_GROUPS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM operator_group WHERE id = ?1 AND group_key = ?2)",
            )
            .bind(group.id)
            .bind(group.group_key)
            .fetch_one(pool)
            .await?;
            checks.push((group.group_key, exists == 1));
        }

        for rule in SEED_RULES {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                     SELECT 1 FROM routing_rule r
                     LEFT JOIN operator_group g ON g.id = r.assignment_group_id
                     WHERE r.id = ?1 AND r.rule_key = ?2 AND r.priority = ?3 AND r.is_active = ?4
                       AND g.group_key IS ?5
                 )",
            )
            .bind(rule.id)
            .bind(rule.rule_key)
            .bind(rule.priority)
            .bind(rule.is_active)
            .bind(rule.assignment_group_key)
            .fetch_one(pool)
            .await?;
            checks.push((rule.rule_key, exists == 1));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded rows, rules first.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let rule_ids = sql_array_from_ids(&SEED_RULES.iter().map(|rule| rule.id).collect::<Vec<_>>());
        let group_ids =
            sql_array_from_ids(&SEED_GROUPS.iter().map(|group| group.id).collect::<Vec<_>>());

        sqlx::query(&format!("DELETE FROM routing_rule WHERE id IN {rule_ids}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM operator_group WHERE id IN {group_ids}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedGroupContract {
    id: &'static str,
    group_key: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct SeedRuleContract {
    id: &'static str,
    rule_key: &'static str,
    priority: i64,
    is_active: bool,
    assignment_group_key: Option<&'static str>,
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug, Serialize)]
pub struct SeedResult {
    pub groups_seeded: Vec<&'static str>,
    pub rules_seeded: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use pdsdesk_core::domain::ticket::TicketAttributes;
    use pdsdesk_core::routing::match_rule;
    use pdsdesk_core::rules::store::RoutingRuleStore;

    use super::*;
    use crate::repositories::SqlRoutingRuleRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[test]
    fn sql_fixture_mentions_every_seeded_key() {
        for group in SEED_GROUPS {
            assert!(RoutingSeedDataset::SQL.contains(group.id), "missing group {}", group.group_key);
        }
        for rule in SEED_RULES {
            assert!(RoutingSeedDataset::SQL.contains(rule.rule_key), "missing rule {}", rule.rule_key);
        }
    }

    #[tokio::test]
    async fn load_verify_clean_cycle() {
        let pool = setup().await;

        let result = RoutingSeedDataset::load(&pool).await.expect("load");
        assert_eq!(result.groups_seeded.len(), SEED_GROUPS.len());
        assert_eq!(result.rules_seeded.len(), SEED_RULES.len());

        let verification = RoutingSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "failed checks: {:?}", verification.checks);

        RoutingSeedDataset::clean(&pool).await.expect("clean");
        let verification = RoutingSeedDataset::verify(&pool).await.expect("verify after clean");
        assert!(verification.checks.iter().all(|(_, present)| !present));
    }

    #[tokio::test]
    async fn load_is_idempotent() {
        let pool = setup().await;

        RoutingSeedDataset::load(&pool).await.expect("first load");
        RoutingSeedDataset::load(&pool).await.expect("second load");

        let rule_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM routing_rule")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(rule_count, SEED_RULES.len() as i64);
    }

    #[tokio::test]
    async fn seeded_rules_route_demo_tickets() {
        let pool = setup().await;
        RoutingSeedDataset::load(&pool).await.expect("load");
        let rules = SqlRoutingRuleRepository::new(pool).list().await.expect("list");

        let winner = |ticket: TicketAttributes| {
            match_rule(&ticket, &rules).map(|rule| rule.rule_key.clone())
        };

        assert_eq!(
            winner(TicketAttributes::default().with_mailbox("facilities@pdsdesk.example")),
            Some("facilities-mailbox".to_string())
        );
        assert_eq!(
            winner(TicketAttributes::default().with_ticket_type("incident").with_category("hardware")),
            Some("hardware-incidents".to_string())
        );
        assert_eq!(
            winner(TicketAttributes::default().with_ticket_type("incident").with_category("phishing")),
            Some("security-phishing".to_string())
        );
        assert_eq!(
            winner(TicketAttributes::default().with_ticket_type("incident")),
            Some("incident-catch-all".to_string())
        );
        assert_eq!(winner(TicketAttributes::default().with_ticket_type("request")), None);
    }
}
