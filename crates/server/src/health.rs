use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use pdsdesk_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: ProbeStatus,
    pub detail: String,
}

impl HealthCheck {
    fn ready(detail: impl Into<String>) -> Self {
        Self { status: ProbeStatus::Ready, detail: detail.into() }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self { status: ProbeStatus::Degraded, detail: detail.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: ProbeStatus,
    pub database: HealthCheck,
    pub routing_rules: HealthCheck,
    pub checked_at: String,
}

/// Unauthenticated so load balancers can poll it.
pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let routing_rules = if database.status == ProbeStatus::Ready {
        routing_rules_check(&state.db_pool).await
    } else {
        HealthCheck::degraded("skipped: database unreachable")
    };

    let ready = database.status == ProbeStatus::Ready && routing_rules.status == ProbeStatus::Ready;
    let payload = HealthResponse {
        status: if ready { ProbeStatus::Ready } else { ProbeStatus::Degraded },
        database,
        routing_rules,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck::ready("database query succeeded"),
        Err(error) => HealthCheck::degraded(format!("database query failed: {error}")),
    }
}

/// Zero active rules is still ready: every ticket then takes the default queue.
async fn routing_rules_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM routing_rule WHERE is_active = 1")
        .fetch_one(pool)
        .await
    {
        Ok(0) => HealthCheck::ready("no active routing rules; unmatched tickets use the default queue"),
        Ok(count) => HealthCheck::ready(format!("{count} active routing rules")),
        Err(error) => HealthCheck::degraded(format!("routing rule table unreadable: {error}")),
    }
}
