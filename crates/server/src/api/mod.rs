//! JSON API for the admin console and the ticket intake pipeline.
//!
//! - `GET    /api/v1/routing-rules`                     list rules in evaluation order
//! - `POST   /api/v1/routing-rules`                     create a rule (admin)
//! - `PATCH  /api/v1/routing-rules/{id}`                update a rule (admin)
//! - `DELETE /api/v1/routing-rules/{id}`                delete a rule (admin)
//! - `POST   /api/v1/routing/resolve`                   resolve a ticket against the live rules
//! - `GET    /api/v1/operator-groups`                   groups for the rule form picker
//! - `GET    /api/v1/preferences`                       the caller's UI preferences
//! - `PUT    /api/v1/preferences`                       replace the caller's UI preferences
//! - `POST   /api/v1/preferences/sidebar/move`          reorder one sidebar item
//! - `POST   /api/v1/preferences/widgets/{widget_key}`  move, show, hide or configure a widget
//!
//! Identity is asserted by the upstream auth proxy through `x-operator-id`
//! and `x-operator-role`. When an API token is configured, the proxy must
//! also present it as a bearer token.

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use pdsdesk_core::audit::{AuditSink, TracingAuditSink};
use pdsdesk_core::domain::operator::{Capability, Operator, OperatorRole};
use pdsdesk_core::domain::operator_group::OperatorGroupId;
use pdsdesk_core::errors::{ApplicationError, InterfaceError};
use pdsdesk_core::routing::TicketRouter;
use pdsdesk_core::rules::{RoutingRuleStore, RoutingRulesManager};
use pdsdesk_db::repositories::{
    OperatorGroupRepository, SqlOperatorGroupRepository, SqlRoutingRuleRepository,
    SqlUserPreferencesRepository, UserPreferencesRepository,
};
use pdsdesk_db::DbPool;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

pub mod preferences;
pub mod routing;
pub mod rules;

pub const OPERATOR_ID_HEADER: &str = "x-operator-id";
pub const OPERATOR_ROLE_HEADER: &str = "x-operator-role";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

pub type RuleStoreHandle = Arc<dyn RoutingRuleStore>;

#[derive(Clone)]
pub struct ApiState {
    pub rules: Arc<RoutingRulesManager<RuleStoreHandle>>,
    pub router: Arc<TicketRouter<RuleStoreHandle>>,
    pub groups: Arc<dyn OperatorGroupRepository>,
    pub preferences: Arc<dyn UserPreferencesRepository>,
    pub audit: Arc<dyn AuditSink>,
    api_token: Option<SecretString>,
}

impl ApiState {
    pub fn new(
        store: RuleStoreHandle,
        groups: Arc<dyn OperatorGroupRepository>,
        preferences: Arc<dyn UserPreferencesRepository>,
        audit: Arc<dyn AuditSink>,
        default_group: Option<OperatorGroupId>,
        api_token: Option<SecretString>,
    ) -> Self {
        Self {
            rules: Arc::new(RoutingRulesManager::new(store.clone(), audit.clone())),
            router: Arc::new(TicketRouter::new(store, default_group)),
            groups,
            preferences,
            audit,
            api_token,
        }
    }

    /// SQL-backed state; audit events go to the structured log.
    pub fn from_pool(
        db_pool: DbPool,
        default_group: Option<OperatorGroupId>,
        api_token: Option<SecretString>,
    ) -> Self {
        Self::new(
            Arc::new(SqlRoutingRuleRepository::new(db_pool.clone())),
            Arc::new(SqlOperatorGroupRepository::new(db_pool.clone())),
            Arc::new(SqlUserPreferencesRepository::new(db_pool)),
            Arc::new(TracingAuditSink),
            default_group,
            api_token,
        )
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/routing-rules", get(rules::list_rules).post(rules::create_rule))
        .route("/api/v1/routing-rules/{id}", patch(rules::update_rule).delete(rules::delete_rule))
        .route("/api/v1/routing/resolve", post(routing::resolve_ticket))
        .route("/api/v1/operator-groups", get(routing::list_operator_groups))
        .route(
            "/api/v1/preferences",
            get(preferences::get_preferences).put(preferences::replace_preferences),
        )
        .route("/api/v1/preferences/sidebar/move", post(preferences::move_sidebar_item))
        .route("/api/v1/preferences/widgets/{widget_key}", post(preferences::update_widget))
        .with_state(state)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub correlation_id: String,
}

pub type ApiError = (StatusCode, Json<ApiErrorBody>);

/// Caller-supplied id when present so one request can be traced across services.
pub(crate) fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("req-{}", Uuid::new_v4()))
}

pub(crate) fn authenticate(
    state: &ApiState,
    headers: &HeaderMap,
    correlation_id: &str,
) -> Result<Operator, ApiError> {
    if let Some(expected) = &state.api_token {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if presented != Some(expected.expose_secret()) {
            return Err(unauthorized("missing or invalid bearer token", correlation_id));
        }
    }

    let operator_id = header_value(headers, OPERATOR_ID_HEADER)
        .ok_or_else(|| unauthorized("missing operator identity", correlation_id))?;
    let role = match header_value(headers, OPERATOR_ROLE_HEADER) {
        Some(raw) => raw
            .parse::<OperatorRole>()
            .map_err(|message| unauthorized(&message, correlation_id))?,
        None => OperatorRole::Operator,
    };

    Ok(Operator::with_role(operator_id, role))
}

/// Rejects `actor` with 403 unless their role grants `capability`.
pub(crate) fn require(
    actor: &Operator,
    capability: Capability,
    correlation_id: &str,
) -> Result<(), ApiError> {
    if actor.has(capability) {
        return Ok(());
    }
    Err(application_error(
        ApplicationError::Forbidden { actor: actor.id.0.clone(), capability: capability.as_str() },
        correlation_id,
    ))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn unauthorized(message: &str, correlation_id: &str) -> ApiError {
    interface_error(InterfaceError::Unauthorized {
        message: message.to_string(),
        correlation_id: correlation_id.to_string(),
    })
}

pub(crate) fn application_error(error: ApplicationError, correlation_id: &str) -> ApiError {
    interface_error(error.into_interface(correlation_id))
}

pub(crate) fn bad_request(message: impl Into<String>, correlation_id: &str) -> ApiError {
    interface_error(InterfaceError::BadRequest {
        message: message.into(),
        correlation_id: correlation_id.to_string(),
    })
}

pub(crate) fn invalid_body(rejection: JsonRejection, correlation_id: &str) -> ApiError {
    bad_request(format!("invalid request body: {}", rejection.body_text()), correlation_id)
}

/// Client errors carry the detailed message; server-side failures only the
/// generic one, with the detail kept in the log.
pub(crate) fn interface_error(error: InterfaceError) -> ApiError {
    let (status, exposed) = match &error {
        InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message.as_str()),
        InterfaceError::Unauthorized { message, .. } => {
            (StatusCode::UNAUTHORIZED, message.as_str())
        }
        InterfaceError::Forbidden { message, .. } => (StatusCode::FORBIDDEN, message.as_str()),
        InterfaceError::NotFound { message, .. } => (StatusCode::NOT_FOUND, message.as_str()),
        InterfaceError::Conflict { message, .. } => (StatusCode::CONFLICT, message.as_str()),
        InterfaceError::ServiceUnavailable { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, error.user_message())
        }
    };

    if status.is_server_error() {
        error!(
            event_name = "api.request.failed",
            correlation_id = %error.correlation_id(),
            status = status.as_u16(),
            error = %error.message(),
            "request failed"
        );
    } else {
        warn!(
            event_name = "api.request.rejected",
            correlation_id = %error.correlation_id(),
            status = status.as_u16(),
            error = %error.message(),
            "request rejected"
        );
    }

    let body =
        ApiErrorBody { error: exposed.to_string(), correlation_id: error.correlation_id().to_string() };
    (status, Json(body))
}
