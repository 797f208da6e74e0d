use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use pdsdesk_core::domain::operator::Capability;
use pdsdesk_core::domain::operator_group::OperatorGroup;
use pdsdesk_core::domain::ticket::TicketAttributes;
use pdsdesk_core::errors::ApplicationError;
use pdsdesk_core::routing::RoutingDecision;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{
    application_error, authenticate, correlation_id, invalid_body, require, ApiError, ApiState,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveResponse {
    #[serde(flatten)]
    pub decision: RoutingDecision,
    /// `group_key` of the assigned group, when the group still exists.
    pub assignment_group_key: Option<String>,
}

/// Resolves a ticket against the live rule set without creating anything.
/// The intake pipeline and the admin form preview both use it.
pub async fn resolve_ticket(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<TicketAttributes>, JsonRejection>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let actor = authenticate(&state, &headers, &correlation_id)?;
    require(&actor, Capability::ViewRules, &correlation_id)?;
    let Json(ticket) = payload.map_err(|rejection| invalid_body(rejection, &correlation_id))?;

    let decision = state.router.route(&ticket, &correlation_id).await;
    let assignment_group_key = match decision.assignment_group_id() {
        Some(id) => match state.groups.find_by_id(&id).await {
            Ok(group) => group.map(|group| group.group_key),
            Err(error) => {
                warn!(
                    event_name = "api.routing.group_lookup_failed",
                    correlation_id = %correlation_id,
                    group_id = %id,
                    error = %error,
                    "assigned group lookup failed; returning id only"
                );
                None
            }
        },
        None => None,
    };

    Ok(Json(ResolveResponse { decision, assignment_group_key }))
}

/// Active groups only; inactive groups cannot be picked for new rules.
pub async fn list_operator_groups(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<OperatorGroup>>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let actor = authenticate(&state, &headers, &correlation_id)?;
    require(&actor, Capability::ViewRules, &correlation_id)?;

    let groups = state.groups.list().await.map_err(|error| {
        application_error(ApplicationError::Persistence(error.to_string()), &correlation_id)
    })?;
    Ok(Json(groups.into_iter().filter(|group| group.is_active).collect()))
}
