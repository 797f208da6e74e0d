use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use pdsdesk_core::domain::routing_rule::{
    RoutingRule, RoutingRuleDraft, RoutingRuleId, RoutingRulePatch,
};
use uuid::Uuid;

use super::{
    application_error, authenticate, bad_request, correlation_id, invalid_body, ApiError, ApiState,
};

pub async fn list_rules(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RoutingRule>>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let actor = authenticate(&state, &headers, &correlation_id)?;

    let rules = state
        .rules
        .list(&actor, &correlation_id)
        .await
        .map_err(|error| application_error(error, &correlation_id))?;
    Ok(Json(rules))
}

pub async fn create_rule(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<RoutingRuleDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<RoutingRule>), ApiError> {
    let correlation_id = correlation_id(&headers);
    let actor = authenticate(&state, &headers, &correlation_id)?;
    let Json(draft) = payload.map_err(|rejection| invalid_body(rejection, &correlation_id))?;

    let rule = state
        .rules
        .create(&actor, &correlation_id, draft)
        .await
        .map_err(|error| application_error(error, &correlation_id))?;
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn update_rule(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    payload: Result<Json<RoutingRulePatch>, JsonRejection>,
) -> Result<Json<RoutingRule>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let actor = authenticate(&state, &headers, &correlation_id)?;
    let id = parse_rule_id(&raw_id, &correlation_id)?;
    let Json(patch) = payload.map_err(|rejection| invalid_body(rejection, &correlation_id))?;
    if patch.is_empty() {
        return Err(bad_request("patch must change at least one field", &correlation_id));
    }

    let rule = state
        .rules
        .update(&actor, &correlation_id, &id, patch)
        .await
        .map_err(|error| application_error(error, &correlation_id))?;
    Ok(Json(rule))
}

pub async fn delete_rule(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let correlation_id = correlation_id(&headers);
    let actor = authenticate(&state, &headers, &correlation_id)?;
    let id = parse_rule_id(&raw_id, &correlation_id)?;

    state
        .rules
        .delete(&actor, &correlation_id, &id)
        .await
        .map_err(|error| application_error(error, &correlation_id))?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_rule_id(raw: &str, correlation_id: &str) -> Result<RoutingRuleId, ApiError> {
    Uuid::parse_str(raw.trim())
        .map(RoutingRuleId)
        .map_err(|_| bad_request(format!("`{raw}` is not a valid routing rule id"), correlation_id))
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        Json,
    };
    use pdsdesk_core::audit::AuditOutcome;
    use pdsdesk_core::domain::routing_rule::{RoutingRuleDraft, RoutingRulePatch};

    use super::{create_rule, delete_rule, list_rules, update_rule};
    use crate::api::test_support::{admin, fixture, operator, rule};

    fn draft(rule_key: &str, priority: f64) -> RoutingRuleDraft {
        RoutingRuleDraft::new(rule_key, priority)
    }

    #[tokio::test]
    async fn admin_creates_rule_with_trimmed_values() {
        let fixture = fixture(Vec::new(), None).await;
        let mut submitted = draft("  facilities-mailbox ", 10.0);
        submitted.match_mailbox = Some(" facilities@pdsdesk.example ".to_string());
        submitted.assignment_group_id = Some(fixture.facilities.id);

        let (status, Json(created)) =
            create_rule(State(fixture.state.clone()), admin(), Ok(Json(submitted)))
                .await
                .expect("create");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.rule_key, "facilities-mailbox");
        assert_eq!(created.match_mailbox.as_deref(), Some("facilities@pdsdesk.example"));

        let Json(listed) = list_rules(State(fixture.state), operator()).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(fixture.audit.events().len(), 1);
    }

    #[tokio::test]
    async fn operator_cannot_create_rules() {
        let fixture = fixture(Vec::new(), None).await;

        let (status, Json(body)) =
            create_rule(State(fixture.state.clone()), operator(), Ok(Json(draft("vip", 1.0))))
                .await
                .expect_err("operators are read-only");

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.error.contains("manage_rules"));
        let Json(listed) = list_rules(State(fixture.state), admin()).await.expect("list");
        assert!(listed.is_empty());

        let events = fixture.audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, AuditOutcome::Rejected);
    }

    #[tokio::test]
    async fn validation_failures_are_bad_requests() {
        let fixture = fixture(Vec::new(), None).await;

        let (status, Json(body)) =
            create_rule(State(fixture.state.clone()), admin(), Ok(Json(draft("   ", 1.0))))
                .await
                .expect_err("blank key");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("rule_key"));

        let (status, _) =
            create_rule(State(fixture.state), admin(), Ok(Json(draft("fractional", 2.5))))
                .await
                .expect_err("fractional priority");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_rule_key_is_a_conflict() {
        let fixture = fixture(vec![rule("vip", 1)], None).await;

        let (status, Json(body)) =
            create_rule(State(fixture.state), admin(), Ok(Json(draft("vip", 2.0))))
                .await
                .expect_err("duplicate");

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.error.contains("vip"));
    }

    #[tokio::test]
    async fn patch_updates_only_named_fields() {
        let mut existing = rule("incident-catch-all", 100);
        existing.match_ticket_type = Some("incident".to_string());
        let id = existing.id;
        let fixture = fixture(vec![existing], None).await;

        let patch: RoutingRulePatch =
            serde_json::from_str(r#"{"priority":50,"is_active":false}"#).expect("patch");
        let Json(updated) =
            update_rule(State(fixture.state), admin(), Path(id.to_string()), Ok(Json(patch)))
                .await
                .expect("update");

        assert_eq!(updated.priority, 50);
        assert!(!updated.is_active);
        assert_eq!(updated.match_ticket_type.as_deref(), Some("incident"));
    }

    #[tokio::test]
    async fn empty_patch_and_bad_ids_are_rejected() {
        let existing = rule("vip", 1);
        let id = existing.id;
        let fixture = fixture(vec![existing], None).await;

        let (status, Json(body)) = update_rule(
            State(fixture.state.clone()),
            admin(),
            Path(id.to_string()),
            Ok(Json(RoutingRulePatch::default())),
        )
        .await
        .expect_err("empty patch");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("at least one field"));

        let (status, _) = delete_rule(State(fixture.state), admin(), Path("not-a-uuid".to_string()))
            .await
            .expect_err("bad id");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_removes_rule_then_reports_not_found() {
        let existing = rule("vip", 1);
        let id = existing.id;
        let fixture = fixture(vec![existing], None).await;

        let status = delete_rule(State(fixture.state.clone()), admin(), Path(id.to_string()))
            .await
            .expect("delete");
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = delete_rule(State(fixture.state), admin(), Path(id.to_string()))
            .await
            .expect_err("already deleted");
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
