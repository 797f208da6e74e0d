use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use pdsdesk_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use pdsdesk_core::domain::operator::Operator;
use pdsdesk_core::errors::{ApplicationError, DomainError};
use pdsdesk_core::preferences::{PreferencesError, UserPreferences, WidgetPreference};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{application_error, authenticate, correlation_id, invalid_body, ApiError, ApiState};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplacePreferencesRequest {
    pub sidebar_order: Vec<String>,
    pub widgets: Vec<WidgetPreference>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSidebarItemRequest {
    pub item: String,
    pub to_index: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateWidgetRequest {
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub to_index: Option<usize>,
    /// Merged into the widget's existing settings.
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

pub async fn get_preferences(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<UserPreferences>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let actor = authenticate(&state, &headers, &correlation_id)?;

    load_or_default(&state, &actor, &correlation_id).await.map(Json)
}

/// Unknown keys are dropped and missing known keys appended, so a client
/// built against an older item list cannot lose items.
pub async fn replace_preferences(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<ReplacePreferencesRequest>, JsonRejection>,
) -> Result<Json<UserPreferences>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let actor = authenticate(&state, &headers, &correlation_id)?;
    let Json(request) = payload.map_err(|rejection| invalid_body(rejection, &correlation_id))?;

    let mut preferences = UserPreferences {
        user_id: actor.id.clone(),
        sidebar_order: request.sidebar_order,
        widgets: request.widgets,
        updated_at: Utc::now(),
    };
    preferences.normalize();

    save(&state, preferences, "replace", &correlation_id).await.map(Json)
}

pub async fn move_sidebar_item(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<MoveSidebarItemRequest>, JsonRejection>,
) -> Result<Json<UserPreferences>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let actor = authenticate(&state, &headers, &correlation_id)?;
    let Json(request) = payload.map_err(|rejection| invalid_body(rejection, &correlation_id))?;

    let mut preferences = load_or_default(&state, &actor, &correlation_id).await?;
    preferences
        .move_sidebar_item(&request.item, request.to_index)
        .map_err(|error| preferences_error(error, &correlation_id))?;

    save(&state, preferences, "sidebar_move", &correlation_id).await.map(Json)
}

pub async fn update_widget(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(widget_key): Path<String>,
    payload: Result<Json<UpdateWidgetRequest>, JsonRejection>,
) -> Result<Json<UserPreferences>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let actor = authenticate(&state, &headers, &correlation_id)?;
    let Json(request) = payload.map_err(|rejection| invalid_body(rejection, &correlation_id))?;

    let mut preferences = load_or_default(&state, &actor, &correlation_id).await?;
    apply_widget_update(&mut preferences, &widget_key, request)
        .map_err(|error| preferences_error(error, &correlation_id))?;

    save(&state, preferences, "widget_update", &correlation_id).await.map(Json)
}

fn apply_widget_update(
    preferences: &mut UserPreferences,
    widget_key: &str,
    request: UpdateWidgetRequest,
) -> Result<(), PreferencesError> {
    if !preferences.widgets.iter().any(|widget| widget.widget_key == widget_key) {
        return Err(PreferencesError::UnknownWidget(widget_key.to_string()));
    }
    if let Some(visible) = request.visible {
        preferences.set_widget_visibility(widget_key, visible)?;
    }
    if let Some(to_index) = request.to_index {
        preferences.move_widget(widget_key, to_index)?;
    }
    for (name, value) in request.settings {
        preferences.set_widget_setting(widget_key, name, value)?;
    }
    Ok(())
}

async fn load_or_default(
    state: &ApiState,
    actor: &Operator,
    correlation_id: &str,
) -> Result<UserPreferences, ApiError> {
    let stored = state.preferences.find(&actor.id).await.map_err(|error| {
        application_error(ApplicationError::Persistence(error.to_string()), correlation_id)
    })?;
    Ok(stored.unwrap_or_else(|| UserPreferences::default_for(actor.id.clone())))
}

async fn save(
    state: &ApiState,
    preferences: UserPreferences,
    change: &'static str,
    correlation_id: &str,
) -> Result<UserPreferences, ApiError> {
    state.preferences.save(preferences.clone()).await.map_err(|error| {
        application_error(ApplicationError::Persistence(error.to_string()), correlation_id)
    })?;

    info!(
        event_name = "preferences.updated",
        correlation_id = %correlation_id,
        user_id = %preferences.user_id.0,
        change,
        "user preferences saved"
    );
    state.audit.emit(
        AuditEvent::new(
            Some(preferences.user_id.0.clone()),
            correlation_id,
            "preferences.updated",
            AuditCategory::Preferences,
            preferences.user_id.0.clone(),
            AuditOutcome::Success,
        )
        .with_metadata("change", change),
    );
    Ok(preferences)
}

fn preferences_error(error: PreferencesError, correlation_id: &str) -> ApiError {
    application_error(DomainError::Preferences(error).into(), correlation_id)
}
