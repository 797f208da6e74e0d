//! Per-user UI preferences: sidebar quick-access order and dashboard widget
//! layout. One record per user, loaded once per session and passed to the
//! views that need it.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::operator::OperatorId;

pub const DEFAULT_SIDEBAR_ORDER: &[&str] = &[
    "tickets",
    "changes",
    "problems",
    "knowledge_base",
    "dashboards",
    "task_boards",
    "settings",
];

pub const DEFAULT_WIDGETS: &[&str] = &["open_tickets", "my_queue", "sla_breaches", "recent_changes"];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PreferencesError {
    #[error("unknown sidebar item `{0}`")]
    UnknownSidebarItem(String),
    #[error("unknown dashboard widget `{0}`")]
    UnknownWidget(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidgetPreference {
    pub widget_key: String,
    pub visible: bool,
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl WidgetPreference {
    fn visible(widget_key: &str) -> Self {
        Self { widget_key: widget_key.to_string(), visible: true, settings: BTreeMap::new() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: OperatorId,
    pub sidebar_order: Vec<String>,
    pub widgets: Vec<WidgetPreference>,
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    pub fn default_for(user_id: OperatorId) -> Self {
        Self {
            user_id,
            sidebar_order: DEFAULT_SIDEBAR_ORDER.iter().map(ToString::to_string).collect(),
            widgets: DEFAULT_WIDGETS.iter().map(|key| WidgetPreference::visible(key)).collect(),
            updated_at: Utc::now(),
        }
    }

    /// Moves `item` so that it ends up at `to_index`; indexes past the end
    /// move it to the end.
    pub fn move_sidebar_item(&mut self, item: &str, to_index: usize) -> Result<(), PreferencesError> {
        let from = self
            .sidebar_order
            .iter()
            .position(|existing| existing == item)
            .ok_or_else(|| PreferencesError::UnknownSidebarItem(item.to_string()))?;
        move_within(&mut self.sidebar_order, from, to_index);
        self.touch();
        Ok(())
    }

    pub fn move_widget(&mut self, widget_key: &str, to_index: usize) -> Result<(), PreferencesError> {
        let from = self.widget_position(widget_key)?;
        move_within(&mut self.widgets, from, to_index);
        self.touch();
        Ok(())
    }

    pub fn set_widget_visibility(
        &mut self,
        widget_key: &str,
        visible: bool,
    ) -> Result<(), PreferencesError> {
        let index = self.widget_position(widget_key)?;
        self.widgets[index].visible = visible;
        self.touch();
        Ok(())
    }

    pub fn set_widget_setting(
        &mut self,
        widget_key: &str,
        name: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), PreferencesError> {
        let index = self.widget_position(widget_key)?;
        self.widgets[index].settings.insert(name.into(), value);
        self.touch();
        Ok(())
    }

    pub fn visible_widgets(&self) -> impl Iterator<Item = &WidgetPreference> {
        self.widgets.iter().filter(|widget| widget.visible)
    }

    /// Drops unknown and duplicate keys, then appends any known key that is
    /// missing, in default order. Every known key appears exactly once after.
    pub fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.sidebar_order.retain(|item| {
            DEFAULT_SIDEBAR_ORDER.contains(&item.as_str()) && seen.insert(item.clone())
        });
        for item in DEFAULT_SIDEBAR_ORDER {
            if !seen.contains(*item) {
                self.sidebar_order.push((*item).to_string());
            }
        }

        let mut seen = HashSet::new();
        self.widgets.retain(|widget| {
            DEFAULT_WIDGETS.contains(&widget.widget_key.as_str())
                && seen.insert(widget.widget_key.clone())
        });
        for key in DEFAULT_WIDGETS {
            if !seen.contains(*key) {
                self.widgets.push(WidgetPreference::visible(key));
            }
        }
    }

    fn widget_position(&self, widget_key: &str) -> Result<usize, PreferencesError> {
        self.widgets
            .iter()
            .position(|widget| widget.widget_key == widget_key)
            .ok_or_else(|| PreferencesError::UnknownWidget(widget_key.to_string()))
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn move_within<T>(items: &mut Vec<T>, from: usize, to_index: usize) {
    let item = items.remove(from);
    let to_index = to_index.min(items.len());
    items.insert(to_index, item);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{PreferencesError, UserPreferences, DEFAULT_SIDEBAR_ORDER, DEFAULT_WIDGETS};
    use crate::domain::operator::OperatorId;

    fn prefs() -> UserPreferences {
        UserPreferences::default_for(OperatorId("u-1".to_string()))
    }

    #[test]
    fn moving_sidebar_item_keeps_every_item_once() {
        let mut prefs = prefs();
        prefs.move_sidebar_item("settings", 0).expect("move");

        assert_eq!(prefs.sidebar_order[0], "settings");
        assert_eq!(prefs.sidebar_order[1], "tickets");
        assert_eq!(prefs.sidebar_order.len(), DEFAULT_SIDEBAR_ORDER.len());

        prefs.move_sidebar_item("settings", 99).expect("move to end");
        assert_eq!(prefs.sidebar_order.last().map(String::as_str), Some("settings"));
    }

    #[test]
    fn unknown_items_are_rejected() {
        let mut prefs = prefs();
        assert_eq!(
            prefs.move_sidebar_item("billing", 0),
            Err(PreferencesError::UnknownSidebarItem("billing".to_string()))
        );
        assert!(matches!(
            prefs.set_widget_visibility("weather", false),
            Err(PreferencesError::UnknownWidget(_))
        ));
    }

    #[test]
    fn widgets_can_be_hidden_reordered_and_configured() {
        let mut prefs = prefs();
        prefs.set_widget_visibility("sla_breaches", false).expect("hide");
        prefs.move_widget("recent_changes", 0).expect("move");
        prefs.set_widget_setting("my_queue", "page_size", json!(25)).expect("setting");

        let visible: Vec<&str> =
            prefs.visible_widgets().map(|widget| widget.widget_key.as_str()).collect();
        assert_eq!(visible, vec!["recent_changes", "open_tickets", "my_queue"]);
        assert_eq!(prefs.widgets[2].settings.get("page_size"), Some(&json!(25)));
    }

    #[test]
    fn normalize_drops_unknown_and_duplicates_and_restores_missing() {
        let mut prefs = prefs();
        prefs.sidebar_order = vec![
            "dashboards".to_string(),
            "legacy_reports".to_string(),
            "dashboards".to_string(),
            "tickets".to_string(),
        ];
        prefs.widgets.truncate(1);
        prefs.widgets.push(prefs.widgets[0].clone());

        prefs.normalize();

        assert_eq!(&prefs.sidebar_order[..2], &["dashboards".to_string(), "tickets".to_string()]);
        assert_eq!(prefs.sidebar_order.len(), DEFAULT_SIDEBAR_ORDER.len());
        assert!(!prefs.sidebar_order.iter().any(|item| item == "legacy_reports"));
        let widget_keys: Vec<&str> =
            prefs.widgets.iter().map(|widget| widget.widget_key.as_str()).collect();
        assert_eq!(widget_keys, DEFAULT_WIDGETS.to_vec());
    }
}
