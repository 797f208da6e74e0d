use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Opaque user id issued by the authentication provider.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperatorId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewRules,
    ManageRules,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewRules => "view_rules",
            Self::ManageRules => "manage_rules",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorRole {
    Admin,
    Operator,
}

impl OperatorRole {
    pub fn capabilities(&self) -> BTreeSet<Capability> {
        match self {
            Self::Admin => [Capability::ViewRules, Capability::ManageRules].into_iter().collect(),
            Self::Operator => [Capability::ViewRules].into_iter().collect(),
        }
    }
}

impl std::str::FromStr for OperatorRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Ok(Self::Admin),
            "operator" | "agent" => Ok(Self::Operator),
            other => Err(format!("unsupported operator role `{other}` (expected admin|operator)")),
        }
    }
}

/// An authenticated service-desk user acting on the system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: OperatorId,
    pub display_name: String,
    pub capabilities: BTreeSet<Capability>,
}

impl Operator {
    pub fn with_role(id: impl Into<String>, role: OperatorRole) -> Self {
        let id = id.into();
        Self { display_name: id.clone(), id: OperatorId(id), capabilities: role.capabilities() }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
