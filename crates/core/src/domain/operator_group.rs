use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperatorGroupId(pub Uuid);

impl OperatorGroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperatorGroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OperatorGroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A named team that tickets can be routed to (a queue).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorGroup {
    pub id: OperatorGroupId,
    pub group_key: String,
    pub name: String,
    pub is_active: bool,
}
