use serde::{Deserialize, Serialize};

/// Static description of a registered module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub module: String,
    pub label: String,
    pub icon: String,
    pub owner_field: String,
}

impl ModuleDescriptor {
    pub fn new(
        module: impl Into<String>,
        label: impl Into<String>,
        icon: impl Into<String>,
        owner_field: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            label: label.into(),
            icon: icon.into(),
            owner_field: owner_field.into(),
        }
    }
}

/// One record owned by the queried user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCategory {
    pub module: String,
    pub label: String,
    pub icon: String,
    pub owner_field: String,
    pub count: usize,
    pub can_reassign: bool,
    pub items: Vec<DependencyItem>,
}

/// Everything a user owns across registered modules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDependencies {
    pub user_id: String,
    pub user_name: String,
    pub total_count: usize,
    pub has_items: bool,
    pub categories: Vec<DependencyCategory>,
}

impl UserDependencies {
    pub fn summary(&self) -> String {
        super::summarize(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentCount {
    pub module: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentFailure {
    pub module: String,
    pub item_id: String,
    pub error: String,
}

/// Result of a reassignment batch; `reassigned` only lists modules with at
/// least one successful reassignment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignReport {
    pub reassigned: Vec<ReassignmentCount>,
    pub failures: Vec<ReassignmentFailure>,
}

impl ReassignReport {
    pub fn total(&self) -> usize {
        self.reassigned.iter().map(|r| r.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Registered(String),
    Unregistered(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
