//! Project domain model.
//!
//! Inverse side of the employee/project association: link changes are always
//! issued from the employee side.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Store-assigned project identifier.
pub type ProjectId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Option<ProjectId>,
    pub name: String,
    pub description: Option<String>,
    /// Free-form lifecycle label, e.g. `ACTIU` or `PLANIFICAT`.
    pub status: Option<String>,
}

impl Project {
    /// Creates a transient project.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: Some(description.into()),
            status: Some(status.into()),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn business_key(&self) -> &str {
        self.name.as_str()
    }

    pub fn same_fields(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.description == other.description
            && self.status == other.status
    }
}

impl PartialEq for Project {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(left), Some(right)) => left == right,
            (None, None) => self.business_key() == other.business_key(),
            _ => false,
        }
    }
}

impl Eq for Project {}

impl Hash for Project {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.business_key().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::Project;

    #[test]
    fn transient_projects_compare_by_name() {
        let a = Project::new("Web", "desc", "ACTIU");
        let b = Project::new("Web", "other", "PLANIFICAT");
        assert_eq!(a, b);
    }

    #[test]
    fn persisted_projects_compare_by_id() {
        let mut loaded = Project::new("Intranet", "Portal intern", "PLANIFICAT");
        loaded.id = Some(3);
        let mut renamed = loaded.clone();
        renamed.name = "Intranet 2".to_string();
        assert_eq!(loaded, renamed);
        assert_ne!(loaded, Project::new("Intranet", "Portal intern", "PLANIFICAT"));
    }
}
