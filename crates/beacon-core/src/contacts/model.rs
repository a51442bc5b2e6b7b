//! Emergency contact model.

use uuid::Uuid;

/// A person to reach in an emergency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyContact {
    /// Locally generated identifier.
    pub id: String,
    /// Contact name.
    pub name: String,
    /// Phone number, stored as entered.
    pub phone: String,
    /// Relationship to the user (may be empty).
    pub relation: Option<String>,
}

impl EmergencyContact {
    /// Creates a new contact with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            phone: phone.into(),
            relation: None,
        }
    }

    /// Sets the relationship description.
    #[must_use]
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// Returns a display string for the contact.
    ///
    /// If a relation is present, returns "Name (relation)", otherwise just
    /// the name.
    #[must_use]
    pub fn display(&self) -> String {
        match &self.relation {
            Some(relation) if !relation.is_empty() => format!("{} ({relation})", self.name),
            _ => self.name.clone(),
        }
    }
}
