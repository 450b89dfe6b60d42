//! Signed-in user model

use serde::{Deserialize, Serialize};

/// The authenticated user as reported by the identity provider.
///
/// Replaced wholesale on login/logout, never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider-assigned identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Account email
    pub email: String,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl User {
    /// Name to show in the UI, falling back to the email address
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}
