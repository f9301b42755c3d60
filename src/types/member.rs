//! Team member records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location used when the member table carries no location column.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Permission level of a member.
///
/// Only `admin` and `user` are recognized; anything else in the workbook
/// normalizes to [`Authority::User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    /// Can see the admin cohort view.
    Admin,
    /// Regular member.
    #[default]
    User,
}

impl Authority {
    /// Parses a raw authority cell against the whitelist.
    ///
    /// # Examples
    ///
    /// ```
    /// use limit_pacer::Authority;
    ///
    /// assert_eq!(Authority::from_cell(" ADMIN "), Authority::Admin);
    /// assert_eq!(Authority::from_cell("owner"), Authority::User);
    /// assert_eq!(Authority::from_cell(""), Authority::User);
    /// ```
    pub fn from_cell(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

/// A row of the member table.
///
/// `id` is the join key used by task completion lists. It comes straight from
/// the id column, so the same workbook row always yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member number, unique within the table.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Organizational group.
    pub group: String,
    /// Role code (`SM`, `Mgr`, `AM`, `L`, `AL`, `T`, `H`, `BP`, ...).
    pub role: String,
    /// Sign-in address, lowercased.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Permission level.
    #[serde(default)]
    pub authority: Authority,
    /// Optional team inside the group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    /// Work location.
    pub location: String,
}

impl Member {
    /// Creates a member with the required fields; the rest take defaults.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        group: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group: group.into(),
            role: role.into(),
            email: None,
            authority: Authority::User,
            team: None,
            location: UNKNOWN_LOCATION.to_string(),
        }
    }

    /// Sets the sign-in address (stored lowercased).
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into().trim().to_lowercase());
        self
    }

    /// Sets the permission level.
    pub fn with_authority(mut self, authority: Authority) -> Self {
        self.authority = authority;
        self
    }

    /// Sets the team.
    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    /// Sets the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Returns `true` if this member can open the admin view.
    pub fn is_admin(&self) -> bool {
        self.authority == Authority::Admin
    }

    /// Case-insensitive match against a signed-in username.
    pub fn matches_username(&self, username: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|email| email == username.trim().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_match_ignores_case() {
        let member = Member::new("2", "Suzuki", "Sales", "T").with_email("Suzuki@Example.com");
        assert_eq!(member.email.as_deref(), Some("suzuki@example.com"));
        assert!(member.matches_username("SUZUKI@example.COM"));
        assert!(!member.matches_username("sato@example.com"));
    }

    #[test]
    fn member_without_email_never_matches() {
        let member = Member::new("1", "Yamada", "Dev", "L");
        assert!(!member.matches_username(""));
        assert_eq!(member.location, UNKNOWN_LOCATION);
        assert!(!member.is_admin());
    }

    #[test]
    fn authority_serializes_lowercase() {
        let member = Member::new("1", "Yamada", "Dev", "L").with_authority(Authority::Admin);
        let json = serde_json::to_value(&member).unwrap();
        assert_eq!(json["authority"], "admin");
        assert!(json.get("email").is_none());
    }
}
