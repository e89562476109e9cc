//! Typed records for identity, role metadata and the task roster.

use serde::{Deserialize, Serialize};

/// Identity fields as returned by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
}

impl ProviderProfile {
    /// Addresses a roster entry may be keyed by, principal name first.
    fn addresses(&self) -> impl Iterator<Item = &str> {
        self.user_principal_name
            .as_deref()
            .into_iter()
            .chain(self.mail.as_deref())
            .filter(|address| !address.trim().is_empty())
    }
}

/// Role metadata served by the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMetadata {
    pub role: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// One row of the task roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RosterEntry {
    pub email: String,
    #[serde(default)]
    pub role: Vec<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub approvers: Vec<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// The signed-in user: provider identity plus roster-derived attributes.
///
/// Roster fields stay empty when no roster entry matched or the roster
/// could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
    pub mail: Option<String>,
    pub role: Vec<String>,
    pub team: Option<String>,
    pub approvers: Vec<String>,
    pub active: Option<bool>,
}

impl Profile {
    /// Profile carrying only the provider fields.
    pub fn minimal(provider: ProviderProfile) -> Self {
        Self {
            id: provider.id,
            display_name: provider.display_name,
            user_principal_name: provider.user_principal_name,
            mail: provider.mail,
            role: Vec::new(),
            team: None,
            approvers: Vec::new(),
            active: None,
        }
    }

    /// The provider fields this profile was built from.
    pub fn provider(&self) -> ProviderProfile {
        ProviderProfile {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            user_principal_name: self.user_principal_name.clone(),
            mail: self.mail.clone(),
        }
    }

    /// Whether roster attributes were merged in.
    pub fn has_roster_attributes(&self) -> bool {
        !self.role.is_empty()
            || self.team.is_some()
            || !self.approvers.is_empty()
            || self.active.is_some()
    }

    fn apply(mut self, entry: &RosterEntry) -> Self {
        self.role = entry.role.clone();
        self.team = entry.team.clone();
        self.approvers = entry.approvers.clone();
        self.active = entry.active;
        self
    }
}

/// First roster entry whose email equals one of the profile's addresses,
/// ignoring case.
pub fn find_roster_entry<'a>(
    provider: &ProviderProfile,
    roster: &'a [RosterEntry],
) -> Option<&'a RosterEntry> {
    let addresses: Vec<String> = provider
        .addresses()
        .map(|address| address.trim().to_lowercase())
        .collect();
    if addresses.is_empty() {
        return None;
    }

    roster.iter().find(|entry| {
        let email = entry.email.trim().to_lowercase();
        addresses.iter().any(|address| *address == email)
    })
}

/// Merge provider identity with the matching roster entry.
///
/// No roster, or no match, yields [`Profile::minimal`].
pub fn merge_profile(provider: ProviderProfile, roster: Option<&[RosterEntry]>) -> Profile {
    let entry = roster.and_then(|entries| find_roster_entry(&provider, entries));
    match entry {
        Some(entry) => Profile::minimal(provider).apply(entry),
        None => Profile::minimal(provider),
    }
}
