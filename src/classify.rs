use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Permission id Drive assigns to the "anyone with the link" grant.
pub const ANYONE_WITH_LINK_ID: &str = "anyoneWithLink";

/// One permission entry as returned by the permissions API, kept as an open map.
pub type PermissionEntry = Map<String, Value>;

/// Access level granted to anyone holding the link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LinkRole {
    #[default]
    None,
    Reader,
    Commenter,
    Writer,
    FileOrganizer,
    Organizer,
    Owner,
    Other(String),
}

impl LinkRole {
    pub fn from_api(role: &str) -> Self {
        match role {
            "" => LinkRole::None,
            "reader" => LinkRole::Reader,
            "commenter" => LinkRole::Commenter,
            "writer" => LinkRole::Writer,
            "fileOrganizer" => LinkRole::FileOrganizer,
            "organizer" => LinkRole::Organizer,
            "owner" => LinkRole::Owner,
            other => LinkRole::Other(other.to_string()),
        }
    }

    /// The API spelling, empty for `None`.
    pub fn as_str(&self) -> &str {
        match self {
            LinkRole::None => "",
            LinkRole::Reader => "reader",
            LinkRole::Commenter => "commenter",
            LinkRole::Writer => "writer",
            LinkRole::FileOrganizer => "fileOrganizer",
            LinkRole::Organizer => "organizer",
            LinkRole::Owner => "owner",
            LinkRole::Other(role) => role,
        }
    }

    pub fn is_shared(&self) -> bool {
        !self.as_str().is_empty()
    }
}

impl Serialize for LinkRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role granted to the anyone-with-link identity, or `""` when there is no such grant.
///
/// The first matching entry wins. Entries whose `id` is not a string never match, and a
/// matching entry without a string `role` yields `""`.
pub fn anyone_with_link_role(permissions: &[PermissionEntry]) -> String {
    permissions
        .iter()
        .find(|perm| perm.get("id").and_then(Value::as_str) == Some(ANYONE_WITH_LINK_ID))
        .and_then(|perm| perm.get("role").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

pub fn classify(permissions: &[PermissionEntry]) -> LinkRole {
    LinkRole::from_api(&anyone_with_link_role(permissions))
}
