use serde::{Deserialize, Serialize};

/// A member of the project team roster. The roster is supplied by the host
/// application and is never mutated by the engine; the acting user of every
/// lifecycle call is also represented as a `TeamMember`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub role: String,
    pub avatar: String,
}

impl TeamMember {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
        avatar: impl Into<String>,
    ) -> Self {
        Self { id: id.into(), name: name.into(), role: role.into(), avatar: avatar.into() }
    }
}
