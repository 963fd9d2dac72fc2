use serde::{Deserialize, Serialize};

/// Identity attached to a record at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityStamp {
    pub anonymous_id: String,
    pub session_id: String,
    /// Present only once the host has called `identify`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}
