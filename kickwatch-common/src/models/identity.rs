// File: kickwatch-common/src/models/identity.rs

use std::fmt;
use serde::{Deserialize, Serialize};

/// Who the follow list belongs to. Decides which follow store backs the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IdentityContext {
    #[default]
    None,
    Anonymous,
    Authenticated {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

impl IdentityContext {
    pub fn is_none(&self) -> bool {
        matches!(self, IdentityContext::None)
    }
}

impl fmt::Display for IdentityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityContext::None => write!(f, "none"),
            IdentityContext::Anonymous => write!(f, "anonymous"),
            IdentityContext::Authenticated { user_id } => write!(f, "user:{}", user_id),
        }
    }
}
