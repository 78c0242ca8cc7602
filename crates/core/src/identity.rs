//! Identity session contract
//!
//! Sign-in is handled by an external identity provider. The core only needs to
//! know who is acting and under what name.

use crate::error::{Error, Result};
use crate::models::{UserId, DEFAULT_DISPLAY_NAME};

pub trait IdentitySession {
    /// The signed-in user, if any
    fn current_user_id(&self) -> Option<UserId>;

    /// Name shown to other members
    fn current_display_name(&self) -> String;

    /// The signed-in user, or `Unauthorized`
    fn require_user(&self) -> Result<UserId> {
        self.current_user_id()
            .ok_or_else(|| Error::Unauthorized("no signed-in user".to_string()))
    }
}

/// Fixed identity, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user_id: Option<UserId>,
    display_name: Option<String>,
}

impl StaticIdentity {
    pub fn signed_in(user_id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            display_name: Some(display_name.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

impl IdentitySession for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id.clone()
    }

    fn current_display_name(&self) -> String {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => DEFAULT_DISPLAY_NAME.to_string(),
        }
    }
}
