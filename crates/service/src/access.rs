//! Identity to role mapping.
//!
//! The identity provider hands the service either nothing or a verified
//! `{email, name, avatar_url}` tuple; the gate turns that into one of three
//! roles using the configured admin address.

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// A verified identity supplied by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn new(email: impl Into<String>, name: impl Into<String>, avatar_url: Option<String>) -> Self {
        Self { email: email.into(), name: name.into(), avatar_url }
    }

    /// Email used as the voting and ownership key.
    pub fn key(&self) -> String {
        normalize_email(&self.email)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Anonymous,
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Authorization gate holding the single admin identity.
#[derive(Debug, Clone)]
pub struct AccessGate {
    admin_email: String,
}

impl AccessGate {
    pub fn new(admin_email: impl AsRef<str>) -> Self {
        Self { admin_email: normalize_email(admin_email.as_ref()) }
    }

    pub fn role_of(&self, caller: Option<&Identity>) -> Role {
        match caller {
            None => Role::Anonymous,
            Some(id) if !self.admin_email.is_empty() && id.key() == self.admin_email => Role::Admin,
            Some(_) => Role::User,
        }
    }

    /// Any verified identity; `Unauthenticated` otherwise.
    pub fn require_user<'a>(&self, caller: Option<&'a Identity>) -> Result<&'a Identity, ServiceError> {
        caller.ok_or(ServiceError::Unauthenticated)
    }

    /// The admin identity; `Unauthenticated` without identity, `Unauthorized` for anyone else.
    pub fn require_admin<'a>(&self, caller: Option<&'a Identity>) -> Result<&'a Identity, ServiceError> {
        let id = self.require_user(caller)?;
        match self.role_of(Some(id)) {
            Role::Admin => Ok(id),
            _ => Err(ServiceError::Unauthorized),
        }
    }
}
