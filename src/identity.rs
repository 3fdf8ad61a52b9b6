use rand::RngCore;
use std::fmt;
use tracing::{debug, warn};

use crate::storage::{self, keys, LocalStore};

/// Length of an anonymous token: 128 random bits as lowercase hex.
pub const ANONYMOUS_ID_LEN: usize = 32;

/// Who the current session belongs to. Exactly one kind is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Email(String),
    Anonymous(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Email,
    Anonymous,
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKind::Email => write!(f, "email"),
            IdentityKind::Anonymous => write!(f, "anonymous"),
        }
    }
}

impl Identity {
    /// Key used for persisted per-user records.
    pub fn user_id(&self) -> &str {
        match self {
            Identity::Email(id) | Identity::Anonymous(id) => id,
        }
    }

    pub fn kind(&self) -> IdentityKind {
        match self {
            Identity::Email(_) => IdentityKind::Email,
            Identity::Anonymous(_) => IdentityKind::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.kind() == IdentityKind::Email
    }
}

pub fn generate_anonymous_id() -> String {
    let mut bytes = [0u8; ANONYMOUS_ID_LEN / 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn is_valid_anonymous_id(token: &str) -> bool {
    token.len() == ANONYMOUS_ID_LEN
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Picks the authenticated e-mail when a session supplies one; otherwise reuses
/// the cached anonymous token, minting and caching a new one if it is absent or corrupt.
pub fn resolve(session_email: Option<&str>, store: &dyn LocalStore) -> Identity {
    if let Some(email) = session_email.map(str::trim).filter(|e| !e.is_empty()) {
        return Identity::Email(email.to_string());
    }

    let cached: Option<String> = storage::read_json(store, keys::ANONYMOUS_ID);
    let token = match cached {
        Some(token) if is_valid_anonymous_id(&token) => token,
        Some(_) => {
            warn!("cached anonymous id is malformed, issuing a new one");
            generate_anonymous_id()
        }
        None => {
            debug!("no cached anonymous id, issuing a new one");
            generate_anonymous_id()
        }
    };

    if let Err(e) = storage::write_json(store, keys::ANONYMOUS_ID, &token) {
        warn!(error = %e, "failed to cache anonymous id");
    }
    Identity::Anonymous(token)
}
