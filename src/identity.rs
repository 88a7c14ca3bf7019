//! Authenticated end-users

use serde::{Deserialize, Serialize};

/// An authenticated end-user
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Unique id, used as the owner of every task this user creates
    uid: String,
    email: String,
}

impl Identity {
    pub fn new<S: ToString, T: ToString>(uid: S, email: T) -> Self {
        Self { uid: uid.to_string(), email: email.to_string() }
    }

    pub fn uid(&self) -> &str   { &self.uid   }
    pub fn email(&self) -> &str { &self.email }
}
