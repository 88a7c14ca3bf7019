//! Authentication state, as reported by an [`IdentityService`]

use crate::error::Error;
use crate::identity::Identity;
use crate::traits::{AuthStateReceiver, IdentityService};

/// The current authentication state
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    identity: Option<Identity>,
    /// True until the identity service has told us who is signed in (if anyone)
    loading: bool,
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> { self.identity.as_ref() }
    pub fn is_loading(&self) -> bool            { self.loading }
    pub fn is_signed_in(&self) -> bool          { self.identity.is_some() }
}

impl Default for Session {
    fn default() -> Self {
        Self { identity: None, loading: true }
    }
}


/// What an auth-state notification did to the session
#[derive(Clone, Debug, PartialEq)]
pub enum AuthTransition {
    SignedIn(Identity),
    SignedOut,
}


/// Keeps a [`Session`] in line with the auth-state notifications of an [`IdentityService`].
///
/// Signing up or signing in only talks to the service: the session itself changes when the
/// matching notification is applied. Signing out is the exception, it clears the session at once.
pub struct SessionManager<I: IdentityService> {
    service: I,
    receiver: AuthStateReceiver,
    session: Session,
}

impl<I: IdentityService> SessionManager<I> {
    /// Create a manager. This subscribes to the notifications of `service` right away
    pub fn new(service: I) -> Self {
        let receiver = service.subscribe();
        Self { service, receiver, session: Session::default() }
    }

    pub fn session(&self) -> &Session { &self.session }
    pub fn service(&self) -> &I { &self.service }

    /// Apply an auth-state notification
    pub fn apply(&mut self, identity: Option<Identity>) -> AuthTransition {
        self.session.loading = false;
        self.session.identity = identity.clone();
        match identity {
            Some(identity) => {
                log::info!("Signed in as {} ({})", identity.email(), identity.uid());
                AuthTransition::SignedIn(identity)
            },
            None => {
                log::info!("Signed out");
                AuthTransition::SignedOut
            },
        }
    }

    /// Wait for the next notification and apply it.
    ///
    /// Returns `None` in case the identity service has dropped its end of the channel
    pub async fn wait_for_auth_state(&mut self) -> Option<AuthTransition> {
        let identity = self.receiver.recv().await?;
        Some(self.apply(identity))
    }

    /// Apply every notification that has already arrived, without waiting
    pub fn pending_auth_states(&mut self) -> Vec<AuthTransition> {
        let mut transitions = Vec::new();
        while let Ok(identity) = self.receiver.try_recv() {
            transitions.push(self.apply(identity));
        }
        transitions
    }

    pub async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<Identity, Error> {
        log::debug!("Creating an account for {}", email);
        let identity = self.service.create_account_with_password(email, password).await?;
        Ok(identity)
    }

    pub async fn sign_in_with_federated_provider(&self) -> Result<Identity, Error> {
        let identity = self.service.sign_in_with_federated_popup().await?;
        Ok(identity)
    }

    /// Sign out. The session is signed out afterwards, even if the service reported an error
    pub async fn sign_out(&mut self) -> Result<(), Error> {
        let result = self.service.sign_out().await;
        self.session.loading = false;
        self.session.identity = None;
        result.map_err(Error::from)
    }
}
