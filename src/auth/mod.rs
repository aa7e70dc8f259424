//! Contains the `Authenticator` trait that the engine consults during the
//! USER/PASS/ACCT login sequence, along with a ready-to-use anonymous
//! implementation.

mod anonymous;
mod user;

pub use anonymous::AnonymousAuthenticator;
pub use user::{DefaultUser, UserDetail};

use async_trait::async_trait;
use derive_more::Display;
use std::fmt::Debug;
use thiserror::Error;

/// The error type returned by an [`Authenticator`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("authentication error: {kind}")]
pub struct AuthError {
    kind: AuthErrorKind,
}

/// The ways a login attempt can be refused.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Display)]
pub enum AuthErrorKind {
    /// The user name is not known to the backend.
    #[display("unknown user")]
    BadUser,
    /// The password does not match.
    #[display("bad password")]
    BadPassword,
    /// The supplied account is not acceptable for this identity.
    #[display("bad account")]
    BadAccount,
    /// The backend itself failed.
    #[display("backend failure")]
    Internal,
}

impl AuthError {
    /// Creates a new error with the given kind.
    pub fn new(kind: AuthErrorKind) -> Self {
        AuthError { kind }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }
}

impl From<AuthErrorKind> for AuthError {
    fn from(kind: AuthErrorKind) -> Self {
        AuthError { kind }
    }
}

/// What a successful PASS check resolved to.
#[derive(Debug)]
pub enum AuthOutcome<User> {
    /// The identity is fully established; the session may proceed.
    LoggedIn(User),
    /// The password checked out but the backend wants an ACCT as well
    /// (rendered as reply 332 on the control channel).
    AccountNeeded(User),
}

/// Backend that decides whether a control connection may log in.
///
/// The engine calls `check_user` on USER, `check_pass` on PASS and, when
/// `check_pass` answered [`AuthOutcome::AccountNeeded`], `check_acct` on
/// ACCT.
#[async_trait]
pub trait Authenticator<User: Send + 'static>: Send + Sync + Debug {
    /// Called when the client issues USER. Most backends accept any name
    /// here and defer the verdict to `check_pass`.
    async fn check_user(&self, _username: &str) -> Result<(), AuthError> {
        Ok(())
    }

    /// Verify the password for the given user name.
    async fn check_pass(&self, username: &str, password: &str) -> Result<AuthOutcome<User>, AuthError>;

    /// Verify the account string for an identity that required one.
    async fn check_acct(&self, _user: User, _account: &str) -> Result<User, AuthError> {
        Err(AuthErrorKind::BadAccount.into())
    }
}
