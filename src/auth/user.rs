use std::fmt::{self, Debug, Display, Formatter};

/// The requirements for the user type that flows through the engine. Extra
/// details (home directory, quotas, account data) live on the implementing
/// type; the engine itself only needs to print and move it around.
pub trait UserDetail: Send + Sync + Debug + Display + 'static {}

/// A user without any details, used by [`AnonymousAuthenticator`].
///
/// [`AnonymousAuthenticator`]: super::AnonymousAuthenticator
#[derive(Debug, PartialEq, Eq)]
pub struct DefaultUser;

impl UserDetail for DefaultUser {}

impl Display for DefaultUser {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "anonymous")
    }
}
