use super::{AuthError, AuthOutcome, Authenticator, DefaultUser};

use async_trait::async_trait;

/// An authenticator that accepts any user name and password combination.
///
/// Useful for public download areas and for tests.
#[derive(Debug)]
pub struct AnonymousAuthenticator;

#[async_trait]
impl Authenticator<DefaultUser> for AnonymousAuthenticator {
    async fn check_pass(&self, _username: &str, _password: &str) -> Result<AuthOutcome<DefaultUser>, AuthError> {
        Ok(AuthOutcome::LoggedIn(DefaultUser))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_anything() {
        let authenticator = AnonymousAuthenticator;
        assert!(authenticator.check_user("bob").await.is_ok());
        match authenticator.check_pass("bob", "hunter2").await.unwrap() {
            AuthOutcome::LoggedIn(user) => assert_eq!(user, DefaultUser),
            AuthOutcome::AccountNeeded(_) => panic!("anonymous logins never need an account"),
        }
    }
}
