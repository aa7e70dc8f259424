use std::fmt;

/// A password as given with the PASS command. A newtype so that the value
/// never ends up in logs through a stray `{:?}`.
#[derive(PartialEq, Eq, Clone)]
pub struct Password(String);

impl Password {
    pub fn new<S: Into<String>>(password: S) -> Self {
        Password(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "********")
    }
}

impl From<&str> for Password {
    fn from(s: &str) -> Self {
        Password::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_the_value() {
        let password = Password::new("correct horse battery");
        assert_eq!(format!("{:?}", password), "********");
        assert_eq!(password.as_str(), "correct horse battery");
    }
}
