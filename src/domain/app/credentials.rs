use bcrypt::Version;
use std::fmt;

/// Administrator login for the application under test
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Salted bcrypt digest of the password in the `$2y$` flavour PHP's
    /// `password_verify` understands.
    pub fn password_digest(&self) -> Result<String, bcrypt::BcryptError> {
        let parts = bcrypt::hash_with_result(&self.password, bcrypt::DEFAULT_COST)?;
        Ok(parts.format_for_version(Version::TwoY))
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
