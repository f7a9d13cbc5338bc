use std::fmt;

/// Username/password pair handed to the store
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Plain-text authentication provider passed to the client at construction.
///
/// The client always receives one of these. Without credentials both fields
/// are empty and the cluster's default authenticator decides whether the
/// session is allowed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PlainTextAuthProvider {
    username: Option<String>,
    password: Option<String>,
}

impl PlainTextAuthProvider {
    pub fn new(credentials: Option<&Credentials>) -> Self {
        match credentials {
            Some(c) => Self {
                username: Some(c.username.clone()),
                password: Some(c.password.clone()),
            },
            None => Self::default(),
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// True when no credentials will be presented
    pub fn is_anonymous(&self) -> bool {
        self.username.is_none() || self.password.is_none()
    }
}

impl fmt::Debug for PlainTextAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainTextAuthProvider")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}
