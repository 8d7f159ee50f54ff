// Request signing - attaches Basic credentials to backend requests
use crate::application::instrument_backend::BackendError;
use reqwest::RequestBuilder;

#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestSigner {
    credentials: Option<Credentials>,
}

impl RequestSigner {
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self { credentials }
    }

    pub fn sign(&self, request: RequestBuilder) -> Result<RequestBuilder, BackendError> {
        match &self.credentials {
            Some(credentials) if credentials.is_complete() => {
                Ok(request.basic_auth(&credentials.username, Some(&credentials.password)))
            }
            _ => Err(BackendError::Unauthenticated),
        }
    }
}
