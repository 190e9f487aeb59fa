//! Shared server configuration and state.

use secrecy::SecretString;

use crate::{bucket::Bucket, mailer::Mailer};

const DEFAULT_SESSION_TTL_SECONDS: i64 = 3 * 24 * 60 * 60;
const DEFAULT_MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, Debug)]
pub struct AppConfig {
    public_url: String,
    session_ttl_seconds: i64,
    min_password_len: usize,
}

impl AppConfig {
    #[must_use]
    pub fn new(public_url: String) -> Self {
        Self {
            public_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_min_password_len(mut self, len: usize) -> Self {
        self.min_password_len = len;
        self
    }

    /// Storefront base URL used in email links and verification redirects.
    #[must_use]
    pub fn public_url(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn min_password_len(&self) -> usize {
        self.min_password_len
    }
}

pub struct AppState {
    config: AppConfig,
    jwt_secret: SecretString,
    mailer: Mailer,
    bucket: Bucket,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, jwt_secret: SecretString, mailer: Mailer, bucket: Bucket) -> Self {
        Self {
            config,
            jwt_secret,
            mailer,
            bucket,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn jwt_secret(&self) -> &SecretString {
        &self.jwt_secret
    }

    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.mailer
    }

    #[must_use]
    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }
}
