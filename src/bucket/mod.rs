//! Object-storage client for proof images.
//!
//! Talks to a Supabase-style storage API: objects are uploaded under a
//! bucket and served back through the public object URL. Keys are
//! generated here so two uploads of the same filename never collide.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

/// Build an object key from the uploaded filename, keeping only its
/// extension. The millisecond prefix keeps listings roughly chronological.
#[must_use]
pub fn object_key(filename: &str) -> String {
    let ext = filename
        .rsplit_once('.')
        .map(|(stem, ext)| (stem, ext.to_ascii_lowercase()))
        .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
        .map_or_else(|| "bin".to_string(), |(_, ext)| ext);

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis());

    format!("{millis}-{}.{ext}", Uuid::new_v4())
}

#[derive(Debug, Clone)]
pub struct Bucket {
    base_url: String,
    key: SecretString,
    bucket: String,
    client: Client,
}

impl Bucket {
    /// Build a client for one bucket.
    ///
    /// # Errors
    /// Returns an error when the base URL does not parse or the HTTP
    /// client cannot be constructed.
    pub fn new(base_url: &str, key: SecretString, bucket: String) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).context("Invalid object storage URL")?;

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Failed to build object storage client")?;

        Ok(Self {
            base_url,
            key,
            bucket,
            client,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{key}", self.base_url, self.bucket)
    }

    /// URL the stored object is publicly served from.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{key}",
            self.base_url, self.bucket
        )
    }

    /// Upload an object. The key must be fresh, uploads never overwrite.
    #[instrument(skip(self, bytes))]
    pub async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let url = self.object_url(key);

        debug!("uploading {} bytes to {url}", bytes.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .context("Object upload request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("object upload failed: {status}, {body}"));
        }

        Ok(())
    }

    /// Delete an object, used to undo an upload whose record never landed.
    #[instrument(skip(self))]
    pub async fn delete_object(&self, key: &str) -> Result<()> {
        let url = self.object_url(key);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(self.key.expose_secret())
            .send()
            .await
            .context("Object delete request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("object delete failed: {status}"));
        }

        Ok(())
    }
}
