use crate::{
    api::{self, state::AppConfig, state::AppState},
    bucket::Bucket,
    mailer::Mailer,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub public_url: String,
    pub storage_url: String,
    pub storage_key: SecretString,
    pub storage_bucket: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub smtp_from: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a collaborator cannot be constructed or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        port = args.port,
        bucket = %args.storage_bucket,
        smtp = %args.smtp_host,
        "starting server"
    );

    let mailer = Mailer::new(
        &args.smtp_host,
        args.smtp_port,
        args.smtp_username.clone(),
        args.smtp_password.clone(),
        args.smtp_from.clone(),
    )
    .context("Could not build SMTP transport")?;

    let bucket = Bucket::new(
        &args.storage_url,
        args.storage_key.clone(),
        args.storage_bucket.clone(),
    )
    .context("Could not build object storage client")?;

    let config = AppConfig::new(args.public_url.clone());
    let state = AppState::new(config, args.jwt_secret.clone(), mailer, bucket);

    api::new(args.port, args.dsn.clone(), state).await
}
