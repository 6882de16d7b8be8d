use std::{path::PathBuf, time::Duration};

use aliri_introspection::{
    ClientCredentials, ClientId, ClientSecret, RemoteTokenValidator, TrustAnchors,
    ValidatorConfig,
};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
struct Opts {
    /// The authorization server's token introspection URL
    #[clap(long, env)]
    introspection_url: reqwest::Url,

    /// The authorization server's token revocation URL
    #[clap(long, env)]
    revocation_url: reqwest::Url,

    /// The client ID of this resource server
    #[clap(short, long, env)]
    client_id: ClientId,

    /// The client secret used to identify this resource server to the authorization server
    #[clap(short = 's', long, env, hide_env_values = true)]
    client_secret: ClientSecret,

    /// PEM file holding the certificate authorities trusted to identify the authorization server
    #[clap(short = 'a', long, env)]
    trust_anchors: PathBuf,

    /// Seconds to wait for the authorization server to respond
    #[clap(long, env, default_value_t = 10)]
    timeout_secs: u64,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Asks whether a token is active
    Validate {
        /// The token to check
        token: String,
    },
    /// Revokes a token
    Revoke {
        /// The token to revoke
        token: String,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let config = ValidatorConfig::new(
        opts.introspection_url,
        opts.revocation_url,
        ClientCredentials::new(opts.client_id, opts.client_secret),
        TrustAnchors::from_pem_file(&opts.trust_anchors)?,
    )
    .with_timeout(Duration::from_secs(opts.timeout_secs));

    let validator = RemoteTokenValidator::new(config)?;

    match opts.command {
        Command::Validate { token } => match validator.validate(&token).await? {
            Some(record) => tracing::info!(
                subject = %record.subject(),
                scope = record.scope(),
                client_id = record.client_id(),
                expiry = record.expiry().0,
                expired = record.is_expired(),
                "token is active"
            ),
            None => tracing::warn!("token is not active"),
        },
        Command::Revoke { token } => {
            validator.revoke(&token).await?;
            tracing::info!("revocation request sent");
        }
    }

    Ok(())
}
