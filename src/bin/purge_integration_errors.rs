//! Delete Integration Error records older than four months.
//!
//! Prompts for the org login on stdin, then purges in passes until no aged
//! records remain.
//!
//! ```sh
//! RUST_LOG=debug cargo run --bin purge-integration-errors
//! ```

use std::io::{self, BufRead, Write};

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use tally_sf::auth::{LoginConfig, PasswordLogin};
use tally_sf::runs::{purge_aged_errors, PurgeConfig, Session};

fn prompt(input: &mut impl BufRead, label: &str) -> anyhow::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .with_context(|| format!("reading {label}"))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let login_config = {
        let mut stdin = io::stdin().lock();
        let username = prompt(&mut stdin, "username")?;
        let password = prompt(&mut stdin, "password")?;
        let security_token = prompt(&mut stdin, "security_token")?;
        let domain = prompt(&mut stdin, "domain")?;
        LoginConfig::new(username, password, security_token, domain)
    };

    let session = Session::login(&PasswordLogin::new()?, &login_config)
        .await
        .context("login failed")?;

    let summary = purge_aged_errors(session.bulk(), &PurgeConfig::default()).await?;
    tracing::info!(
        passes = summary.passes,
        deleted = summary.deleted,
        batches = summary.batches,
        "purge finished"
    );
    Ok(())
}
