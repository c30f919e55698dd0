//! Example: Listing backup repositories
//!
//! Loads provider configuration, connects to the backup server, and prints
//! the configured backup repositories.
//!
//! # Setup
//!
//! 1. Point the example at a server: ```bash export VEEAM_HOST=vbr01:9419
//!    export VEEAM_USERNAME=administrator export VEEAM_PASSWORD=...
//!    export VEEAM_INSECURE=true ```
//!
//!    Or drop a `veeam.toml` next to the working directory.
//!
//! 2. Run this example: ```bash RUST_LOG=veeam_infra=debug cargo run
//!    --example list_repositories -- json ```

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use veeam_infra::{config, init_tracing, ApiClient, LogFormat};

const REPOSITORIES_ENDPOINT: &str = "/api/v1/backupInfrastructure/repositories";

#[derive(Debug, Deserialize)]
struct RepositoryPage {
    #[serde(default)]
    data: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<LogFormat>().map_err(anyhow::Error::msg)?,
        None => LogFormat::Pretty,
    };
    init_tracing(format)?;

    let config = config::load().context("failed to load provider configuration")?;
    let client = ApiClient::connect(&config).await.context("failed to connect")?;

    let page: RepositoryPage = client
        .request(reqwest::Method::GET, REPOSITORIES_ENDPOINT)
        .deadline(Duration::from_secs(120))
        .send_json()
        .await
        .context("failed to list repositories")?;

    println!("Backup repositories on {}", client.base_url());
    for repo in &page.data {
        println!("  {:<38} {:<30} {}", repo.id, repo.name, repo.description);
    }
    println!("{} repositories", page.data.len());

    Ok(())
}
