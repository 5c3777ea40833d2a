pub mod clients;
pub mod count;
pub mod load;

use anyhow::Result;
use ari_bulk_loader::{CancellationToken, ClientConfig};

use crate::cli::{Cli, Commands};

pub async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::from_env();
    tracing::debug!(base_url = %config.base_url, "using api");
    let cancel = cancel_on_ctrl_c();

    match cli.command {
        Commands::Count {
            endpoint,
            query,
        } => count::run(&config, &endpoint, &query).await,
        Commands::Load {
            endpoint,
            query,
            page_size,
            role,
            out,
            format,
        } => {
            load::run(&config, &endpoint, &query, page_size, role, out.as_deref(), format, cancel)
                .await
        },
        Commands::Clients {
            query,
            role,
            no_cache,
            repeat,
            out,
        } => clients::run(&config, &query, role, !no_cache, repeat, out.as_deref(), cancel).await,
    }
}

/// Token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling bulk load");
            trigger.cancel();
        }
    });
    cancel
}
