use std::path::PathBuf;

use ari_bulk_loader::CallerRole;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// One pretty-printed JSON array.
    Json,
    /// One JSON object per line.
    Ndjson,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum Role {
    Admin,
    #[default]
    Standard,
}

impl From<Role> for CallerRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => CallerRole::Admin,
            Role::Standard => CallerRole::Standard,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "ari-cli",
    version,
    about = "Bulk export of tenant collections from the ERP API",
    long_about = "Bulk export of tenant collections from the ERP API.\n\nConnection settings come \
                  from ARI_API_URL / ARI_ENVIRONMENT, credentials from ARI_API_TOKEN or \
                  ARI_API_KEY + ARI_API_SECRET."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Collection selection shared by every command.
#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Tenant (base) identifier sent as `baseId`.
    #[arg(long)]
    pub base_id: i64,
    /// Filter as `key=value`; repeat for several filters.
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print how many rows an endpoint holds for a tenant.
    Count {
        /// Collection endpoint, e.g. `/api/clientes`; a leading `/api` is never doubled.
        #[arg(long)]
        endpoint: String,
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Load a whole collection page by page and write it out.
    Load {
        /// Collection endpoint, e.g. `/api/clientes`; a leading `/api` is never doubled.
        #[arg(long)]
        endpoint: String,
        #[command(flatten)]
        query: QueryArgs,
        /// Rows per page (defaults to the role's page size).
        #[arg(long)]
        page_size: Option<u32>,
        /// Caller privilege used to pick the default page size.
        #[arg(long, value_enum, default_value_t = Role::Standard)]
        role: Role,
        /// Output file; rows go to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Load customers through the session cache and print a summary per run.
    Clients {
        #[command(flatten)]
        query: QueryArgs,
        /// Caller privilege used to pick the default page size.
        #[arg(long, value_enum, default_value_t = Role::Standard)]
        role: Role,
        /// Bypass the cache.
        #[arg(long)]
        no_cache: bool,
        /// Number of times to run the same load.
        #[arg(long, default_value_t = 1)]
        repeat: u32,
        /// Write the rows of the last run to this file.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
