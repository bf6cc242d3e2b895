//! Operational CLI: run a discovery pass or a cleanup pass by hand, or
//! inspect the opportunity inbox, without going through the server.

use std::str::FromStr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use replyradar_core::{DiscoveryType, OpportunityStatus};
use replyradar_db::{OpportunityFilter, OpportunitySort, StatusFilter};
use replyradar_engine::{CleanupConfig, CleanupService, DiscoveryConfig, DiscoveryService};
use replyradar_platform::NoopAdapter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "replyradar-cli")]
#[command(about = "ReplyRadar command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one discovery pass for an account.
    Discover {
        /// Account public id.
        #[arg(long)]
        account: Uuid,
        /// Discovery type: `replies` or `search`.
        #[arg(long = "type")]
        discovery_type: String,
    },
    /// Run one cleanup pass (expire + hard delete).
    Cleanup,
    /// List opportunities, highest score first.
    List {
        /// Account public id; omit for all accounts.
        #[arg(long)]
        account: Option<Uuid>,
        /// Status filter: pending (default), responded, dismissed, expired, all.
        #[arg(long, default_value = "pending")]
        status: String,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = replyradar_core::load_app_config()?;
    let pool_config = replyradar_db::PoolConfig::from_app_config(&config);
    let pool = replyradar_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Discover {
            account,
            discovery_type,
        } => {
            let discovery_type = DiscoveryType::from_str(&discovery_type)
                .map_err(|_| anyhow::anyhow!("unknown discovery type '{discovery_type}'"))?;
            let row = replyradar_db::get_account_by_public_id(&pool, account).await?;
            let service = DiscoveryService::new(
                pool.clone(),
                Arc::new(NoopAdapter),
                DiscoveryConfig::from_app_config(&config),
            );
            let created = service.discover(row.id, discovery_type).await?;
            println!(
                "discovery complete: {} new opportunit{} for @{}",
                created.len(),
                if created.len() == 1 { "y" } else { "ies" },
                row.handle
            );
        }
        Commands::Cleanup => {
            let service = CleanupService::new(pool, CleanupConfig::from_app_config(&config));
            let summary = service.cleanup().await?;
            println!(
                "cleanup complete: {} expired, {} expired deleted, {} dismissed deleted, {} responses deleted",
                summary.expired,
                summary.deleted_expired,
                summary.deleted_dismissed,
                summary.deleted_responses
            );
        }
        Commands::List {
            account,
            status,
            limit,
        } => {
            let status = match status.as_str() {
                "all" => StatusFilter::All,
                raw => StatusFilter::Only(
                    OpportunityStatus::from_str(raw)
                        .map_err(|_| anyhow::anyhow!("unknown status '{raw}'"))?,
                ),
            };
            let account_id = match account {
                Some(public_id) => {
                    Some(replyradar_db::get_account_by_public_id(&pool, public_id).await?.id)
                }
                None => None,
            };
            let rows = replyradar_db::list_opportunities(
                &pool,
                &OpportunityFilter {
                    account_id,
                    status,
                    sort: OpportunitySort::Score,
                    limit,
                    offset: 0,
                },
            )
            .await?;

            if rows.is_empty() {
                println!("no opportunities match");
            }
            for row in rows {
                println!(
                    "[{:>3}] {} {} {:<9} {}",
                    row.total_score,
                    row.public_id,
                    row.discovered_at.format("%Y-%m-%d %H:%M"),
                    row.status,
                    truncate(&row.content, 60)
                );
            }
        }
    }

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let prefix: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{prefix}…")
}
