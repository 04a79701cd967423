mod accounts;
mod coupons;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::accounts::{SessionCommands, UserCommands, VendorCommands};
use crate::coupons::CouponCommands;

#[derive(Debug, Parser)]
#[command(name = "souqcart-cli")]
#[command(about = "SouqCart operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Manage user accounts
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage vendor stores
    Vendors {
        #[command(subcommand)]
        command: VendorCommands,
    },
    /// Issue and expire bearer sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Inspect coupons
    Coupons {
        #[command(subcommand)]
        command: CouponCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Insert demo users, a vendor catalog and the demo coupons
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("souqcart-cli: no command given; see --help");
        return Ok(());
    };

    let config = souqcart_core::load_app_config()?;
    let pool = souqcart_db::connect_pool(
        &config.database_url,
        souqcart_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    match command {
        Commands::Db { command } => run_db(&pool, command).await?,
        Commands::Users { command } => accounts::run_users(&pool, command).await?,
        Commands::Vendors { command } => accounts::run_vendors(&pool, command).await?,
        Commands::Sessions { command } => accounts::run_sessions(&pool, command).await?,
        Commands::Coupons { command } => coupons::run_coupons(&pool, command).await?,
    }

    pool.close().await;
    Ok(())
}

async fn run_db(pool: &sqlx::PgPool, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            souqcart_db::health_check(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = souqcart_db::run_migrations(pool).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
        }
        DbCommands::Seed => {
            souqcart_db::run_migrations(pool).await?;
            let summary = souqcart_db::seed_demo_data(pool).await?;
            println!(
                "seeded {} users, {} vendors, {} products, {} coupons",
                summary.users, summary.vendors, summary.products, summary.coupons
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
