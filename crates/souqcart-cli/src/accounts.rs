//! Account administration: users, vendor stores and bearer sessions.
//!
//! Sign-up and OAuth live outside this system, so operators create accounts
//! and hand out session tokens from here.

use anyhow::Context;
use clap::Subcommand;
use souqcart_core::Role;

const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, Subcommand)]
pub enum UserCommands {
    /// Create a user account
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// customer, vendor or admin
        #[arg(long, default_value = "customer", value_parser = parse_role)]
        role: Role,
    },
}

#[derive(Debug, Subcommand)]
pub enum VendorCommands {
    /// Attach a store to an existing vendor account
    Create {
        /// Email of the owning user
        #[arg(long)]
        email: String,
        #[arg(long)]
        store_name: String,
        /// Approve the store immediately
        #[arg(long)]
        approved: bool,
    },
    /// Approve a store, or suspend it with --revoke
    Approve {
        /// Email of the owning user
        #[arg(long)]
        email: String,
        #[arg(long)]
        revoke: bool,
    },
    /// List stores, newest first
    List {
        /// Only stores waiting for approval
        #[arg(long)]
        pending: bool,
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum SessionCommands {
    /// Issue a bearer token for a user and print it
    Issue {
        #[arg(long)]
        email: String,
        #[arg(long, default_value_t = DEFAULT_SESSION_TTL_HOURS)]
        ttl_hours: i64,
    },
    /// Delete sessions past their expiry
    Purge,
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse::<Role>().map_err(|e| e.to_string())
}

pub(crate) async fn run_users(pool: &sqlx::PgPool, command: UserCommands) -> anyhow::Result<()> {
    match command {
        UserCommands::Create { email, name, role } => {
            let user = souqcart_db::create_user(pool, &email, &name, role)
                .await
                .with_context(|| format!("creating user {email}"))?;
            tracing::info!(user_id = %user.id, role = %user.role, "user created");
            println!("{}  {}  {}", user.id, user.email, user.role);
        }
    }
    Ok(())
}

pub(crate) async fn run_vendors(
    pool: &sqlx::PgPool,
    command: VendorCommands,
) -> anyhow::Result<()> {
    match command {
        VendorCommands::Create {
            email,
            store_name,
            approved,
        } => {
            let user = souqcart_db::get_user_by_email(pool, &email)
                .await
                .with_context(|| format!("looking up user {email}"))?;
            if user.role != Role::Vendor.as_str() {
                anyhow::bail!("user {email} has role '{}', expected vendor", user.role);
            }
            let vendor = souqcart_db::create_vendor(pool, user.id, &store_name, approved)
                .await
                .with_context(|| format!("creating store for {email}"))?;
            tracing::info!(vendor_id = %vendor.id, approved, "vendor store created");
            println!(
                "{}  {}  {}",
                vendor.id,
                vendor.store_name,
                approval_label(vendor.approved)
            );
        }
        VendorCommands::Approve { email, revoke } => {
            let user = souqcart_db::get_user_by_email(pool, &email)
                .await
                .with_context(|| format!("looking up user {email}"))?;
            let store = souqcart_db::get_vendor_by_user(pool, user.id)
                .await
                .with_context(|| format!("{email} owns no store"))?;
            let vendor = souqcart_db::set_vendor_approval(pool, store.id, !revoke).await?;
            tracing::info!(
                vendor_id = %vendor.id,
                approved = vendor.approved,
                "vendor approval changed"
            );
            println!("{}  {}", vendor.store_name, approval_label(vendor.approved));
        }
        VendorCommands::List { pending, limit } => {
            let approved = if pending { Some(false) } else { None };
            let rows = souqcart_db::list_vendors(pool, approved, limit.clamp(1, 200)).await?;
            if rows.is_empty() {
                println!("no vendor stores found");
                return Ok(());
            }
            for row in &rows {
                println!("{}  {:<24}{}", row.id, row.store_name, approval_label(row.approved));
            }
        }
    }
    Ok(())
}

fn approval_label(approved: bool) -> &'static str {
    if approved {
        "approved"
    } else {
        "pending approval"
    }
}

pub(crate) async fn run_sessions(
    pool: &sqlx::PgPool,
    command: SessionCommands,
) -> anyhow::Result<()> {
    match command {
        SessionCommands::Issue { email, ttl_hours } => {
            if ttl_hours <= 0 {
                anyhow::bail!("--ttl-hours must be positive");
            }
            let user = souqcart_db::get_user_by_email(pool, &email)
                .await
                .with_context(|| format!("looking up user {email}"))?;
            let session =
                souqcart_db::create_session(pool, user.id, chrono::Duration::hours(ttl_hours))
                    .await?;
            tracing::info!(user_id = %user.id, expires_at = %session.expires_at, "session issued");
            println!("{}", session.token);
        }
        SessionCommands::Purge => {
            let removed = souqcart_db::delete_expired_sessions(pool).await?;
            println!("removed {removed} expired session(s)");
        }
    }
    Ok(())
}
