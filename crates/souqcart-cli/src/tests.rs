use super::*;
use crate::accounts::{SessionCommands, UserCommands, VendorCommands};
use crate::coupons::CouponCommands;
use souqcart_core::Role;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["souqcart-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["souqcart-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn parses_db_seed_command() {
    let cli = Cli::try_parse_from(["souqcart-cli", "db", "seed"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Seed
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["souqcart-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn users_create_defaults_to_customer() {
    let cli = Cli::try_parse_from([
        "souqcart-cli",
        "users",
        "create",
        "--email",
        "layla@example.com",
        "--name",
        "Layla",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Users {
            command: UserCommands::Create {
                role: Role::Customer,
                ref email,
                ..
            }
        }) if email == "layla@example.com"
    ));
}

#[test]
fn users_create_parses_role_case_insensitively() {
    let cli = Cli::try_parse_from([
        "souqcart-cli",
        "users",
        "create",
        "--email",
        "ops@example.com",
        "--name",
        "Ops",
        "--role",
        "ADMIN",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Users {
            command: UserCommands::Create {
                role: Role::Admin,
                ..
            }
        })
    ));
}

#[test]
fn users_create_rejects_unknown_role() {
    let result = Cli::try_parse_from([
        "souqcart-cli",
        "users",
        "create",
        "--email",
        "x@example.com",
        "--name",
        "X",
        "--role",
        "owner",
    ]);
    assert!(result.is_err());
}

#[test]
fn vendors_create_is_unapproved_by_default() {
    let cli = Cli::try_parse_from([
        "souqcart-cli",
        "vendors",
        "create",
        "--email",
        "dates@example.com",
        "--store-name",
        "Dar Al Tamr",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Vendors {
            command: VendorCommands::Create {
                approved: false,
                ref store_name,
                ..
            }
        }) if store_name == "Dar Al Tamr"
    ));
}

#[test]
fn vendors_approve_can_revoke() {
    let cli = Cli::try_parse_from([
        "souqcart-cli",
        "vendors",
        "approve",
        "--email",
        "dates@example.com",
        "--revoke",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Vendors {
            command: VendorCommands::Approve { revoke: true, .. }
        })
    ));
}

#[test]
fn vendors_list_filters_pending() {
    let cli = Cli::try_parse_from(["souqcart-cli", "vendors", "list", "--pending"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Vendors {
            command: VendorCommands::List {
                pending: true,
                limit: 20
            }
        })
    ));
}

#[test]
fn sessions_issue_defaults_to_one_week() {
    let cli = Cli::try_parse_from([
        "souqcart-cli",
        "sessions",
        "issue",
        "--email",
        "layla@example.com",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Sessions {
            command: SessionCommands::Issue { ttl_hours: 168, .. }
        })
    ));
}

#[test]
fn sessions_purge_parses() {
    let cli = Cli::try_parse_from(["souqcart-cli", "sessions", "purge"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Sessions {
            command: SessionCommands::Purge
        })
    ));
}

#[test]
fn coupons_list_accepts_limit() {
    let cli = Cli::try_parse_from(["souqcart-cli", "coupons", "list", "--limit", "5"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Coupons {
            command: CouponCommands::List { limit: 5 }
        })
    ));
}

#[test]
fn db_requires_a_subcommand() {
    assert!(Cli::try_parse_from(["souqcart-cli", "db"]).is_err());
}
