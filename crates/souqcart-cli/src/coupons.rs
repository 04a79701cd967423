use clap::Subcommand;
use souqcart_db::CouponRow;

#[derive(Debug, Subcommand)]
pub enum CouponCommands {
    /// List coupons, newest first
    List {
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

pub(crate) async fn run_coupons(
    pool: &sqlx::PgPool,
    command: CouponCommands,
) -> anyhow::Result<()> {
    match command {
        CouponCommands::List { limit } => {
            let rows = souqcart_db::list_coupons(pool, limit.clamp(1, 200)).await?;
            if rows.is_empty() {
                println!("no coupons found; run `db seed` for the demo set");
                return Ok(());
            }
            println!(
                "{:<16}{:<12}{:<10}{:<12}{:<10}ENDS",
                "CODE", "KIND", "VALUE", "USED", "ACTIVE"
            );
            for row in &rows {
                println!("{}", coupon_line(row));
            }
        }
    }
    Ok(())
}

fn usage(row: &CouponRow) -> String {
    match row.usage_limit {
        Some(limit) => format!("{}/{limit}", row.used_count),
        None => row.used_count.to_string(),
    }
}

fn coupon_line(row: &CouponRow) -> String {
    format!(
        "{:<16}{:<12}{:<10}{:<12}{:<10}{}",
        row.code,
        row.kind,
        row.value.to_string(),
        usage(row),
        if row.active { "yes" } else { "no" },
        row.end_date.format("%Y-%m-%d")
    )
}
