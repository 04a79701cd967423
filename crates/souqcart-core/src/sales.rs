//! Sales summaries for the admin and vendor dashboards.
//!
//! The persistence layer groups orders by `(status, payment_status)` and
//! hands the groups to [`SalesSummary::from_groups`]; which groups count as
//! sales is decided here.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::orders::{OrderStatus, PaymentStatus};

/// Orders sharing one status pair. `amount` is whatever the caller is
/// summing: order totals for the whole marketplace, line values for a
/// single vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesGroup {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub orders: i64,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub orders: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub total_orders: i64,
    /// Every status, in lifecycle order, including zero counts.
    pub orders_by_status: Vec<StatusCount>,
    /// Confirmed orders still on the fulfillment track or delivered.
    pub gross_sales: Decimal,
    /// Captured by the gateway and not refunded.
    pub paid_sales: Decimal,
}

/// Whether an order in `status` counts towards gross sales.
#[must_use]
pub fn counts_as_sale(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Confirmed
            | OrderStatus::Processing
            | OrderStatus::Shipped
            | OrderStatus::Delivered
    )
}

impl SalesSummary {
    #[must_use]
    pub fn from_groups(groups: &[SalesGroup]) -> Self {
        let orders_by_status = OrderStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                orders: groups
                    .iter()
                    .filter(|g| g.status == status)
                    .map(|g| g.orders)
                    .sum(),
            })
            .collect();

        let gross_sales = groups
            .iter()
            .filter(|g| counts_as_sale(g.status))
            .map(|g| g.amount)
            .sum();
        let paid_sales = groups
            .iter()
            .filter(|g| g.payment_status == PaymentStatus::Paid)
            .map(|g| g.amount)
            .sum();

        Self {
            total_orders: groups.iter().map(|g| g.orders).sum(),
            orders_by_status,
            gross_sales,
            paid_sales,
        }
    }
}
