//! Order lifecycle.
//!
//! An order carries two independent statuses: the fulfillment `status` and
//! the gateway-confirmed `payment_status`. [`OrderState`] bundles them and
//! every transition is a pure function from one state to the next, so the
//! persistence layer can apply it as a compare-and-set against the state it
//! read.
//!
//! ```text
//! status:   PENDING -> CONFIRMED -> PROCESSING -> SHIPPED -> DELIVERED
//!           PENDING -> CANCELLED
//!           any non-terminal -> REFUNDED
//! payment:  PENDING -> PAID | FAILED,  PAID -> REFUNDED
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Position along the fulfillment track, `None` for states off it.
    fn fulfillment_rank(self) -> Option<u8> {
        match self {
            OrderStatus::Confirmed => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::Validation(format!("unknown order status '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
        ]
        .into_iter()
        .find(|status| status.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| CoreError::Validation(format!("unknown payment status '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Stripe,
    Cod,
}

impl PaymentMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Cod => "cod",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(PaymentMethod::Stripe),
            "cod" => Ok(PaymentMethod::Cod),
            other => Err(CoreError::Validation(format!(
                "payment method must be 'stripe' or 'cod', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl TransitionError {
    fn status(from: OrderStatus, to: OrderStatus) -> Self {
        TransitionError::InvalidTransition {
            from: from.as_str(),
            to: to.as_str(),
        }
    }

    fn payment(from: PaymentStatus, to: PaymentStatus) -> Self {
        TransitionError::InvalidTransition {
            from: from.as_str(),
            to: to.as_str(),
        }
    }
}

/// Result of a permitted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The order moves to this state.
    Applied(OrderState),
    /// The order is already where the request would put it.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderState {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}

impl OrderState {
    /// State of a freshly created order.
    ///
    /// Cash-on-delivery orders are confirmed immediately since there is no
    /// gateway confirmation to wait for.
    #[must_use]
    pub fn initial(method: PaymentMethod) -> Self {
        let status = match method {
            PaymentMethod::Stripe => OrderStatus::Pending,
            PaymentMethod::Cod => OrderStatus::Confirmed,
        };
        Self {
            status,
            payment_status: PaymentStatus::Pending,
        }
    }

    /// Gateway reported a completed payment.
    ///
    /// Re-delivery for an already paid order is a no-op.
    ///
    /// # Errors
    ///
    /// Fails when the payment already failed or was refunded.
    pub fn payment_succeeded(self) -> Result<Transition, TransitionError> {
        match self.payment_status {
            PaymentStatus::Paid => Ok(Transition::Unchanged),
            PaymentStatus::Pending => {
                let status = if self.status == OrderStatus::Pending {
                    OrderStatus::Confirmed
                } else {
                    self.status
                };
                Ok(Transition::Applied(Self {
                    status,
                    payment_status: PaymentStatus::Paid,
                }))
            }
            from @ (PaymentStatus::Failed | PaymentStatus::Refunded) => {
                Err(TransitionError::payment(from, PaymentStatus::Paid))
            }
        }
    }

    /// Gateway reported an expired or failed payment session.
    ///
    /// Only a pending payment can fail. Late or repeated deliveries for
    /// payments that already settled are ignored.
    #[must_use]
    pub fn payment_failed(self) -> Transition {
        match self.payment_status {
            PaymentStatus::Pending => Transition::Applied(Self {
                payment_status: PaymentStatus::Failed,
                ..self
            }),
            PaymentStatus::Paid | PaymentStatus::Failed | PaymentStatus::Refunded => {
                Transition::Unchanged
            }
        }
    }

    /// Customer cancellation; only pending orders can be cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::InvalidTransition`] for any other status.
    pub fn cancel(self) -> Result<Transition, TransitionError> {
        if self.status == OrderStatus::Pending {
            Ok(Transition::Applied(Self {
                status: OrderStatus::Cancelled,
                ..self
            }))
        } else {
            Err(TransitionError::status(self.status, OrderStatus::Cancelled))
        }
    }

    /// Vendor/admin fulfillment update along
    /// CONFIRMED -> PROCESSING -> SHIPPED -> DELIVERED.
    ///
    /// Moves forward only; skipping stages is allowed. Requesting the
    /// current stage is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::InvalidTransition`] when the order is not
    /// on the fulfillment track, the target is not a fulfillment stage past
    /// CONFIRMED, or the target is behind the current stage.
    pub fn advance_fulfillment(self, target: OrderStatus) -> Result<Transition, TransitionError> {
        let invalid = || TransitionError::status(self.status, target);
        let current_rank = self.status.fulfillment_rank().ok_or_else(invalid)?;
        let target_rank = target.fulfillment_rank().ok_or_else(invalid)?;

        if target == self.status {
            return Ok(Transition::Unchanged);
        }
        if target == OrderStatus::Confirmed || target_rank < current_rank {
            return Err(invalid());
        }
        Ok(Transition::Applied(Self {
            status: target,
            ..self
        }))
    }

    /// Admin refund. A settled payment is marked refunded alongside.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::InvalidTransition`] when the order is
    /// delivered or cancelled.
    pub fn refund(self) -> Result<Transition, TransitionError> {
        match self.status {
            OrderStatus::Refunded => Ok(Transition::Unchanged),
            status if status.is_terminal() => {
                Err(TransitionError::status(status, OrderStatus::Refunded))
            }
            _ => {
                let payment_status = if self.payment_status == PaymentStatus::Paid {
                    PaymentStatus::Refunded
                } else {
                    self.payment_status
                };
                Ok(Transition::Applied(Self {
                    status: OrderStatus::Refunded,
                    payment_status,
                }))
            }
        }
    }

    /// Route a requested status change to the matching transition rule.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::InvalidTransition`] when no rule permits
    /// the change from the current state.
    pub fn request_status(self, target: OrderStatus) -> Result<Transition, TransitionError> {
        match target {
            OrderStatus::Cancelled => self.cancel(),
            OrderStatus::Refunded => self.refund(),
            OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered => {
                self.advance_fulfillment(target)
            }
            OrderStatus::Pending | OrderStatus::Confirmed if target == self.status => {
                Ok(Transition::Unchanged)
            }
            OrderStatus::Pending | OrderStatus::Confirmed => {
                Err(TransitionError::status(self.status, target))
            }
        }
    }
}

#[cfg(test)]
#[path = "orders_test.rs"]
mod tests;
