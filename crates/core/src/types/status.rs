//! Order and payment status enums.

use serde::{Deserialize, Serialize};

/// Canonical order status.
///
/// The first seven variants form the default fulfillment progression for a
/// purifier order (from placement through installation). `Cancelled` and
/// `Refunded` are terminal side-branches reachable from any non-terminal
/// state; they carry no progress index.
///
/// Source records spell these values inconsistently; the normalizer maps
/// everything onto the lower-case snake_case names used here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Installed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// The default fulfillment progression, in order.
    pub const PROGRESSION: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Installed,
    ];

    /// Position of this status in the default progression.
    ///
    /// Returns `None` for the `Cancelled`/`Refunded` side-branches, which
    /// sit outside the progression. Used to reconstruct a default status
    /// timeline when a source record carries none.
    #[must_use]
    pub fn progress_index(self) -> Option<usize> {
        Self::PROGRESSION.iter().position(|s| *s == self)
    }

    /// Whether no further transitions are expected from this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Installed | Self::Cancelled | Self::Refunded)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Installed => "installed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    /// Parses the canonical snake_case names, tolerating surrounding
    /// whitespace, mixed case, and space/hyphen separators as seen in
    /// source records ("Out For Delivery", "out-for-delivery").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "installed" => Ok(Self::Installed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Payment status recorded against an order.
///
/// Payment data is recorded here, not processed; gateway integration lives
/// with an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "unpaid" => Ok(Self::Pending),
            "paid" | "success" | "completed" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(format!("invalid payment status: {s}")),
        }
    }
}
