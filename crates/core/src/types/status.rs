//! Status and classification enums.
//!
//! Each enum maps to a Postgres enum type of the same snake_case name when the
//! `postgres` feature is enabled.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Orders start `pending`; an admin moves them on from there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Shipped,
    Delivered,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        }
    }

    /// Position along the forward fulfilment path.
    ///
    /// `rejected` is terminal and sorts after `delivered`.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Accepted => 1,
            Self::Shipped => 2,
            Self::Delivered => 3,
            Self::Rejected => 4,
        }
    }

    /// Whether moving from `self` to `next` goes backwards or leaves a
    /// terminal state.
    #[must_use]
    pub fn is_regression_to(self, next: Self) -> bool {
        if self == next {
            return false;
        }
        matches!(self, Self::Rejected | Self::Delivered) || next.rank() < self.rank()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Payment method recorded on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CashOnDelivery,
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

impl UserRole {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// What triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "notification_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    OrderStatus,
    System,
}

/// Kind of record a notification points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "related_kind", rename_all = "PascalCase")
)]
pub enum RelatedKind {
    Order,
    User,
    Product,
}

/// Collection season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "season"))]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
    #[default]
    #[serde(rename = "All Season")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "All Season"))]
    AllSeason,
    Holiday,
    Resort,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trips_through_text() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::Rejected,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_regressions() {
        use OrderStatus::{Accepted, Delivered, Pending, Rejected, Shipped};
        assert!(!Pending.is_regression_to(Accepted));
        assert!(!Accepted.is_regression_to(Delivered));
        assert!(!Pending.is_regression_to(Rejected));
        assert!(Shipped.is_regression_to(Pending));
        assert!(Delivered.is_regression_to(Rejected));
        assert!(Rejected.is_regression_to(Accepted));
        assert!(!Delivered.is_regression_to(Delivered));
    }

    #[test]
    fn test_season_labels() {
        assert_eq!(
            serde_json::to_string(&Season::AllSeason).unwrap(),
            "\"All Season\""
        );
        let s: Season = serde_json::from_str("\"Resort\"").unwrap();
        assert_eq!(s, Season::Resort);
        assert_eq!(Season::default(), Season::AllSeason);
    }

    #[test]
    fn test_role_parse() {
        assert!("admin".parse::<UserRole>().unwrap().is_admin());
        assert!(!UserRole::default().is_admin());
    }
}
