use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::profile::ShopperId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Garment size label, normalized to trimmed upper-case so "m" and " M" collapse.
/// Ordering is lexicographic on the normalized code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SizeCode(String);

impl SizeCode {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SizeCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SizeCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<SizeCode> for String {
    fn from(value: SizeCode) -> Self {
        value.0
    }
}

impl fmt::Display for SizeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The order/shipment status vocabulary shared with the order service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    InTransit,
    Delivered,
    Completed,
    ReturnRequested,
    Returned,
    Refunded,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 11] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::InTransit,
        Self::Delivered,
        Self::Completed,
        Self::ReturnRequested,
        Self::Returned,
        Self::Refunded,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Completed => "COMPLETED",
            Self::ReturnRequested => "RETURN_REQUESTED",
            Self::Returned => "RETURNED",
            Self::Refunded => "REFUNDED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|status| status.as_str() == normalized).ok_or_else(|| {
            DomainError::UnclassifiableOutcome { status: value.to_string() }
        })
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeClass {
    Successful,
    Returned,
    Cancelled,
}

/// One historical order line exactly as the order/review collaborator reports it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub shopper_id: ShopperId,
    pub product_id: ProductId,
    pub size: SizeCode,
    pub status: String,
    #[serde(default)]
    pub rating: Option<u8>,
    pub purchased_at: DateTime<Utc>,
}

impl OrderLine {
    /// Review rating in 1..=5; zero or out-of-range values count as "no review".
    pub fn review_rating(&self) -> Option<f64> {
        self.rating.filter(|rating| (1..=5).contains(rating)).map(f64::from)
    }
}

/// A classified purchase of one size by one candidate. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderOutcomeEvent {
    pub shopper_id: ShopperId,
    pub size: SizeCode,
    pub outcome: OutcomeClass,
    pub rating: Option<f64>,
    pub purchased_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{OrderLine, OrderStatus, ProductId, SizeCode};
    use crate::domain::profile::ShopperId;
    use crate::errors::DomainError;

    #[test]
    fn size_codes_are_normalized_and_ordered_lexicographically() {
        assert_eq!(SizeCode::new(" m "), SizeCode::new("M"));
        assert!(SizeCode::new("L") < SizeCode::new("M"));
        assert!(SizeCode::new("M") < SizeCode::new("S"));
    }

    #[test]
    fn order_status_parsing_accepts_common_spellings() {
        assert_eq!("delivered".parse::<OrderStatus>(), Ok(OrderStatus::Delivered));
        assert_eq!("in-transit".parse::<OrderStatus>(), Ok(OrderStatus::InTransit));
        assert_eq!("Return Requested".parse::<OrderStatus>(), Ok(OrderStatus::ReturnRequested));
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_status_is_unclassifiable() {
        let error = "LOST".parse::<OrderStatus>().expect_err("unknown status must fail");
        assert_eq!(error, DomainError::UnclassifiableOutcome { status: "LOST".to_string() });
    }

    #[test]
    fn zero_or_out_of_range_rating_counts_as_absent() {
        let mut line = OrderLine {
            shopper_id: ShopperId::new("s-1"),
            product_id: ProductId::new("dress-01"),
            size: SizeCode::new("M"),
            status: "DELIVERED".to_string(),
            rating: Some(0),
            purchased_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };
        assert_eq!(line.review_rating(), None);

        line.rating = Some(9);
        assert_eq!(line.review_rating(), None);

        line.rating = Some(4);
        assert_eq!(line.review_rating(), Some(4.0));
    }
}
