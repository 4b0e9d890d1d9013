//! Order status to outcome class mapping

use crate::domain::{OrderLine, OrderOutcomeEvent, OrderStatus, OutcomeClass};
use crate::errors::DomainError;

#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeClassifier;

impl OutcomeClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Exhaustive over the status vocabulary: adding a status without deciding
    /// its class is a compile error.
    pub fn class_of(status: OrderStatus) -> OutcomeClass {
        match status {
            OrderStatus::Pending
            | OrderStatus::Confirmed
            | OrderStatus::Processing
            | OrderStatus::Shipped
            | OrderStatus::InTransit
            | OrderStatus::Delivered
            | OrderStatus::Completed => OutcomeClass::Successful,
            OrderStatus::ReturnRequested | OrderStatus::Returned | OrderStatus::Refunded => {
                OutcomeClass::Returned
            }
            OrderStatus::Cancelled => OutcomeClass::Cancelled,
        }
    }

    pub fn classify_status(&self, raw_status: &str) -> Result<OutcomeClass, DomainError> {
        raw_status.parse::<OrderStatus>().map(Self::class_of)
    }

    pub fn classify(&self, line: &OrderLine) -> Result<OrderOutcomeEvent, DomainError> {
        let outcome = self.classify_status(&line.status).map_err(|error| {
            tracing::warn!(
                event_name = "sizing.outcome.unclassifiable",
                shopper_id = %line.shopper_id,
                product_id = %line.product_id,
                status = %line.status,
                "order status has no outcome class"
            );
            error
        })?;

        // Cancelled purchases never completed, so a review on them carries no fit signal.
        let rating = match outcome {
            OutcomeClass::Cancelled => None,
            OutcomeClass::Successful | OutcomeClass::Returned => line.review_rating(),
        };

        Ok(OrderOutcomeEvent {
            shopper_id: line.shopper_id.clone(),
            size: line.size.clone(),
            outcome,
            rating,
            purchased_at: line.purchased_at,
        })
    }

    /// Classify in input order, stopping at the first unmapped status.
    pub fn classify_all<'a, I>(&self, lines: I) -> Result<Vec<OrderOutcomeEvent>, DomainError>
    where
        I: IntoIterator<Item = &'a OrderLine>,
    {
        lines.into_iter().map(|line| self.classify(line)).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{ProductId, ShopperId, SizeCode};

    fn line(status: &str, rating: Option<u8>) -> OrderLine {
        OrderLine {
            shopper_id: ShopperId::new("s-1"),
            product_id: ProductId::new("jeans-501"),
            size: SizeCode::new("32"),
            status: status.to_string(),
            rating,
            purchased_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn every_status_maps_to_exactly_one_class() {
        let classifier = OutcomeClassifier::new();
        for status in OrderStatus::ALL {
            assert!(classifier.classify_status(status.as_str()).is_ok(), "{status} unmapped");
        }
    }

    #[test]
    fn terminal_states_map_to_expected_classes() {
        assert_eq!(OutcomeClassifier::class_of(OrderStatus::Delivered), OutcomeClass::Successful);
        assert_eq!(OutcomeClassifier::class_of(OrderStatus::InTransit), OutcomeClass::Successful);
        assert_eq!(OutcomeClassifier::class_of(OrderStatus::Returned), OutcomeClass::Returned);
        assert_eq!(OutcomeClassifier::class_of(OrderStatus::Refunded), OutcomeClass::Returned);
        assert_eq!(OutcomeClassifier::class_of(OrderStatus::Cancelled), OutcomeClass::Cancelled);
    }

    #[test]
    fn unmapped_status_is_a_hard_error() {
        let classifier = OutcomeClassifier::new();
        let lines = vec![line("DELIVERED", Some(5)), line("EXCHANGED", None)];

        let error =
            classifier.classify_all(&lines).expect_err("EXCHANGED is not in the vocabulary");
        assert_eq!(error, DomainError::UnclassifiableOutcome { status: "EXCHANGED".to_string() });
    }

    #[test]
    fn cancelled_events_drop_their_rating() {
        let classifier = OutcomeClassifier::new();

        let cancelled = classifier.classify(&line("cancelled", Some(5))).unwrap();
        assert_eq!(cancelled.outcome, OutcomeClass::Cancelled);
        assert_eq!(cancelled.rating, None);

        let returned = classifier.classify(&line("RETURNED", Some(2))).unwrap();
        assert_eq!(returned.outcome, OutcomeClass::Returned);
        assert_eq!(returned.rating, Some(2.0));
    }
}
