use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, MovementId, ProductId};

/// Direction of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementType {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl MovementType {
    /// Signed effect of a movement of `qty` units: `+qty` for IN, `-qty` for OUT.
    pub fn signed_delta(self, qty: i64) -> i64 {
        match self {
            MovementType::In => qty,
            MovementType::Out => -qty,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(MovementType::In),
            "OUT" => Ok(MovementType::Out),
            other => Err(DomainError::validation(format!(
                "movement type must be IN or OUT, got '{other}'"
            ))),
        }
    }
}

/// Validated command: record one stock movement.
///
/// Construction rejects a non-positive quantity and stores a blank reason as
/// `None`, so a command that exists is safe to hand to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMovement {
    product_id: ProductId,
    movement_type: MovementType,
    qty: i64,
    reason: Option<String>,
}

impl RecordMovement {
    pub fn new(
        product_id: ProductId,
        movement_type: MovementType,
        qty: i64,
        reason: Option<String>,
    ) -> DomainResult<Self> {
        if qty <= 0 {
            return Err(DomainError::validation("qty must be a positive integer"));
        }
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        Ok(Self {
            product_id,
            movement_type,
            qty,
            reason,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    pub fn qty(&self) -> i64 {
        self.qty
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Materialise the command as a stored movement with server-assigned
    /// identity and timestamp.
    pub fn into_movement(self, id: MovementId, now: DateTime<Utc>) -> StockMovement {
        StockMovement {
            id,
            product_id: self.product_id,
            movement_type: self.movement_type,
            qty: self.qty,
            reason: self.reason,
            created_at: now,
        }
    }
}

/// A stored stock movement. Never updated in place: it is created by
/// `record_movement` and destroyed by `reverse_movement`, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub qty: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Signed delta that undoes this movement's effect on stock.
    pub fn reversal_delta(&self) -> i64 {
        -self.movement_type.signed_delta(self.qty)
    }
}

/// Stock after applying a movement of `qty` units in `movement_type`
/// direction. Fails closed: a result below zero rejects the whole movement,
/// it is never clamped.
pub fn next_stock(current: i64, movement_type: MovementType, qty: i64) -> DomainResult<i64> {
    let next = current + movement_type.signed_delta(qty);
    if next < 0 {
        return Err(DomainError::invariant(format!(
            "insufficient stock: OUT of {qty} exceeds current stock {current}"
        )));
    }
    Ok(next)
}

/// Stock after undoing `movement` against the *current* counter.
///
/// Later movements are not replayed; only the single inverse delta is
/// applied. That makes reversal order-sensitive: undoing an IN can fail when
/// other movements have already consumed the stock it added, even though the
/// original movement succeeded.
pub fn reversed_stock(current: i64, movement: &StockMovement) -> DomainResult<i64> {
    let next = current + movement.reversal_delta();
    if next < 0 {
        return Err(DomainError::invariant(format!(
            "reversing this {} of {} would drive stock below zero (current {current})",
            movement.movement_type, movement.qty
        )));
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(movement_type: MovementType, qty: i64) -> StockMovement {
        RecordMovement::new(ProductId::new(), movement_type, qty, None)
            .unwrap()
            .into_movement(MovementId::new(), Utc::now())
    }

    #[test]
    fn record_movement_rejects_zero_and_negative_qty() {
        for qty in [0, -1, -42] {
            let err =
                RecordMovement::new(ProductId::new(), MovementType::In, qty, None).unwrap_err();
            match err {
                DomainError::Validation(_) => {}
                other => panic!("expected Validation for qty {qty}, got {other:?}"),
            }
        }
    }

    #[test]
    fn record_movement_stores_blank_reason_as_none() {
        let cmd =
            RecordMovement::new(ProductId::new(), MovementType::Out, 3, Some("  ".to_string()))
                .unwrap();
        assert_eq!(cmd.reason(), None);

        let cmd = RecordMovement::new(
            ProductId::new(),
            MovementType::Out,
            3,
            Some(" damaged goods ".to_string()),
        )
        .unwrap();
        assert_eq!(cmd.reason(), Some("damaged goods"));
    }

    #[test]
    fn movement_type_parses_strictly() {
        assert_eq!("IN".parse::<MovementType>().unwrap(), MovementType::In);
        assert_eq!("OUT".parse::<MovementType>().unwrap(), MovementType::Out);
        for bad in ["MOVE", "in", "out", "In", ""] {
            match bad.parse::<MovementType>() {
                Err(DomainError::Validation(_)) => {}
                other => panic!("expected Validation for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn next_stock_applies_signed_delta() {
        assert_eq!(next_stock(0, MovementType::In, 5).unwrap(), 5);
        assert_eq!(next_stock(5, MovementType::Out, 3).unwrap(), 2);
    }

    #[test]
    fn next_stock_rejects_insufficient_stock() {
        let err = next_stock(10, MovementType::Out, 12).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) => assert!(msg.contains("insufficient stock")),
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
        // Draining to exactly zero is allowed.
        assert_eq!(next_stock(10, MovementType::Out, 10).unwrap(), 0);
    }

    #[test]
    fn reversal_undoes_the_original_delta() {
        let m_in = movement(MovementType::In, 5);
        assert_eq!(reversed_stock(5, &m_in).unwrap(), 0);

        let m_out = movement(MovementType::Out, 3);
        assert_eq!(reversed_stock(2, &m_out).unwrap(), 5);
    }

    #[test]
    fn reversing_a_consumed_in_movement_fails() {
        // stock=10 came from an IN of 10; an OUT of 8 left 2 on hand.
        // Undoing the IN would need 10 back out of a stock of 2.
        let m_in = movement(MovementType::In, 10);
        let err = reversed_stock(2, &m_in).unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn reversal_is_evaluated_against_current_stock() {
        // IN 5 (0→5), OUT 3 (5→2); undo the OUT first (2→5), then the IN (5→0).
        let m_in = movement(MovementType::In, 5);
        let m_out = movement(MovementType::Out, 3);

        let after_out_reversal = reversed_stock(2, &m_out).unwrap();
        assert_eq!(after_out_reversal, 5);
        let after_in_reversal = reversed_stock(after_out_reversal, &m_in).unwrap();
        assert_eq!(after_in_reversal, 0);

        // In the opposite order the IN reversal fails while the OUT is live.
        assert!(reversed_stock(2, &m_in).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: for any sequence of movements, each accepted one
            /// shifts stock by exactly its signed delta and never leaves it
            /// negative; each rejected one would have.
            #[test]
            fn applied_movements_keep_stock_consistent_and_non_negative(
                ops in prop::collection::vec((prop::bool::ANY, 1i64..1_000), 0..64)
            ) {
                let mut stock = 0i64;
                for (inbound, qty) in ops {
                    let movement_type = if inbound { MovementType::In } else { MovementType::Out };
                    match next_stock(stock, movement_type, qty) {
                        Ok(next) => {
                            prop_assert_eq!(next, stock + movement_type.signed_delta(qty));
                            prop_assert!(next >= 0);
                            stock = next;
                        }
                        Err(_) => {
                            prop_assert!(stock + movement_type.signed_delta(qty) < 0);
                        }
                    }
                }
            }

            /// Property: recording a movement and immediately reversing it
            /// restores the prior stock.
            #[test]
            fn immediate_reversal_restores_prior_stock(
                start in 0i64..1_000_000,
                inbound in prop::bool::ANY,
                qty in 1i64..1_000,
            ) {
                let movement_type = if inbound { MovementType::In } else { MovementType::Out };
                if let Ok(next) = next_stock(start, movement_type, qty) {
                    let stored = RecordMovement::new(ProductId::new(), movement_type, qty, None)
                        .unwrap()
                        .into_movement(MovementId::new(), Utc::now());
                    prop_assert_eq!(reversed_stock(next, &stored).unwrap(), start);
                }
            }
        }
    }
}
