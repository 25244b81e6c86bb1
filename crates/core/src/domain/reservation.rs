use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReservationId(pub i64);

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Option<ReservationId>,
    pub customer_id: CustomerId,
    pub num_guests: i64,
    pub start_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Reservation {
    pub fn new(
        customer_id: CustomerId,
        num_guests: i64,
        start_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Self {
        Self { id: None, customer_id, num_guests, start_at, notes }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn mark_persisted(&mut self, id: ReservationId) -> Result<(), DomainError> {
        match self.id {
            None => {
                self.id = Some(id);
                Ok(())
            }
            Some(current) if current == id => Ok(()),
            Some(current) => Err(DomainError::IdentityReassignment {
                entity: "reservation",
                current: current.0,
                requested: id.0,
            }),
        }
    }

    /// Human-facing start time, e.g. `March 4 2026, 7:30 PM`.
    pub fn formatted_start_at(&self) -> String {
        self.start_at.format("%B %-d %Y, %-I:%M %p").to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Reservation, ReservationId};
    use crate::domain::customer::CustomerId;

    fn reservation() -> Reservation {
        let start_at = Utc.with_ymd_and_hms(2026, 3, 4, 19, 30, 0).single().expect("valid time");
        Reservation::new(CustomerId(1), 4, start_at, Some("window seat".to_string()))
    }

    #[test]
    fn formats_start_time_for_display() {
        assert_eq!(reservation().formatted_start_at(), "March 4 2026, 7:30 PM");
    }

    #[test]
    fn reservation_identity_is_assigned_once() {
        let mut reservation = reservation();
        assert!(!reservation.is_persisted());

        reservation.mark_persisted(ReservationId(3)).expect("first assignment");
        assert!(reservation.is_persisted());
        assert!(reservation.mark_persisted(ReservationId(4)).is_err());
        assert_eq!(reservation.id, Some(ReservationId(3)));
    }
}
