use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{info, warn};

use lunchly_core::domain::customer::CustomerId;
use lunchly_core::domain::reservation::{Reservation, ReservationId};

use super::{RepositoryError, ReservationRepository};
use crate::DbPool;

pub struct SqlReservationRepository {
    pool: DbPool,
}

impl SqlReservationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_reservation(row: &SqliteRow) -> Result<Reservation, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(RepositoryError::decode)?;
    let customer_id: i64 = row.try_get("customer_id").map_err(RepositoryError::decode)?;
    let num_guests: i64 = row.try_get("num_guests").map_err(RepositoryError::decode)?;
    let start_at_str: String = row.try_get("start_at").map_err(RepositoryError::decode)?;
    let notes: Option<String> = row.try_get("notes").map_err(RepositoryError::decode)?;

    let start_at = DateTime::parse_from_rfc3339(&start_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid start_at `{start_at_str}`: {e}")))?;

    Ok(Reservation {
        id: Some(ReservationId(id)),
        customer_id: CustomerId(customer_id),
        num_guests,
        start_at,
        notes,
    })
}

#[async_trait::async_trait]
impl ReservationRepository for SqlReservationRepository {
    async fn find_by_id(&self, id: ReservationId) -> Result<Option<Reservation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, customer_id, num_guests, start_at, notes
             FROM reservations WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_reservation(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT id, customer_id, num_guests, start_at, notes
             FROM reservations
             WHERE customer_id = ?
             ORDER BY start_at",
        )
        .bind(customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_reservation).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, reservation: &mut Reservation) -> Result<ReservationId, RepositoryError> {
        let start_at = reservation.start_at.to_rfc3339();

        match reservation.id {
            None => {
                let result = sqlx::query(
                    "INSERT INTO reservations (customer_id, start_at, num_guests, notes)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(reservation.customer_id.0)
                .bind(&start_at)
                .bind(reservation.num_guests)
                .bind(&reservation.notes)
                .execute(&self.pool)
                .await?;

                let id = ReservationId(result.last_insert_rowid());
                reservation.mark_persisted(id)?;
                info!(
                    event_name = "db.reservation.inserted",
                    reservation_id = id.0,
                    customer_id = reservation.customer_id.0,
                    "reservation inserted"
                );
                Ok(id)
            }
            Some(id) => {
                let result = sqlx::query(
                    "UPDATE reservations SET customer_id = ?, start_at = ?, num_guests = ?, notes = ?
                     WHERE id = ?",
                )
                .bind(reservation.customer_id.0)
                .bind(&start_at)
                .bind(reservation.num_guests)
                .bind(&reservation.notes)
                .bind(id.0)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    warn!(
                        event_name = "db.reservation.update_missed",
                        reservation_id = id.0,
                        "update matched no reservation row"
                    );
                }
                Ok(id)
            }
        }
    }
}
