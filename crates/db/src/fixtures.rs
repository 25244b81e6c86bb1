use sqlx::Row;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_CUSTOMER_COUNT: i64 = 14;
const SEED_RESERVATION_COUNT: i64 = 44;

/// Customer expected at the head of the top-ten report once seeded.
const SEED_TOP_CUSTOMER: (&str, &str, i64) = ("Fitzwilliam", "Darcy", 8);

/// Deterministic demo customers and reservations.
///
/// Every row carries a fixed id and is inserted with `INSERT OR IGNORE`, so
/// loading into an already-seeded database changes nothing.
pub struct DemoSeedDataset;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub rows_inserted: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/lunchly_seed.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        let result = sqlx::raw_sql(Self::SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(SeedResult { rows_inserted: result.rows_affected() })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let customers: i64 =
            sqlx::query("SELECT COUNT(*) AS count FROM customers WHERE id BETWEEN 1 AND ?")
                .bind(SEED_CUSTOMER_COUNT)
                .fetch_one(pool)
                .await?
                .try_get("count")
                .map_err(RepositoryError::decode)?;
        checks.push(("seed-customers", customers == SEED_CUSTOMER_COUNT));

        let reservations: i64 =
            sqlx::query("SELECT COUNT(*) AS count FROM reservations WHERE id BETWEEN 1 AND ?")
                .bind(SEED_RESERVATION_COUNT)
                .fetch_one(pool)
                .await?
                .try_get("count")
                .map_err(RepositoryError::decode)?;
        checks.push(("seed-reservations", reservations == SEED_RESERVATION_COUNT));

        let (first_name, last_name, expected_count) = SEED_TOP_CUSTOMER;
        let top_count: i64 = sqlx::query(
            "SELECT COUNT(r.id) AS count
             FROM customers AS c
             JOIN reservations AS r ON c.id = r.customer_id
             WHERE c.first_name = ? AND c.last_name = ?",
        )
        .bind(first_name)
        .bind(last_name)
        .fetch_one(pool)
        .await?
        .try_get("count")
        .map_err(RepositoryError::decode)?;
        checks.push(("seed-top-customer", top_count == expected_count));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}
