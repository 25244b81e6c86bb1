use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, info, warn};

use lunchly_core::domain::customer::{Customer, CustomerId, RankedCustomer, SearchTerms};
use lunchly_core::domain::reservation::Reservation;

use super::{CustomerRepository, RepositoryError, ReservationRepository};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_customer(row: &SqliteRow) -> Result<Customer, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(RepositoryError::decode)?;
    let first_name: String = row.try_get("first_name").map_err(RepositoryError::decode)?;
    let last_name: String = row.try_get("last_name").map_err(RepositoryError::decode)?;
    let phone: Option<String> = row.try_get("phone").map_err(RepositoryError::decode)?;
    let notes: Option<String> = row.try_get("notes").map_err(RepositoryError::decode)?;

    Ok(Customer { id: Some(CustomerId(id)), first_name, last_name, phone, notes })
}

fn row_to_ranked_customer(row: &SqliteRow) -> Result<RankedCustomer, RepositoryError> {
    let customer = row_to_customer(row)?;
    let reservation_count: i64 =
        row.try_get("reservation_count").map_err(RepositoryError::decode)?;

    Ok(RankedCustomer::new(customer, reservation_count))
}

/// Fetches the reservations of `customer` from the reservation collaborator.
/// A customer that was never saved has none.
pub async fn reservations_for_customer(
    customer: &Customer,
    reservations: &dyn ReservationRepository,
) -> Result<Vec<Reservation>, RepositoryError> {
    match customer.id {
        Some(id) => reservations.list_for_customer(id).await,
        None => Ok(Vec::new()),
    }
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn list_all(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT id, first_name, last_name, phone, notes
             FROM customers
             ORDER BY last_name, first_name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_customer).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, first_name, last_name, phone, notes
             FROM customers WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_customer(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, customer: &mut Customer) -> Result<CustomerId, RepositoryError> {
        match customer.id {
            None => {
                let result = sqlx::query(
                    "INSERT INTO customers (first_name, last_name, phone, notes)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(&customer.first_name)
                .bind(&customer.last_name)
                .bind(&customer.phone)
                .bind(&customer.notes)
                .execute(&self.pool)
                .await?;

                let id = CustomerId(result.last_insert_rowid());
                customer.mark_persisted(id)?;
                info!(
                    event_name = "db.customer.inserted",
                    customer_id = id.0,
                    "customer inserted"
                );
                Ok(id)
            }
            Some(id) => {
                let result = sqlx::query(
                    "UPDATE customers SET first_name = ?, last_name = ?, phone = ?, notes = ?
                     WHERE id = ?",
                )
                .bind(&customer.first_name)
                .bind(&customer.last_name)
                .bind(&customer.phone)
                .bind(&customer.notes)
                .bind(id.0)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    warn!(
                        event_name = "db.customer.update_missed",
                        customer_id = id.0,
                        "update matched no customer row"
                    );
                } else {
                    info!(event_name = "db.customer.updated", customer_id = id.0, "customer updated");
                }
                Ok(id)
            }
        }
    }

    async fn search(&self, name: &str) -> Result<Vec<Customer>, RepositoryError> {
        let terms = SearchTerms::parse(name);

        // SQLite LIKE folds ASCII case only, so the partial match runs here.
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT id, first_name, last_name, phone, notes
             FROM customers
             ORDER BY last_name, first_name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::new();
        for row in &rows {
            let customer = row_to_customer(row)?;
            if terms.matches(&customer) {
                matches.push(customer);
            }
        }
        let partial_count = matches.len();
        let narrowed = terms.narrow(matches);

        debug!(
            event_name = "db.customer.search",
            partial_count,
            row_count = narrowed.len(),
            "customer search completed"
        );
        Ok(narrowed)
    }

    async fn top_ten(&self) -> Result<Vec<RankedCustomer>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT c.id, c.first_name, c.last_name, c.phone, c.notes,
                    COUNT(*) AS reservation_count
             FROM customers AS c
             JOIN reservations AS r ON c.id = r.customer_id
             GROUP BY c.id
             ORDER BY reservation_count DESC, c.last_name, c.first_name, c.id
             LIMIT ?",
        )
        .bind(super::TOP_CUSTOMER_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_ranked_customer).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use lunchly_core::domain::customer::{Customer, CustomerId, CustomerState};
    use lunchly_core::domain::reservation::Reservation;

    use super::{reservations_for_customer, SqlCustomerRepository};
    use crate::repositories::{
        CustomerRepository, RepositoryError, ReservationRepository, SqlReservationRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    async fn insert(repo: &SqlCustomerRepository, first: &str, last: &str) -> Customer {
        let mut customer = Customer::new(first, last, None, None);
        repo.save(&mut customer).await.expect("save customer");
        customer
    }

    async fn book(pool: &sqlx::SqlitePool, customer_id: CustomerId, count: usize) {
        let repo = SqlReservationRepository::new(pool.clone());
        let base = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).single().expect("valid time");
        for offset in 0..count {
            let mut reservation =
                Reservation::new(customer_id, 2, base + Duration::days(offset as i64), None);
            repo.save(&mut reservation).await.expect("save reservation");
        }
    }

    async fn customer_row_count(pool: &sqlx::SqlitePool) -> i64 {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM customers").fetch_one(pool).await.expect("count");
        count
    }

    fn names(customers: &[Customer]) -> Vec<String> {
        customers.iter().map(Customer::full_name).collect()
    }

    #[tokio::test]
    async fn save_assigns_id_and_round_trips_all_fields() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);

        let mut customer = Customer::new(
            "Anna",
            "Karenina",
            Some("555-0101".to_string()),
            Some("prefers the terrace".to_string()),
        );
        assert_eq!(customer.state(), CustomerState::Transient);

        let id = repo.save(&mut customer).await.expect("insert");

        assert_eq!(customer.id, Some(id));
        assert_eq!(customer.state(), CustomerState::Persisted);
        let fetched = repo.get(id).await.expect("fetch");
        assert_eq!(fetched, customer);
    }

    #[tokio::test]
    async fn absent_optional_fields_round_trip_as_none() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);

        let customer = insert(&repo, "Leo", "Tolstoy").await;
        let fetched = repo.get(customer.id.expect("id")).await.expect("fetch");

        assert_eq!(fetched.phone, None);
        assert_eq!(fetched.notes, None);
    }

    #[tokio::test]
    async fn save_on_persisted_customer_updates_in_place() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool.clone());

        let mut customer = insert(&repo, "Anna", "Karenina").await;
        let id = customer.id.expect("id");
        let rows_before = customer_row_count(&pool).await;

        customer.last_name = "Vronskaya".to_string();
        customer.phone = Some("555-0199".to_string());
        let saved_id = repo.save(&mut customer).await.expect("update");

        assert_eq!(saved_id, id);
        assert_eq!(customer_row_count(&pool).await, rows_before);
        let fetched = repo.get(id).await.expect("fetch");
        assert_eq!(fetched.last_name, "Vronskaya");
        assert_eq!(fetched.phone.as_deref(), Some("555-0199"));
    }

    #[tokio::test]
    async fn saving_unknown_persisted_id_changes_nothing() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool.clone());

        let mut ghost = Customer { id: Some(CustomerId(999)), ..Customer::new("No", "One", None, None) };
        let id = repo.save(&mut ghost).await.expect("update of missing row is not an error");

        assert_eq!(id, CustomerId(999));
        assert_eq!(customer_row_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn get_missing_customer_fails_with_not_found() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);

        let error = repo.get(CustomerId(404)).await.expect_err("should not exist");

        assert!(matches!(error, RepositoryError::NotFound { entity: "customer", id: 404 }));
        assert_eq!(error.status_code(), Some(404));
        assert_eq!(repo.find_by_id(CustomerId(404)).await.expect("find"), None);
    }

    #[tokio::test]
    async fn list_all_orders_by_last_then_first_name() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);

        insert(&repo, "Zed", "Adams").await;
        insert(&repo, "Amy", "Brown").await;
        insert(&repo, "Abe", "Adams").await;
        insert(&repo, "Cal", "Brown").await;

        let all = repo.list_all().await.expect("list");

        assert_eq!(names(&all), vec!["Abe Adams", "Zed Adams", "Amy Brown", "Cal Brown"]);
    }

    #[tokio::test]
    async fn list_all_of_empty_table_is_empty() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);

        assert!(repo.list_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn full_name_search_narrows_to_exact_customer() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);

        insert(&repo, "Jane", "Smith").await;
        let john = insert(&repo, "John", "Smith").await;
        insert(&repo, "John", "Smithers").await;

        let results = repo.search("John Smith").await.expect("search");

        assert_eq!(results, vec![john]);
    }

    #[tokio::test]
    async fn single_name_search_returns_every_partial_match() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);

        insert(&repo, "Jane", "Smith").await;
        insert(&repo, "John", "Smith").await;
        insert(&repo, "Smith", "Jones").await;
        insert(&repo, "Walter", "Goldsmith").await;
        insert(&repo, "Ada", "Lovelace").await;

        let results = repo.search("Smith").await.expect("search");

        assert_eq!(names(&results), vec!["Walter Goldsmith", "Smith Jones", "Jane Smith", "John Smith"]);
    }

    #[tokio::test]
    async fn partial_lowercase_search_is_case_insensitive() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);

        insert(&repo, "Jo", "March").await;
        insert(&repo, "Joanna", "Baillie").await;
        insert(&repo, "Indiana", "Jones").await;
        insert(&repo, "Ada", "Lovelace").await;

        let results = repo.search("jo").await.expect("search");

        assert_eq!(names(&results), vec!["Joanna Baillie", "Indiana Jones", "Jo March"]);
    }

    #[tokio::test]
    async fn two_word_search_without_exact_match_keeps_partial_matches() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);

        insert(&repo, "Jane", "Smith").await;
        insert(&repo, "John", "Jones").await;
        insert(&repo, "Ada", "Lovelace").await;

        let results = repo.search("John Smith").await.expect("search");

        assert_eq!(names(&results), vec!["John Jones", "Jane Smith"]);
    }

    #[tokio::test]
    async fn single_word_search_narrows_only_on_matching_first_and_last() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);

        insert(&repo, "Jane", "Lee").await;
        let lee = insert(&repo, "Lee", "Lee").await;

        let results = repo.search("lee").await.expect("search");

        assert_eq!(results, vec![lee]);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);

        insert(&repo, "Ada", "Lovelace").await;
        insert(&repo, "100%", "Regular").await;

        let results = repo.search("%").await.expect("search");

        assert_eq!(names(&results), vec!["100% Regular"]);
    }

    #[tokio::test]
    async fn top_ten_ranks_by_reservation_count_and_formats_count() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool.clone());

        let light = insert(&repo, "Light", "Diner").await;
        let regular = insert(&repo, "Regular", "Guest").await;
        let never = insert(&repo, "Never", "Booked").await;
        book(&pool, light.id.expect("id"), 2).await;
        book(&pool, regular.id.expect("id"), 7).await;

        let ranked = repo.top_ten().await.expect("top ten");

        assert_eq!(ranked.len(), 2, "customers without reservations are not ranked");
        assert_eq!(ranked[0].customer, regular);
        assert_eq!(ranked[0].reservation_count, 7);
        assert_eq!(ranked[0].count(), ": 7");
        assert_eq!(ranked[1].customer, light);
        assert_eq!(ranked[1].count(), ": 2");
        assert!(ranked.iter().all(|entry| entry.customer.id != never.id));
    }

    #[tokio::test]
    async fn top_ten_is_capped_at_ten_in_descending_order() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool.clone());

        for index in 0..12 {
            let customer = insert(&repo, &format!("Guest{index:02}"), "Patron").await;
            book(&pool, customer.id.expect("id"), index + 1).await;
        }

        let ranked = repo.top_ten().await.expect("top ten");

        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].reservation_count, 12);
        assert_eq!(ranked[9].reservation_count, 3);
        assert!(ranked.windows(2).all(|pair| pair[0].reservation_count > pair[1].reservation_count));
        assert!(ranked.iter().all(|entry| entry.count().starts_with(": ")));
    }

    #[tokio::test]
    async fn reservations_are_delegated_to_the_reservation_repository() {
        let pool = setup().await;
        let customers = SqlCustomerRepository::new(pool.clone());
        let reservations = SqlReservationRepository::new(pool.clone());

        let booked = insert(&customers, "Anna", "Karenina").await;
        let other = insert(&customers, "Leo", "Tolstoy").await;
        book(&pool, booked.id.expect("id"), 3).await;
        book(&pool, other.id.expect("id"), 1).await;

        let found = reservations_for_customer(&booked, &reservations).await.expect("reservations");

        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|reservation| Some(reservation.customer_id) == booked.id));

        let transient = Customer::new("Not", "Saved", None, None);
        let none = reservations_for_customer(&transient, &reservations).await.expect("empty");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn database_errors_propagate_unmodified() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool.clone());
        pool.close().await;

        let error = repo.list_all().await.expect_err("closed pool must fail");

        assert!(matches!(error, RepositoryError::Database(sqlx::Error::PoolClosed)));
        assert_eq!(error.status_code(), None);
    }
}
