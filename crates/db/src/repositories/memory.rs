use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use lunchly_core::domain::customer::{
    sort_by_name, Customer, CustomerId, RankedCustomer, SearchTerms,
};
use lunchly_core::domain::reservation::{Reservation, ReservationId};

use super::{CustomerRepository, RepositoryError, ReservationRepository, TOP_CUSTOMER_LIMIT};

struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { rows: BTreeMap::new(), last_id: 0 }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<Table<Customer>>,
    reservations: Option<Arc<InMemoryReservationRepository>>,
}

impl InMemoryCustomerRepository {
    /// Ranks customers by the reservations held in `reservations`. Without a
    /// linked reservation store nobody has reservations to rank.
    pub fn with_reservations(reservations: Arc<InMemoryReservationRepository>) -> Self {
        Self { customers: RwLock::default(), reservations: Some(reservations) }
    }
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn list_all(&self) -> Result<Vec<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        let mut all: Vec<Customer> = customers.rows.values().cloned().collect();
        sort_by_name(&mut all);
        Ok(all)
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(customers.rows.get(&id.0).cloned())
    }

    async fn save(&self, customer: &mut Customer) -> Result<CustomerId, RepositoryError> {
        let mut customers = self.customers.write().await;
        match customer.id {
            None => {
                let id = CustomerId(customers.next_id());
                customer.mark_persisted(id)?;
                customers.rows.insert(id.0, customer.clone());
                Ok(id)
            }
            Some(id) => {
                if let Some(existing) = customers.rows.get_mut(&id.0) {
                    *existing = customer.clone();
                }
                Ok(id)
            }
        }
    }

    async fn search(&self, name: &str) -> Result<Vec<Customer>, RepositoryError> {
        let terms = SearchTerms::parse(name);
        let customers = self.customers.read().await;

        let mut matches: Vec<Customer> = customers
            .rows
            .values()
            .filter(|customer| terms.matches(customer))
            .cloned()
            .collect();
        sort_by_name(&mut matches);

        Ok(terms.narrow(matches))
    }

    async fn top_ten(&self) -> Result<Vec<RankedCustomer>, RepositoryError> {
        let counts = match &self.reservations {
            Some(reservations) => reservations.counts_by_customer().await,
            None => HashMap::new(),
        };
        let customers = self.customers.read().await;

        let mut ranked: Vec<RankedCustomer> = customers
            .rows
            .values()
            .filter_map(|customer| {
                let id = customer.id?;
                counts.get(&id).map(|count| RankedCustomer::new(customer.clone(), *count))
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.reservation_count
                .cmp(&a.reservation_count)
                .then_with(|| a.customer.last_name.cmp(&b.customer.last_name))
                .then_with(|| a.customer.first_name.cmp(&b.customer.first_name))
                .then_with(|| a.customer.id.cmp(&b.customer.id))
        });
        ranked.truncate(TOP_CUSTOMER_LIMIT);

        Ok(ranked)
    }
}

#[derive(Default)]
pub struct InMemoryReservationRepository {
    reservations: RwLock<Table<Reservation>>,
}

impl InMemoryReservationRepository {
    pub async fn counts_by_customer(&self) -> HashMap<CustomerId, i64> {
        let reservations = self.reservations.read().await;
        let mut counts = HashMap::new();
        for reservation in reservations.rows.values() {
            *counts.entry(reservation.customer_id).or_insert(0) += 1;
        }
        counts
    }
}

#[async_trait::async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn find_by_id(&self, id: ReservationId) -> Result<Option<Reservation>, RepositoryError> {
        let reservations = self.reservations.read().await;
        Ok(reservations.rows.get(&id.0).cloned())
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let reservations = self.reservations.read().await;
        let mut listed: Vec<Reservation> = reservations
            .rows
            .values()
            .filter(|reservation| reservation.customer_id == customer_id)
            .cloned()
            .collect();
        listed.sort_by_key(|reservation| reservation.start_at);
        Ok(listed)
    }

    async fn save(&self, reservation: &mut Reservation) -> Result<ReservationId, RepositoryError> {
        let mut reservations = self.reservations.write().await;
        match reservation.id {
            None => {
                let id = ReservationId(reservations.next_id());
                reservation.mark_persisted(id)?;
                reservations.rows.insert(id.0, reservation.clone());
                Ok(id)
            }
            Some(id) => {
                if let Some(existing) = reservations.rows.get_mut(&id.0) {
                    *existing = reservation.clone();
                }
                Ok(id)
            }
        }
    }
}
