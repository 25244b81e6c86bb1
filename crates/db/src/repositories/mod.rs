use async_trait::async_trait;
use thiserror::Error;

use lunchly_core::domain::customer::{Customer, CustomerId, RankedCustomer};
use lunchly_core::domain::reservation::{Reservation, ReservationId};
use lunchly_core::errors::{ApplicationError, DomainError};

pub mod customer;
pub mod memory;
pub mod reservation;

pub use customer::{reservations_for_customer, SqlCustomerRepository};
pub use memory::{InMemoryCustomerRepository, InMemoryReservationRepository};
pub use reservation::SqlReservationRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("No such {entity}: {id}")]
    NotFound { entity: &'static str, id: i64 },
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl RepositoryError {
    pub(crate) fn decode(error: sqlx::Error) -> Self {
        Self::Decode(error.to_string())
    }

    /// HTTP-equivalent status for errors the calling layer should surface as
    /// such. Only lookups that found nothing carry one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound { .. } => Self::NotFound(value.to_string()),
            RepositoryError::Domain(error) => Self::Domain(error),
            RepositoryError::Database(_) | RepositoryError::Decode(_) => {
                Self::Persistence(value.to_string())
            }
        }
    }
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Every customer, ordered by last name then first name.
    async fn list_all(&self) -> Result<Vec<Customer>, RepositoryError>;

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    /// Like [`find_by_id`](Self::find_by_id) but a missing row is an error.
    async fn get(&self, id: CustomerId) -> Result<Customer, RepositoryError> {
        self.find_by_id(id).await?.ok_or(RepositoryError::NotFound { entity: "customer", id: id.0 })
    }

    /// Inserts a transient customer (assigning its id) or overwrites the
    /// mutable fields of a persisted one.
    async fn save(&self, customer: &mut Customer) -> Result<CustomerId, RepositoryError>;

    async fn search(&self, name: &str) -> Result<Vec<Customer>, RepositoryError>;

    /// The ten customers holding the most reservations, busiest first.
    async fn top_ten(&self) -> Result<Vec<RankedCustomer>, RepositoryError>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn find_by_id(&self, id: ReservationId) -> Result<Option<Reservation>, RepositoryError>;

    /// Reservations held by `customer_id`, earliest first.
    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Reservation>, RepositoryError>;

    async fn save(&self, reservation: &mut Reservation) -> Result<ReservationId, RepositoryError>;
}

pub(crate) const TOP_CUSTOMER_LIMIT: usize = 10;
