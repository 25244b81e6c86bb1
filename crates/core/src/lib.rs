pub mod config;
pub mod domain;
pub mod errors;

pub use domain::customer::{
    format_display_count, Customer, CustomerId, CustomerState, RankedCustomer, SearchTerms,
};
pub use domain::reservation::{Reservation, ReservationId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
