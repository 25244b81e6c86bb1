use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub i64);

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerState {
    Transient,
    Persisted,
}

/// A restaurant patron.
///
/// A customer without an `id` has never been written to storage. Once the
/// store hands back an id it never changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Option<CustomerId>,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl Customer {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone: Option<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone,
            notes,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn state(&self) -> CustomerState {
        match self.id {
            Some(_) => CustomerState::Persisted,
            None => CustomerState::Transient,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.state() == CustomerState::Persisted
    }

    pub fn mark_persisted(&mut self, id: CustomerId) -> Result<(), DomainError> {
        match self.id {
            None => {
                self.id = Some(id);
                Ok(())
            }
            Some(current) if current == id => Ok(()),
            Some(current) => Err(DomainError::IdentityReassignment {
                entity: "customer",
                current: current.0,
                requested: id.0,
            }),
        }
    }
}

/// Renders a reservation count the way the top-ten report shows it next to
/// a name, e.g. `": 7"`.
pub fn format_display_count(count: i64) -> String {
    format!(": {count}")
}

/// A customer annotated with how many reservations they hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCustomer {
    pub customer: Customer,
    pub reservation_count: i64,
    pub display_count: String,
}

impl RankedCustomer {
    pub fn new(customer: Customer, reservation_count: i64) -> Self {
        Self { customer, reservation_count, display_count: format_display_count(reservation_count) }
    }

    /// Presentation form of the count (`": <n>"`), not a number.
    pub fn count(&self) -> &str {
        &self.display_count
    }
}

/// First/last name candidates extracted from a free-text name query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchTerms {
    pub first_name: String,
    pub last_name: String,
}

impl SearchTerms {
    /// Two or more words: the first two are the first and last name
    /// candidates. One word (or nothing): that word is both.
    pub fn parse(input: &str) -> Self {
        let mut words = input.split_whitespace();
        match (words.next(), words.next()) {
            (Some(first), Some(last)) => {
                Self { first_name: first.to_string(), last_name: last.to_string() }
            }
            (Some(only), None) => Self { first_name: only.to_string(), last_name: only.to_string() },
            _ => Self { first_name: String::new(), last_name: String::new() },
        }
    }

    /// Partial match: the last name contains the last-name candidate or the
    /// first name contains the first-name candidate, ignoring case across
    /// all of Unicode.
    pub fn matches(&self, customer: &Customer) -> bool {
        contains_ignore_case(&customer.last_name, &self.last_name)
            || contains_ignore_case(&customer.first_name, &self.first_name)
    }

    pub fn is_exact_match(&self, customer: &Customer) -> bool {
        customer.first_name.to_lowercase() == self.first_name.to_lowercase()
            && customer.last_name.to_lowercase() == self.last_name.to_lowercase()
    }

    /// Collapses `matches` to the first customer whose first and last names
    /// both equal the candidates, ignoring case. Without such a customer the
    /// partial matches are returned untouched.
    pub fn narrow(&self, matches: Vec<Customer>) -> Vec<Customer> {
        match matches.iter().position(|customer| self.is_exact_match(customer)) {
            Some(index) => matches.into_iter().nth(index).into_iter().collect(),
            None => matches,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Orders customers by last name, then first name, with byte-wise comparison.
pub fn sort_by_name(customers: &mut [Customer]) {
    customers.sort_by(|a, b| {
        a.last_name.cmp(&b.last_name).then_with(|| a.first_name.cmp(&b.first_name))
    });
}
