use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;

use lunchly_core::domain::customer::CustomerId;
use lunchly_core::domain::reservation::Reservation;
use lunchly_db::{
    CustomerRepository, ReservationRepository, SqlCustomerRepository, SqlReservationRepository,
};

use crate::commands::{run_with_pool, CommandFailure, CommandResult};

#[derive(Debug, Clone, Subcommand)]
pub enum ReservationsCommand {
    #[command(about = "Book a reservation for an existing customer")]
    Add(NewReservationArgs),
    #[command(about = "List a customer's reservations in start order")]
    List {
        #[arg(long)]
        customer: i64,
    },
}

#[derive(Debug, Clone, Args)]
pub struct NewReservationArgs {
    #[arg(long)]
    pub customer: i64,
    #[arg(long)]
    pub guests: i64,
    #[arg(long, help = "Start time in RFC 3339, e.g. 2026-09-01T19:30:00Z")]
    pub start_at: String,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReservationView {
    #[serde(flatten)]
    reservation: Reservation,
    starts: String,
}

impl From<Reservation> for ReservationView {
    fn from(reservation: Reservation) -> Self {
        let starts = reservation.formatted_start_at();
        Self { reservation, starts }
    }
}

pub fn run(command: ReservationsCommand) -> CommandResult {
    match command {
        ReservationsCommand::Add(args) => add(args),
        ReservationsCommand::List { customer } => list(customer),
    }
}

fn parse_start_at(raw: &str) -> Result<DateTime<Utc>, CommandFailure> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|start_at| start_at.with_timezone(&Utc))
        .map_err(|error| {
            CommandFailure::invalid_input(format!("invalid --start-at `{raw}`: {error}"))
        })
}

pub fn add(args: NewReservationArgs) -> CommandResult {
    run_with_pool("reservations add", |pool| async move {
        let start_at = parse_start_at(&args.start_at)?;
        if args.guests < 1 {
            return Err(CommandFailure::invalid_input(format!(
                "--guests must be at least 1, got {}",
                args.guests
            )));
        }

        let customer =
            SqlCustomerRepository::new(pool.clone()).get(CustomerId(args.customer)).await?;
        let customer_id = customer.id.unwrap_or(CustomerId(args.customer));

        let mut reservation = Reservation::new(customer_id, args.guests, start_at, args.notes);
        let id = SqlReservationRepository::new(pool).save(&mut reservation).await?;

        Ok(CommandResult::success_with_data(
            "reservations add",
            format!("booked reservation {} for {}", id.0, customer.full_name()),
            &ReservationView::from(reservation),
        ))
    })
}

pub fn list(customer: i64) -> CommandResult {
    run_with_pool("reservations list", |pool| async move {
        let customer = SqlCustomerRepository::new(pool.clone()).get(CustomerId(customer)).await?;
        let reservations = match customer.id {
            Some(id) => SqlReservationRepository::new(pool).list_for_customer(id).await?,
            None => Vec::new(),
        };
        let views: Vec<ReservationView> =
            reservations.into_iter().map(ReservationView::from).collect();

        Ok(CommandResult::success_with_data(
            "reservations list",
            format!("{} reservations for {}", views.len(), customer.full_name()),
            &views,
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::parse_start_at;

    #[test]
    fn start_at_accepts_offsets_and_normalizes_to_utc() {
        let parsed = parse_start_at("2026-09-01T19:30:00+02:00").expect("valid");
        assert_eq!(parsed.to_rfc3339(), "2026-09-01T17:30:00+00:00");
    }

    #[test]
    fn start_at_rejects_non_rfc3339_input() {
        let failure = parse_start_at("next tuesday").expect_err("invalid");
        assert_eq!((failure.error_class, failure.exit_code), ("invalid_input", 8));
    }
}
