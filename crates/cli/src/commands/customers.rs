use clap::{Args, Subcommand};
use serde::Serialize;

use lunchly_core::domain::customer::{Customer, CustomerId};
use lunchly_db::{
    reservations_for_customer, CustomerRepository, SqlCustomerRepository, SqlReservationRepository,
};

use crate::commands::{run_with_pool, CommandFailure, CommandResult};

#[derive(Debug, Clone, Subcommand)]
pub enum CustomersCommand {
    #[command(about = "List every customer ordered by last name, then first name")]
    List,
    #[command(about = "Show one customer together with their reservations")]
    Show { id: i64 },
    #[command(about = "Search by name; a full `first last` match narrows to that customer")]
    Search {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    #[command(about = "Report the ten customers with the most reservations")]
    Top,
    #[command(about = "Create a new customer")]
    Add(NewCustomerArgs),
    #[command(about = "Change fields of an existing customer")]
    Update(UpdateCustomerArgs),
}

#[derive(Debug, Clone, Args)]
pub struct NewCustomerArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct UpdateCustomerArgs {
    pub id: i64,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct CustomerView {
    #[serde(flatten)]
    customer: Customer,
    full_name: String,
}

impl From<Customer> for CustomerView {
    fn from(customer: Customer) -> Self {
        let full_name = customer.full_name();
        Self { customer, full_name }
    }
}

#[derive(Debug, Serialize)]
struct ReservationView {
    id: Option<i64>,
    num_guests: i64,
    start_at: String,
    starts: String,
    notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct CustomerDetail {
    #[serde(flatten)]
    customer: CustomerView,
    reservations: Vec<ReservationView>,
}

#[derive(Debug, Serialize)]
struct RankedView {
    #[serde(flatten)]
    customer: CustomerView,
    reservation_count: i64,
    count: String,
}

pub fn run(command: CustomersCommand) -> CommandResult {
    match command {
        CustomersCommand::List => list(),
        CustomersCommand::Show { id } => show(id),
        CustomersCommand::Search { name } => search(&name.join(" ")),
        CustomersCommand::Top => top(),
        CustomersCommand::Add(args) => add(args),
        CustomersCommand::Update(args) => update(args),
    }
}

pub fn list() -> CommandResult {
    run_with_pool("customers list", |pool| async move {
        let customers = SqlCustomerRepository::new(pool).list_all().await?;
        let views: Vec<CustomerView> = customers.into_iter().map(CustomerView::from).collect();
        Ok(CommandResult::success_with_data(
            "customers list",
            format!("{} customers", views.len()),
            &views,
        ))
    })
}

pub fn show(id: i64) -> CommandResult {
    run_with_pool("customers show", |pool| async move {
        let customers = SqlCustomerRepository::new(pool.clone());
        let reservations = SqlReservationRepository::new(pool);

        let customer = customers.get(CustomerId(id)).await?;
        let booked = reservations_for_customer(&customer, &reservations).await?;
        let detail = CustomerDetail {
            customer: CustomerView::from(customer),
            reservations: booked
                .into_iter()
                .map(|reservation| ReservationView {
                    id: reservation.id.map(|id| id.0),
                    num_guests: reservation.num_guests,
                    start_at: reservation.start_at.to_rfc3339(),
                    starts: reservation.formatted_start_at(),
                    notes: reservation.notes,
                })
                .collect(),
        };

        Ok(CommandResult::success_with_data(
            "customers show",
            format!("{} ({} reservations)", detail.customer.full_name, detail.reservations.len()),
            &detail,
        ))
    })
}

pub fn search(name: &str) -> CommandResult {
    let name = name.to_string();
    run_with_pool("customers search", |pool| async move {
        let customers = SqlCustomerRepository::new(pool).search(&name).await?;
        let views: Vec<CustomerView> = customers.into_iter().map(CustomerView::from).collect();
        Ok(CommandResult::success_with_data(
            "customers search",
            format!("{} customers match `{name}`", views.len()),
            &views,
        ))
    })
}

pub fn top() -> CommandResult {
    run_with_pool("customers top", |pool| async move {
        let ranked = SqlCustomerRepository::new(pool).top_ten().await?;
        let views: Vec<RankedView> = ranked
            .into_iter()
            .map(|entry| RankedView {
                customer: CustomerView::from(entry.customer),
                reservation_count: entry.reservation_count,
                count: entry.display_count,
            })
            .collect();
        Ok(CommandResult::success_with_data(
            "customers top",
            format!("top {} customers by reservations", views.len()),
            &views,
        ))
    })
}

pub fn add(args: NewCustomerArgs) -> CommandResult {
    run_with_pool("customers add", |pool| async move {
        let mut customer = Customer::new(args.first_name, args.last_name, args.phone, args.notes);
        let id = SqlCustomerRepository::new(pool).save(&mut customer).await?;
        Ok(CommandResult::success_with_data(
            "customers add",
            format!("created customer {id}"),
            &CustomerView::from(customer),
        ))
    })
}

pub fn update(args: UpdateCustomerArgs) -> CommandResult {
    run_with_pool("customers update", |pool| async move {
        let no_changes = args.first_name.is_none()
            && args.last_name.is_none()
            && args.phone.is_none()
            && args.notes.is_none();
        if no_changes {
            return Err(CommandFailure::invalid_input(
                "nothing to update: pass at least one of --first-name, --last-name, --phone, --notes",
            ));
        }

        let repo = SqlCustomerRepository::new(pool);
        let mut customer = repo.get(CustomerId(args.id)).await?;
        if let Some(first_name) = args.first_name {
            customer.first_name = first_name;
        }
        if let Some(last_name) = args.last_name {
            customer.last_name = last_name;
        }
        if let Some(phone) = args.phone {
            customer.phone = Some(phone);
        }
        if let Some(notes) = args.notes {
            customer.notes = Some(notes);
        }
        let id = repo.save(&mut customer).await?;

        Ok(CommandResult::success_with_data(
            "customers update",
            format!("updated customer {id}"),
            &CustomerView::from(customer),
        ))
    })
}
