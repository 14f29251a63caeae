use clap::Subcommand;
use serde_json::json;

use crate::api::HttpCrudApi;
use crate::cli::config::CliContext;
use crate::cli::utils::{output_descriptor, output_records, output_success, read_json_input};
use crate::cli::OutputFormat;
use crate::entity::{Entity, LogEntry, Room, Service, Staff};
use crate::error::{ErrorDescriptor, ErrorKind};
use crate::list::EntityListController;
use crate::session::{DashboardPage, SessionGuard};

/// Entity shown on a dashboard page.
pub trait DashboardEntity: Entity<Id = String> {
    const PAGE: DashboardPage;
}

impl DashboardEntity for Staff {
    const PAGE: DashboardPage = DashboardPage::StaffManagement;
}

impl DashboardEntity for Room {
    const PAGE: DashboardPage = DashboardPage::RoomManagement;
}

impl DashboardEntity for Service {
    const PAGE: DashboardPage = DashboardPage::ServiceManagement;
}

impl DashboardEntity for LogEntry {
    const PAGE: DashboardPage = DashboardPage::SystemLogs;
}

type Controller<T> = EntityListController<T, HttpCrudApi<T>>;

#[derive(Subcommand)]
pub enum EntityCommands {
    #[command(about = "List records")]
    List {
        #[arg(long, help = "Case-insensitive text to search for in any field")]
        query: Option<String>,
        #[arg(long, help = "Sort by field; repeat the same field to reverse")]
        sort: Vec<String>,
    },

    #[command(about = "Create a record from --data or stdin")]
    Add {
        #[arg(long, help = "JSON object of field values")]
        data: Option<String>,
    },

    #[command(about = "Update a record from --data or stdin")]
    Edit {
        #[arg(help = "Record ID to update")]
        id: String,
        #[arg(long, help = "JSON object of changed field values")]
        data: Option<String>,
    },

    #[command(about = "Delete a record")]
    Delete {
        #[arg(help = "Record ID to delete")]
        id: String,
    },
}

#[derive(Subcommand)]
pub enum StaffCommands {
    #[command(flatten)]
    Common(EntityCommands),

    #[command(about = "Change the role of a staff member")]
    AssignRole {
        #[arg(help = "Staff ID")]
        id: String,
        #[arg(help = "New role (Receptionist, Manager, Housekeeping)")]
        role: String,
    },
}

#[derive(Subcommand)]
pub enum LogCommands {
    #[command(about = "List audit log entries")]
    List {
        #[arg(long, help = "Case-insensitive text to search for in any field")]
        query: Option<String>,
        #[arg(long, help = "Sort by field; repeat the same field to reverse")]
        sort: Vec<String>,
    },
}

pub async fn handle<T: DashboardEntity>(
    cmd: EntityCommands,
    context: &CliContext,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let guard = context.open_page(T::PAGE)?;
    let mut list: Controller<T> = EntityListController::new(HttpCrudApi::new(context.client.clone()));

    match cmd {
        EntityCommands::List { query, sort } => {
            list_records(&guard, &mut list, query, sort, &output_format).await
        }
        EntityCommands::Add { data } => {
            let draft = read_json_input(data)?;
            let key = T::RESOURCE.item_key;
            let created = settle(&guard, &output_format, list.create(&draft).await)?;
            output_success(
                &output_format,
                &format!("Created {} {}", T::RESOURCE.label, created.id()),
                Some(json!({ key: created })),
            )
        }
        EntityCommands::Edit { id, data } => {
            let patch = read_json_input(data)?;
            let key = T::RESOURCE.item_key;
            settle(&guard, &output_format, list.load().await)?;
            let updated = settle(&guard, &output_format, list.update(&id, &patch).await)?;
            output_success(
                &output_format,
                &format!("Updated {} {}", T::RESOURCE.label, id),
                Some(json!({ key: updated })),
            )
        }
        EntityCommands::Delete { id } => {
            settle(&guard, &output_format, list.remove(&id).await)?;
            output_success(
                &output_format,
                &format!("Deleted {} {}", T::RESOURCE.label, id),
                Some(json!({ "id": id })),
            )
        }
    }
}

pub async fn handle_staff(
    cmd: StaffCommands,
    context: &CliContext,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        StaffCommands::Common(cmd) => handle::<Staff>(cmd, context, output_format).await,
        StaffCommands::AssignRole { id, role } => {
            if !Staff::is_known_role(&role) {
                anyhow::bail!("Unknown role '{}', expected one of: {}", role, Staff::ROLES.join(", "));
            }

            let guard = context.open_page(Staff::PAGE)?;
            let mut list: Controller<Staff> = EntityListController::new(HttpCrudApi::new(context.client.clone()));
            settle(&guard, &output_format, list.load().await)?;
            let updated = settle(&guard, &output_format, list.update(&id, &json!({ "role": role })).await)?;
            output_success(
                &output_format,
                &format!("{} is now {}", updated.name, updated.role),
                Some(json!({ "staff": updated })),
            )
        }
    }
}

pub async fn handle_logs(
    cmd: LogCommands,
    context: &CliContext,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let guard = context.open_page(LogEntry::PAGE)?;
    let mut list: Controller<LogEntry> = EntityListController::new(HttpCrudApi::new(context.client.clone()));

    match cmd {
        LogCommands::List { query, sort } => {
            list_records(&guard, &mut list, query, sort, &output_format).await
        }
    }
}

async fn list_records<T: DashboardEntity>(
    guard: &SessionGuard,
    list: &mut Controller<T>,
    query: Option<String>,
    sort: Vec<String>,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    if let Some(field) = sort.iter().find(|f| !T::SORT_FIELDS.contains(&f.as_str())) {
        anyhow::bail!(
            "Cannot sort {} records by '{}', expected one of: {}",
            T::RESOURCE.label,
            field,
            T::SORT_FIELDS.join(", ")
        );
    }

    settle(guard, output_format, list.load().await)?;
    if let Some(query) = query {
        list.set_query(query);
    }
    for field in &sort {
        list.set_sort(field);
    }

    output_records(output_format, T::RESOURCE.collection_key, &list.rendered())
}

/// Report a failed operation. A rejected credential also ends the session.
pub(super) fn settle<V>(
    guard: &SessionGuard,
    output_format: &OutputFormat,
    result: Result<V, ErrorDescriptor>,
) -> anyhow::Result<V> {
    match result {
        Ok(value) => Ok(value),
        Err(error) => {
            if error.kind == ErrorKind::Auth {
                guard.expire();
            }
            output_descriptor(output_format, &error)?;
            Err(anyhow::anyhow!("{}", error.message))
        }
    }
}
