use crate::infra::{open_catalog, open_lifecycle, StorageArgs};
use chrono::SecondsFormat;
use clap::{Args, Subcommand};
use globaldorm::applications::{
    Application, ApplicationId, LifecycleError, NewApplication, ValidationError,
};
use globaldorm::config::AppConfig;
use globaldorm::error::AppError;
use globaldorm::rooms::{Room, RoomCatalog, RoomQuery};

#[derive(Subcommand, Debug)]
pub(crate) enum ApplicationsCommand {
    /// Apply for a room on behalf of a user
    Apply(ApplyArgs),
    /// Cancel a pending application owned by the user
    Cancel(CancelArgs),
    /// List a user's applications, newest first
    List(ListArgs),
    /// Print the number of stored applications
    Count,
}

#[derive(Args, Debug)]
pub(crate) struct ApplyArgs {
    #[arg(long)]
    pub(crate) room_id: u64,
    #[arg(long)]
    pub(crate) user_id: String,
    /// Contact address stored with the application
    #[arg(long)]
    pub(crate) email: String,
}

#[derive(Args, Debug)]
pub(crate) struct CancelArgs {
    #[arg(long)]
    pub(crate) application_id: u64,
    #[arg(long)]
    pub(crate) user_id: String,
}

#[derive(Args, Debug)]
pub(crate) struct ListArgs {
    #[arg(long)]
    pub(crate) user_id: String,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RoomSearchArgs {
    /// Case-insensitive city match
    #[arg(long)]
    pub(crate) city: Option<String>,
    /// Inclusive upper bound on the monthly price in GBP
    #[arg(long)]
    pub(crate) max_price: Option<f64>,
    #[arg(long)]
    pub(crate) furnished: Option<bool>,
    /// Language spoken in the household
    #[arg(long)]
    pub(crate) language: Option<String>,
    #[command(flatten)]
    pub(crate) storage: StorageArgs,
}

impl RoomSearchArgs {
    fn query(&self) -> RoomQuery {
        RoomQuery {
            city: self.city.clone(),
            max_price: self.max_price.map(|price| price.to_string()),
            furnished: self.furnished.map(|flag| flag.to_string()),
            language: self.language.clone(),
        }
    }
}

pub(crate) fn run_application_command(
    mut storage: StorageArgs,
    command: ApplicationsCommand,
) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    storage.apply(&mut config.storage);
    let lifecycle = open_lifecycle(&config.storage)?;

    match command {
        ApplicationsCommand::Apply(args) => {
            let request = NewApplication::new(args.room_id, &args.user_id, &args.email)
                .map_err(LifecycleError::from)?;
            let catalog = open_catalog(&config.storage)?;
            let room = catalog.room(request.room_id).ok_or(LifecycleError::Validation(
                ValidationError::InvalidField {
                    field: "room_id",
                    reason: "does not match a room in the catalog",
                },
            ))?;
            let room_name = room.name.clone();
            let id = lifecycle.create(request, room)?;
            println!("Application {id} submitted for {room_name}.");
        }
        ApplicationsCommand::Cancel(args) => {
            let id = ApplicationId(args.application_id);
            lifecycle.cancel(id, args.user_id.trim())?;
            println!("Application {id} cancelled.");
        }
        ApplicationsCommand::List(args) => {
            let applications = lifecycle.list_by_user(args.user_id.trim());
            println!(
                "{} application(s) for {}",
                applications.len(),
                args.user_id.trim()
            );
            for application in &applications {
                println!("{}", describe_application(application));
            }
        }
        ApplicationsCommand::Count => {
            println!("{}", lifecycle.count());
        }
    }

    Ok(())
}

pub(crate) fn run_room_search(mut args: RoomSearchArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    args.storage.apply(&mut config.storage);
    let catalog = open_catalog(&config.storage)?;

    let rooms = catalog.search(&args.query());
    println!("{} room(s) match", rooms.len());
    for room in &rooms {
        println!("{}", describe_room(room));
    }
    Ok(())
}

fn describe_application(application: &Application) -> String {
    let mut line = format!(
        "- #{} {} [{}] applied {}",
        application.id,
        application.room_details.name,
        application.status.label(),
        application
            .application_date
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    if let Some(cancelled) = application.cancelled_date {
        line.push_str(&format!(
            ", cancelled {}",
            cancelled.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    line
}

fn describe_room(room: &Room) -> String {
    format!(
        "- #{} {} ({}, {}) £{:.2}/month, {}, available {}",
        room.id,
        room.name,
        room.location.city,
        room.location.postcode,
        room.price_per_month_gbp,
        if room.details.furnished {
            "furnished"
        } else {
            "unfurnished"
        },
        room.availability_date,
    )
}
