use crate::commands::{
    run_application_command, run_room_search, ApplicationsCommand, RoomSearchArgs,
};
use crate::infra::StorageArgs;
use crate::server;
use clap::{Args, Parser, Subcommand};
use globaldorm::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Global Dorm",
    about = "Serve and manage student room applications from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Submit, cancel, and inspect room applications in the local artifact
    Applications {
        #[command(flatten)]
        storage: StorageArgs,
        #[command(subcommand)]
        command: ApplicationsCommand,
    },
    /// Query the room catalog
    Rooms {
        #[command(subcommand)]
        command: RoomsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RoomsCommand {
    /// Filter rooms by city, price, furnishing, and spoken language
    Search(RoomSearchArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) storage: StorageArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Applications { storage, command } => run_application_command(storage, command),
        Command::Rooms {
            command: RoomsCommand::Search(args),
        } => run_room_search(args),
    }
}
