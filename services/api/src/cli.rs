use crate::server;
use clap::{Args, Parser, Subcommand};
use enrollments::config::AppConfig;
use enrollments::lookup::{PostalLookup, ViaCepClient};
use enrollments::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Event Enrollment Service",
    about = "Run the event enrollment service or resolve a postal code from the command line",
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
    /// Resolve a postal code against the configured lookup endpoint
    Lookup(LookupArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct LookupArgs {
    /// Postal code to resolve, e.g. 01001-000
    postal_code: String,
}

async fn run_lookup(args: LookupArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let client = ViaCepClient::new(config.lookup.base_url);
    let resolved = client.resolve(args.postal_code.trim()).await?;

    println!("street:       {}", resolved.street);
    println!("complement:   {}", resolved.complement);
    println!("neighborhood: {}", resolved.neighborhood);
    println!("city:         {}", resolved.city);
    println!("state:        {}", resolved.state);
    Ok(())
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Lookup(args) => run_lookup(args).await,
    }
}
