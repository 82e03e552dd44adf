use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    AddCommand, ConfigCommand, DeleteCommand, EditCommand, ListCommand, LoginCommand,
    ShowCommand, StatusCommand, SyncCommand,
};
use recipe_sync::config::Config;
use recipe_sync::open_client;

#[derive(Parser)]
#[command(name = "recipes")]
#[command(version)]
#[command(about = "Offline-first recipe book that syncs with a recipe server", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a recipe
    Add(AddCommand),

    /// Change a recipe's title or text
    Edit(EditCommand),

    /// List recipes
    List(ListCommand),

    /// Show a recipe
    Show(ShowCommand),

    /// Delete a recipe locally and on the server
    Delete(DeleteCommand),

    /// Log in to a recipe server
    Login(LoginCommand),

    /// Forget the saved token
    Logout,

    /// Sync with the server
    Sync(SyncCommand),

    /// Show session and per-recipe sync status
    Status(StatusCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };
    if let Commands::Config(cmd) = &command {
        return cmd.run(&config);
    }

    let client = open_client(&config).await?;
    match command {
        Commands::Add(cmd) => cmd.run(&client).await?,
        Commands::Edit(cmd) => cmd.run(&client).await?,
        Commands::List(cmd) => cmd.run(&client).await?,
        Commands::Show(cmd) => cmd.run(&client).await?,
        Commands::Delete(cmd) => cmd.run(&client).await?,
        Commands::Login(cmd) => cmd.run(&client, &config).await?,
        Commands::Logout => {
            client.logout()?;
            println!("Logged out.");
        }
        Commands::Sync(cmd) => cmd.run(&client).await?,
        Commands::Status(cmd) => cmd.run(&client).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}
