use chatfx_cli::commands;
use chatfx_cli::logging;
use clap::{Parser, Subcommand};

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();
    let _guard = logging::init();

    match cli.command {
        Command::Run => commands::run().await,
        Command::Login => commands::login().await,
        Command::Events => commands::show_events(),
        Command::Config => commands::show_config(),
    }
}

#[derive(Parser)]
#[command(name = "chatfx", version, about = "Twitch-triggered event engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authorize, connect and run a session with the operator console
    Run,
    /// Run the browser authorization once and print the account
    Login,
    /// Print the event catalog
    Events,
    /// Print the resolved configuration and its location
    Config,
}
