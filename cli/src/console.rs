//! Operator console
//!
//! Lines typed while the session runs are tokenized with shlex and parsed
//! as a clap subcommand, so `--help` works mid-session. A blocking stdin
//! thread forwards parsed commands to the session loop; parse errors print
//! locally and never reach the session.

use std::io::Write;
use std::thread;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "chatfx", about = "session console", disable_version_flag = true)]
struct ConsoleCli {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Debug, PartialEq, Subcommand)]
pub enum ConsoleCommand {
    /// List registered events and their bit costs
    Events,

    /// Register an announcing event while the session runs
    Register {
        id: String,

        /// 0 keeps the event name-only
        #[arg(long, default_value_t = 0)]
        bits: u32,

        #[arg(long, default_value_t = 0.0)]
        cooldown: f32,

        /// Chat line sent when the event fires; `{event}` and `{user}` are
        /// substituted
        #[arg(long)]
        announce: Option<String>,
    },

    /// Remove an event
    Unregister { id: String },

    /// Change an event's bit cost (0 disables amount triggering)
    Cost { id: String, bits: u32 },

    /// Send a line to the joined channel
    Say { text: Vec<String> },

    /// Run a line through the chat rules as if it arrived from chat
    Inject {
        /// Sender to impersonate; defaults to the streamer
        #[arg(long)]
        user: Option<String>,

        text: Vec<String>,
    },

    /// Show queue, cooldown and hype train state
    Status,

    /// Disconnect and exit
    #[command(alias = "exit")]
    Quit,
}

pub fn parse_line(line: &str) -> Result<ConsoleCommand, String> {
    let mut args = shlex::split(line).ok_or("error: invalid quoting")?;
    args.insert(0, "chatfx".to_string());
    let cli = ConsoleCli::try_parse_from(args).map_err(|e| e.to_string())?;
    Ok(cli.command)
}

/// Read stdin until EOF, a closed session, or a `quit` command.
pub fn spawn_reader(commands: mpsc::Sender<ConsoleCommand>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        loop {
            print!("> ");
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match parse_line(line) {
                Ok(command) => {
                    let quit = matches!(command, ConsoleCommand::Quit);
                    if commands.blocking_send(command).is_err() || quit {
                        break;
                    }
                }
                Err(err) => println!("{err}"),
            }
        }
    })
}
