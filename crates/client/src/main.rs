//! fileshell client
//!
//! Connects to a fileshell daemon and runs an interactive prompt.

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use client::local::error_line;
use client::{prompt, ClientSession, Flow};
use protocol::DirectoryContext;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

/// fileshell client - browse and transfer files on a remote daemon.
#[derive(Parser, Debug)]
#[command(name = "fileshell")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Daemon host name or address
    pub host: String,

    /// Daemon port
    pub port: u16,

    /// Do not draw transfer progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stderr keeps log lines out of command output
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    println!("Attempting to connect to {} on port {}.", cli.host, cli.port);
    let stream = TcpStream::connect((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("Could not connect to {} on port {}", cli.host, cli.port))?;
    println!(
        "Successfully connected to {} on port {}.\n\
         Enter 'q' to quit,\n\
         Enter 'help' to display the help screen.",
        cli.host, cli.port
    );

    let local = DirectoryContext::from_current_dir().context("Failed to read working directory")?;
    let mut session = ClientSession::new(stream, local).with_progress(!cli.no_progress);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", prompt(session.local_dir()));
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!("\nQuitting...");
            break;
        };

        match session.execute(&line).await {
            Ok(Flow::Quit) => {
                println!("Quitting...");
                break;
            }
            Ok(Flow::Continue) => println!(),
            Err(e) => {
                let message = if e.is_disconnect() {
                    "Server closed connection.".to_string()
                } else {
                    e.to_string()
                };
                eprint!("{}", error_line(&message));
                return Err(e.into());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_host_and_port() {
        let cli = Cli::try_parse_from(["fileshell", "127.0.0.1", "12345"]).unwrap();
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 12345);
        assert!(!cli.no_progress);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_flags() {
        let cli =
            Cli::try_parse_from(["fileshell", "example.org", "80", "--no-progress", "-v"]).unwrap();
        assert!(cli.no_progress);
        assert!(cli.verbose);
    }

    #[test]
    fn test_missing_port() {
        assert!(Cli::try_parse_from(["fileshell", "127.0.0.1"]).is_err());
    }
}
