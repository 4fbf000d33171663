//! Interactive client for the Workdesk data server
//! Logs in once, then runs catalog commands and prints records as JSON lines

mod repl;

use anyhow::{Context, Result};
use clap::Parser;
use repl::{parse_line, ReplInput, HELP};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use workdesk_client::Client;
use workdesk_core::{catalog, ClientConfig, CoreError};

#[derive(Parser, Debug)]
#[command(author = "Workdesk Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line client for the Workdesk data server", long_about = None)]
struct Args {
    /// Server address as host:port [default: 127.0.0.1:5000]
    #[arg(short, long)]
    connect: Option<String>,

    /// Login user (prompted when omitted)
    #[arg(short, long)]
    user: Option<String>,

    /// Login password (prompted when omitted)
    #[arg(short, long, env = "WORKDESK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// JSON config file [default: <config dir>/workdesk/client.json]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Give up on a command after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

type InputLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level)?;

    let config = build_config(&args)?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let user = match args.user.clone() {
        Some(user) => user,
        None => prompt(&mut input, "User: ").await?,
    };
    let password = match args.password.clone() {
        Some(password) => password,
        None => prompt(&mut input, "Password: ").await?,
    };

    let client = Client::new(config);
    let me = match client.login(&user, &password).await {
        Ok(me) => me,
        Err(CoreError::AuthFailed { message }) => anyhow::bail!("Login rejected: {}", message),
        Err(e) => return Err(e).context("Login failed"),
    };
    println!("Logged in as {} ({}, {})", me.name, me.role, me.department_name);
    println!("Type /help for commands");

    run_repl(&client, &mut input).await?;

    client.logout().await;
    println!("Logged out");
    Ok(())
}

async fn run_repl(client: &Client, input: &mut InputLines) -> Result<()> {
    loop {
        let line = tokio::select! {
            line = prompt_line(input, "> ") => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse_line(&line) {
            ReplInput::Empty => {}
            ReplInput::Exit => break,
            ReplInput::Help => println!("{}", HELP),
            ReplInput::ListCommands => {
                for spec in catalog::CATALOG {
                    println!("{:<28} {}", spec.name, spec.params.join("|"));
                }
            }
            ReplInput::WhoAmI => match client.current_user().await {
                Some(user) => println!("{}", serde_json::to_string(&user)?),
                None => println!("Not logged in"),
            },
            ReplInput::UnknownBuiltin(name) => eprintln!("Unknown command: /{}", name),
            ReplInput::Command { name, args } => match client.execute(&name, args).await {
                Ok(records) => {
                    for record in &records {
                        println!("{}", serde_json::to_string(record)?);
                    }
                    println!("({} records)", records.len());
                }
                Err(e) => {
                    debug!("{} failed: {:?}", name, e);
                    eprintln!("Error: {}", e.user_message());
                    if e.is_transport_failure() && !client.is_connected().await {
                        eprintln!("Connection lost; exiting");
                        break;
                    }
                }
            },
        }
    }
    Ok(())
}

fn build_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ClientConfig::load_or_default().context("Failed to load default config")?,
    };

    if let Some(addr) = &args.connect {
        let (host, port) = addr
            .rsplit_once(':')
            .with_context(|| format!("Expected host:port, got {}", addr))?;
        config.host = host.to_string();
        config.port = port.parse().with_context(|| format!("Invalid port in {}", addr))?;
    }
    if let Some(ms) = args.timeout_ms {
        config = config.with_command_timeout(Duration::from_millis(ms));
    }
    Ok(config)
}

async fn prompt(input: &mut InputLines, label: &str) -> Result<String> {
    prompt_line(input, label)
        .await?
        .map(|line| line.trim().to_string())
        .context("Input closed")
}

async fn prompt_line(input: &mut InputLines, label: &str) -> Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(input.next_line().await?)
}

fn setup_logging(level: &str) -> Result<()> {
    let log_level = level.parse::<Level>().unwrap_or(Level::WARN);

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
