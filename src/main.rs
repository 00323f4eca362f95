//! PollKV - A Poll-Driven, Pipelined RESP Client
//!
//! A small host application around the driver: it reads commands from
//! stdin (one per line, whitespace separated), pipelines all of them, and
//! prints the replies in order. Everything runs on this one thread through
//! repeated `update` calls.

use anyhow::{bail, Context};
use pollkv::{Client, ClientConfig, Pipeline, Reply, ReplySink};
use std::io::{self, BufRead};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Command-line configuration
struct Config {
    /// Host to connect to
    host: String,
    /// Port to connect to
    port: u16,
    /// How long a connection attempt may take
    connect_timeout: Duration,
    /// Budget for each `update` call
    poll: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: pollkv::DEFAULT_HOST.to_string(),
            port: pollkv::DEFAULT_PORT,
            connect_timeout: Duration::from_millis(1000),
            poll: Duration::from_millis(10),
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> anyhow::Result<Self> {
        let mut config = Config::default();
        let mut args = std::env::args().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => {
                    config.host = args.next().context("--host requires a value")?;
                }
                "--port" | "-p" => {
                    let value = args.next().context("--port requires a value")?;
                    config.port = value.parse().context("invalid port number")?;
                }
                "--connect-timeout" => {
                    let value = args.next().context("--connect-timeout requires a value")?;
                    config.connect_timeout =
                        Duration::from_millis(value.parse().context("invalid timeout")?);
                }
                "--poll" => {
                    let value = args.next().context("--poll requires a value")?;
                    config.poll = Duration::from_millis(value.parse().context("invalid poll")?);
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("PollKV version {}", pollkv::VERSION);
                    std::process::exit(0);
                }
                other => {
                    print_help();
                    bail!("unknown argument: {}", other);
                }
            }
        }

        Ok(config)
    }
}

fn print_help() {
    println!(
        r#"
PollKV - A Poll-Driven, Pipelined RESP Client

USAGE:
    pollkv [OPTIONS] < commands.txt

OPTIONS:
    -h, --host <HOST>             Host to connect to (default: 127.0.0.1)
    -p, --port <PORT>             Port to connect to (default: 6379)
        --connect-timeout <MS>    Connection attempt timeout (default: 1000)
        --poll <MS>               Budget for each update call (default: 10)
    -v, --version                 Print version information
        --help                    Print this help message

EXAMPLES:
    printf 'SET name Ariz\nGET name\n' | pollkv
    pollkv --port 6380 < commands.txt
"#
    );
}

/// Prints replies as they arrive and remembers lifecycle events.
#[derive(Default)]
struct Console {
    connected: Option<bool>,
    disconnected: bool,
    replies: usize,
}

impl ReplySink for Console {
    fn on_connect(&mut self, success: bool) {
        self.connected = Some(success);
    }

    fn on_disconnect(&mut self) {
        self.disconnected = true;
    }

    fn on_reply(&mut self, reply: Reply, _pipeline: &mut Pipeline) {
        self.replies += 1;
        println!("{}", reply);
    }
}

fn read_commands() -> anyhow::Result<Vec<Vec<String>>> {
    let mut commands = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if !args.is_empty() {
            commands.push(args);
        }
    }
    Ok(commands)
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_args()?;

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let commands = read_commands()?;

    let mut client = Client::new(ClientConfig::default());
    let mut console = Console::default();

    client.connect(&config.host, config.port, config.connect_timeout)?;
    while console.connected.is_none() {
        client.update(config.poll, &mut console);
    }
    if console.connected == Some(false) {
        bail!("could not connect to {}:{}", config.host, config.port);
    }
    info!("Connected to {}:{}", config.host, config.port);

    let mut expected = 0;
    for args in &commands {
        match client.command(args.as_slice()) {
            Ok(()) => expected += 1,
            Err(e) => eprintln!("(skipped) {}: {}", args.join(" "), e),
        }
    }
    debug!(commands = expected, "Pipelined commands");

    while console.replies < expected && !console.disconnected {
        client.update(config.poll, &mut console);
    }
    if console.disconnected {
        bail!(
            "connection lost after {} of {} replies",
            console.replies,
            expected
        );
    }

    client.disconnect();
    Ok(())
}
