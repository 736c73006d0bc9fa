//! CLI for TinyMQ
//!
//! Subcommands:
//! - `server`: run the broker
//! - `pub`: publish every line read from stdin on a topic
//! - `sub`: subscribe to a topic and print every value received

use std::path::Path;
use std::process::ExitCode;

use clap::{Args, Parser};
use tokio::io::{BufReader, stdin, stdout};
use tracing::{error, info, warn};

use tinymq::broker::Broker;
use tinymq::config::load_config;
use tinymq::peer::{run_publisher, run_subscriber};
use tinymq::transport::start_tcp_server;
use tinymq::utils::logging;

#[derive(Parser)]
#[command(name = "tinymq")]
enum Command {
    /// Start the broker
    Server {
        /// Address to bind (overrides the configuration)
        #[arg(short = 'H', long)]
        host: Option<String>,
        /// Port to listen on (overrides the configuration)
        #[arg(short, long)]
        port: Option<u16>,
        /// Forward retained publishes without storing them
        #[arg(long)]
        no_retain: bool,
        #[command(flatten)]
        log: LogArgs,
    },
    /// Publish one value per line of stdin
    Pub {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(short, long, default_value = "pub 001")]
        id: String,
        #[arg(short, long)]
        topic: String,
        /// Ask the broker to keep the last value for late subscribers
        #[arg(short, long)]
        retain: bool,
        #[command(flatten)]
        log: LogArgs,
    },
    /// Print every value published on a topic
    Sub {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(short, long, default_value = "sub 001")]
        id: String,
        #[arg(short, long)]
        topic: String,
        #[command(flatten)]
        log: LogArgs,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Broker host
    #[arg(short = 'H', long, default_value = "localhost")]
    host: String,
    /// Broker port
    #[arg(short, long, default_value_t = 1883)]
    port: u16,
}

impl TargetArgs {
    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Args)]
struct LogArgs {
    /// Append logs to this file instead of stderr
    #[arg(short, long)]
    log: Option<String>,
    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

impl LogArgs {
    fn init(&self, default_level: &str) -> tinymq::Result<()> {
        let level = if self.debug { "debug" } else { default_level };
        logging::init(level, self.log.as_deref().map(Path::new))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let result = match Command::parse() {
        Command::Server {
            host,
            port,
            no_retain,
            log,
        } => run_server(host, port, no_retain, log).await,
        Command::Pub {
            target,
            id,
            topic,
            retain,
            log,
        } => run_pub(target, id, topic, retain, log).await,
        Command::Sub {
            target,
            id,
            topic,
            log,
        } => run_sub(target, id, topic, log).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // no-op if logging is already set up
            let _ = logging::init("error", None);
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(
    host: Option<String>,
    port: Option<u16>,
    no_retain: bool,
    log: LogArgs,
) -> tinymq::Result<()> {
    let mut config = load_config()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if no_retain {
        config.broker.retain = false;
    }

    let level = if log.debug {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let file = log.log.as_deref().or(config.logging.file.as_deref());
    logging::init(level, file.map(Path::new))?;

    let broker = Broker::with_settings(config.broker.clone()).into_shared();
    start_tcp_server(&config, broker, ctrl_c()).await
}

async fn run_pub(
    target: TargetArgs,
    id: String,
    topic: String,
    retain: bool,
    log: LogArgs,
) -> tinymq::Result<()> {
    log.init("info")?;
    let input = BufReader::new(stdin());
    let published = run_publisher(&target.addr(), &id, &topic, retain, input).await?;
    info!("done, {published} value(s) sent");
    Ok(())
}

async fn run_sub(
    target: TargetArgs,
    id: String,
    topic: String,
    log: LogArgs,
) -> tinymq::Result<()> {
    log.init("info")?;
    let received = run_subscriber(&target.addr(), &id, &topic, stdout(), ctrl_c()).await?;
    info!("done, {received} value(s) received");
    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
