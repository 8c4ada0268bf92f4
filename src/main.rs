//! Head gesture controller: turns face mesh landmarks into cursor and gesture commands.

use anyhow::{Context, Result};
use clap::Parser;
use head_gesture_control::{
    app::HeadGestureApp,
    broadcast::{Broadcaster, CursorSnapshot},
    config::{Config, EXAMPLE_CONFIG},
    input::JsonLinesSource,
};
use log::{info, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Address to bind the WebSocket server to
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the WebSocket server to
    #[arg(short, long)]
    port: Option<u16>,

    /// Landmark input as JSON lines (file path, or - for stdin)
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Calibration file to load at startup
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Turn the head left to move the cursor right
    #[arg(long)]
    invert_x: Option<bool>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Head gesture controller starting");

    let config = load_config(&args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let result = runtime.block_on(run(args, config));

    // A blocked stdin read must not hold the process open
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(host) = &args.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(invert_x) = args.invert_x {
        config.control.invert_x = invert_x;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn open_input(input: &str) -> Result<Box<dyn BufRead + Send>> {
    if input == "-" {
        info!("Reading landmarks from stdin");
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        info!("Reading landmarks from {input}");
        let file = File::open(input).with_context(|| format!("Failed to open {input}"))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

async fn run(args: Args, config: Config) -> Result<()> {
    let token = CancellationToken::new();
    let broadcaster = Broadcaster::new(config.server.consumer_queue);
    let (snapshot_tx, snapshot_rx) = watch::channel(CursorSnapshot::default());

    let listener = TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address()))?;
    let server = tokio::spawn(broadcaster.clone().serve(listener, token.clone()));
    let periodic = tokio::spawn(broadcaster.clone().run_periodic(
        snapshot_rx,
        config.server.update_interval(),
        token.clone(),
    ));

    let source = JsonLinesSource::new(open_input(&args.input)?);
    let mut app = HeadGestureApp::new(config, source, broadcaster.clone(), snapshot_tx, token.clone());
    if let Some(path) = &args.calibration {
        app.load_calibration(path)
            .with_context(|| format!("Failed to load calibration {}", path.display()))?;
    }
    let mut sampling = tokio::task::spawn_blocking(move || app.run());

    let outcome = tokio::select! {
        joined = &mut sampling => Some(joined),
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {e}");
            }
            info!("Interrupted");
            None
        }
    };

    token.cancel();
    broadcaster.registry().close();

    if let Err(e) = server.await.context("WebSocket server task panicked")? {
        warn!("{e}");
    }
    periodic.await.context("Periodic sender task panicked")?;

    if let Some(joined) = outcome {
        joined.context("Sampling loop panicked")??;
    }

    info!("Head gesture controller stopped");
    Ok(())
}
