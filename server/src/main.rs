use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use shared::DEFAULT_PORT;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds between liveness sweeps
    #[arg(long, default_value = "30")]
    ping_interval: u64,

    /// Seconds a player has to answer a liveness probe
    #[arg(long, default_value = "20")]
    pong_timeout: u64,

    /// Seconds to pause between rounds
    #[arg(long, default_value = "2")]
    round_delay: u64,

    /// Seconds a player has to submit a guess or start decision (0 waits forever)
    #[arg(long, default_value = "120")]
    guess_timeout: u64,

    /// Lobby to create at startup; repeat for several (defaults to game1..game3)
    #[arg(long = "lobby")]
    lobbies: Vec<String>,
}

fn bounded(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut config = ServerConfig {
        ping_interval: Duration::from_secs(args.ping_interval.max(1)),
        pong_timeout: Duration::from_secs(args.pong_timeout.max(1)),
        round_delay: Duration::from_secs(args.round_delay),
        guess_timeout: bounded(args.guess_timeout),
        start_timeout: bounded(args.guess_timeout),
        ..ServerConfig::default()
    };
    if !args.lobbies.is_empty() {
        config.default_lobbies = args.lobbies;
    }

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, config).await?;

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
