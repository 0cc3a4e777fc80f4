use clap::Parser;
use client::network::Client;
use log::info;
use tokio::io::BufReader;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:13337")]
    server: String,

    /// Nickname to identify with; prompted for when omitted
    #[arg(short = 'n', long)]
    nickname: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let input = BufReader::new(tokio::io::stdin());
    let mut client = Client::connect(&args.server, input, args.nickname).await?;

    client.run().await?;

    Ok(())
}
