use clap::Parser;
use log::info;
use server::auth::MemoryUserDirectory;
use server::network::GameServer;
use std::sync::Arc;

/// Parses command-line arguments, builds the user directory, and runs the
/// relay server until ctrl-c.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "3000")]
        port: u16,
        /// bcrypt cost for newly created user records
        #[clap(long, default_value_t = bcrypt::DEFAULT_COST)]
        bcrypt_cost: u32,
    }

    env_logger::init();
    let args = Args::parse();

    let gateway = Arc::new(MemoryUserDirectory::with_cost(args.bcrypt_cost));

    let address = format!("{}:{}", args.host, args.port);
    let server = GameServer::bind(&address, gateway).await?;

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
        }
    }

    Ok(())
}
