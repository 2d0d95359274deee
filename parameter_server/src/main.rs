use std::io;

use log::info;
use parameter_server::{config::ServerConfig, service};
use tokio::{net::TcpListener, signal};

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let ServerConfig { addr, spec } = ServerConfig::from_env()?;

    let listener = TcpListener::bind(&addr).await?;
    info!(
        server_id = spec.server_id,
        workers = spec.workers.get(),
        shard_size = spec.shard_size.get();
        "listening at {addr} in {} mode", spec.mode
    );

    tokio::select! {
        ret = service::serve(listener, spec) => ret?,
        _ = signal::ctrl_c() => info!("received SIGINT"),
    }

    info!("shutting down");
    Ok(())
}
