mod pserver;

use std::io;

use comms::specs::server::ServerSpec;
use log::info;
use tokio::net::TcpListener;

pub use pserver::ParameterServer;

/// Accepts the whole worker group on `listener` and serves it until every worker disconnects.
///
/// No request is served until all `spec.workers` connections were accepted, worker ids are
/// assigned in accept order.
pub async fn serve(listener: TcpListener, spec: ServerSpec) -> io::Result<()> {
    let workers = spec.workers.get();
    let mut conns = Vec::with_capacity(workers);

    for _ in 0..workers {
        let (stream, addr) = listener.accept().await?;
        info!(worker_id = conns.len(); "accepted worker at {addr}");
        stream.set_nodelay(true)?;
        conns.push(stream.into_split());
    }

    let mut pserver = ParameterServer::new(spec);

    for (rx, tx) in conns {
        let (rx, tx) = comms::channel(rx, tx);
        pserver.spawn(rx, tx);
    }

    info!(workers = workers; "worker group complete");
    pserver.run().await
}
