#![allow(dead_code)]

use std::{
    io,
    net::{SocketAddr, TcpListener},
    num::NonZeroUsize,
    thread::{self, JoinHandle},
    time::Duration,
};

use comms::specs::server::{ServerSpec, SyncMode};
use worker::{Session, config::ClientConfig};

/// Runs a store for `workers` on an ephemeral port, in a background thread.
pub fn start_store(workers: usize, mode: SyncMode) -> (SocketAddr, JoinHandle<io::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();

    let spec = ServerSpec {
        server_id: 0,
        workers: NonZeroUsize::new(workers).unwrap(),
        shard_size: NonZeroUsize::new(16).unwrap(),
        mode,
    };

    let handle = thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener)?;
            parameter_server::service::serve(listener, spec).await
        })
    });

    (addr, handle)
}

pub fn config(addr: SocketAddr) -> ClientConfig {
    ClientConfig {
        server: addr.to_string(),
        connect_timeout: Duration::from_secs(5),
    }
}

/// Connects `workers` sessions concurrently, each one handed to `f` on its own thread.
///
/// Worker ids follow the order in which the store accepted the connections.
pub fn run_group<F>(addr: SocketAddr, workers: usize, f: F)
where
    F: Fn(Session) + Send + Sync,
{
    let config = config(addr);

    thread::scope(|s| {
        for _ in 0..workers {
            let (config, f) = (&config, &f);
            s.spawn(move || f(Session::connect(config).unwrap()));
        }
    });
}
