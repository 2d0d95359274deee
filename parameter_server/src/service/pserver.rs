use std::io;

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
    specs::{server::ServerSpec, table::Membership},
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    task::JoinSet,
};

use crate::{
    storage::{StoreHandle, TableStore},
    synchronization::GroupBarrier,
};

/// The central server structure, it handles task management and io between workers.
pub struct ParameterServer {
    tasks: JoinSet<io::Result<()>>,
    spec: ServerSpec,
    handle: StoreHandle,
    barrier: GroupBarrier,
    joined: u32,
}

impl ParameterServer {
    /// Creates a new `ParameterServer`.
    ///
    /// # Arguments
    /// * `spec` - The server specification.
    pub fn new(spec: ServerSpec) -> Self {
        let store = TableStore::new(spec.shard_size.get(), spec.mode);

        Self {
            tasks: JoinSet::new(),
            spec,
            handle: StoreHandle::new(store),
            barrier: GroupBarrier::new(spec.workers.get(), spec.mode),
            joined: 0,
        }
    }

    /// Serves every spawned worker until all of them disconnect.
    ///
    /// # Returns
    /// The first io error of any of the workers' tasks.
    pub async fn run(&mut self) -> io::Result<()> {
        while let Some(res) = self.tasks.join_next().await {
            res??
        }

        Ok(())
    }

    /// Creates an error for when an unexpected message kind is received.
    fn unexpected_message_kind<T>(msg: &Msg) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an unexpected message kind, got: {}", msg.kind()),
        ))
    }

    /// Binds a new worker to this server and spawns it's own serving task.
    ///
    /// Workers get their ids in the order they are spawned.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub fn spawn<R, W>(&mut self, rx: OnoReceiver<R>, tx: OnoSender<W>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let membership = Membership {
            worker_id: self.joined,
            server_id: self.spec.server_id as u32,
            workers: self.spec.workers.get() as u32,
            mode: self.spec.mode,
        };
        self.joined += 1;

        let conn = Connection {
            rx,
            tx,
            membership,
            handle: self.handle.clone(),
            barrier: self.barrier.clone(),
        };

        self.tasks.spawn(conn.serve());
    }
}

/// The serving state of a single worker.
struct Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: OnoReceiver<R>,
    tx: OnoSender<W>,
    membership: Membership,
    handle: StoreHandle,
    barrier: GroupBarrier,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn serve(mut self) -> io::Result<()> {
        let worker_id = self.membership.worker_id;
        let mut rx_buf: Vec<u32> = Vec::new();
        let mut out = Vec::new();
        let mut created = 0;

        loop {
            let msg: Msg = self.rx.recv_into(&mut rx_buf).await?;

            let reply = match msg {
                Msg::Control(Command::Join) => {
                    debug!(worker_id = worker_id; "worker joined");
                    Msg::Control(Command::Welcome(self.membership))
                }
                Msg::Control(Command::NewTable(shape)) => {
                    match self.handle.attach(created, shape).await {
                        Ok(table) => {
                            created += 1;
                            debug!(worker_id = worker_id, table = table; "table attached");
                            Msg::Control(Command::TableCreated { table })
                        }
                        Err(e) => Msg::Err(e.to_string().into()),
                    }
                }
                Msg::Control(Command::Get { table, rows }) => {
                    match self.handle.read(table, rows.as_deref(), &mut out).await {
                        Ok(()) => Msg::Data(Payload::Values(&out)),
                        Err(e) => Msg::Err(e.to_string().into()),
                    }
                }
                Msg::Data(Payload::Add {
                    table,
                    rows,
                    values,
                }) => match self.handle.add(table, rows, values).await {
                    Ok(()) => Msg::Control(Command::Ack),
                    Err(e) => Msg::Err(e.to_string().into()),
                },
                Msg::Control(Command::Barrier) => {
                    self.barrier.wait(&self.handle).await;
                    Msg::Control(Command::Ack)
                }
                Msg::Control(Command::Disconnect) => {
                    self.tx.send(&Msg::Control(Command::Disconnect)).await?;
                    info!(worker_id = worker_id; "worker disconnected");
                    return Ok(());
                }
                msg => {
                    warn!(worker_id = worker_id; "unexpected {} message", msg.kind());
                    return ParameterServer::unexpected_message_kind(&msg);
                }
            };

            if let Msg::Err(e) = &reply {
                warn!(worker_id = worker_id; "rejected request: {e}");
            }

            self.tx.send(&reply).await?;
        }
    }
}
