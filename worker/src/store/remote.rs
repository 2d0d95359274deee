use std::time::Duration;

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
    specs::table::{Membership, TableShape},
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::{
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    runtime::{self, Runtime},
    time::{self, Instant},
};

use super::Store;
use crate::{
    config::ClientConfig,
    error::{Result, WorkerErr},
};

const RETRY_DELAY: Duration = Duration::from_millis(100);

/// A store reached over TCP.
///
/// The calls are blocking, each of them drives the async connection to completion on an
/// owned single threaded runtime. Must not be used from within another tokio runtime.
pub struct RemoteStore {
    runtime: Runtime,
    conn: Mutex<Option<Connection>>,
    membership: Membership,
}

impl RemoteStore {
    /// Connects to the store and joins its worker group.
    ///
    /// Connection attempts are retried until `config.connect_timeout` elapses.
    ///
    /// # Returns
    /// The connected store, or an `Initialization` error.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let runtime = runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| WorkerErr::Initialization(format!("can't start runtime: {e}")))?;

        let (conn, membership) = runtime.block_on(async {
            let stream = open(&config.server, config.connect_timeout).await?;
            let mut conn = Connection::new(stream)?;
            let membership = conn.join().await?;
            Ok::<_, WorkerErr>((conn, membership))
        })?;

        info!(
            worker_id = membership.worker_id,
            workers = membership.workers;
            "joined the store at {}", config.server
        );

        Ok(Self {
            runtime,
            conn: Mutex::new(Some(conn)),
            membership,
        })
    }

    /// Runs `f` over the live connection, dropping it if `f` fails fatally.
    fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Runtime, &mut Connection) -> Result<T>,
    {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(WorkerErr::UninitializedHandle)?;

        let res = f(&self.runtime, conn);
        if res.as_ref().is_err_and(WorkerErr::is_fatal) {
            warn!("dropping the store connection after a fatal error");
            guard.take();
        }

        res
    }
}

impl Store for RemoteStore {
    fn membership(&self) -> Membership {
        self.membership
    }

    fn barrier(&self) -> Result<()> {
        self.with_conn(|rt, conn| rt.block_on(conn.barrier()))
    }

    fn new_table(&self, shape: TableShape) -> Result<u32> {
        self.with_conn(|rt, conn| rt.block_on(conn.new_table(shape)))
    }

    fn get(&self, table: u32, rows: Option<&[u32]>, out: &mut [f32]) -> Result<()> {
        self.with_conn(|rt, conn| rt.block_on(conn.get(table, rows, out)))
    }

    fn add(&self, table: u32, rows: &[u32], values: &[f32]) -> Result<()> {
        self.with_conn(|rt, conn| rt.block_on(conn.add(table, rows, values)))
    }

    fn shutdown(&self) -> Result<()> {
        let Some(mut conn) = self.conn.lock().take() else {
            return Err(WorkerErr::UninitializedHandle);
        };

        self.runtime.block_on(conn.disconnect())?;
        info!(worker_id = self.membership.worker_id; "left the store");
        Ok(())
    }
}

/// Opens a stream to `addr`, retrying until `timeout` elapses.
async fn open(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let deadline = Instant::now() + timeout;

    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) if Instant::now() + RETRY_DELAY < deadline => {
                debug!("store at {addr} unreachable, retrying: {e}");
                time::sleep(RETRY_DELAY).await;
            }
            Err(e) => {
                return Err(WorkerErr::Initialization(format!(
                    "can't reach the store at {addr}: {e}"
                )));
            }
        }
    }
}

/// A joined connection to the store.
struct Connection {
    rx: OnoReceiver<OwnedReadHalf>,
    tx: OnoSender<OwnedWriteHalf>,
    rx_buf: Vec<u32>,
}

impl Connection {
    fn new(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);

        Ok(Self {
            rx,
            tx,
            rx_buf: Vec::new(),
        })
    }

    /// Sends `msg` and waits for its answer, turning error replies into `WorkerErr::Store`.
    async fn request(&mut self, msg: &Msg<'_>) -> Result<Msg<'_>> {
        self.tx.send(msg).await?;

        match self.rx.recv_into(&mut self.rx_buf).await? {
            Msg::Err(reason) => Err(WorkerErr::Store(reason.into_owned())),
            reply => Ok(reply),
        }
    }

    async fn control(&mut self, cmd: Command) -> Result<Msg<'_>> {
        self.request(&Msg::Control(cmd)).await
    }

    async fn ack(&mut self, msg: &Msg<'_>) -> Result<()> {
        match self.request(msg).await? {
            Msg::Control(Command::Ack) => Ok(()),
            other => Err(unexpected("ack", &other)),
        }
    }

    async fn join(&mut self) -> Result<Membership> {
        match self.control(Command::Join).await? {
            Msg::Control(Command::Welcome(membership)) => Ok(membership),
            other => Err(unexpected("welcome", &other)),
        }
    }

    async fn new_table(&mut self, shape: TableShape) -> Result<u32> {
        match self.control(Command::NewTable(shape)).await? {
            Msg::Control(Command::TableCreated { table }) => {
                debug!(table = table; "attached to table {shape:?}");
                Ok(table)
            }
            other => Err(unexpected("table created", &other)),
        }
    }

    async fn get(&mut self, table: u32, rows: Option<&[u32]>, out: &mut [f32]) -> Result<()> {
        let cmd = Command::Get {
            table,
            rows: rows.map(<[u32]>::to_vec),
        };

        match self.control(cmd).await? {
            Msg::Data(Payload::Values(values)) if values.len() == out.len() => {
                out.copy_from_slice(values);
                Ok(())
            }
            Msg::Data(Payload::Values(values)) => Err(WorkerErr::SizeMismatch {
                what: "reply",
                got: values.len(),
                expected: out.len(),
            }),
            other => Err(unexpected("values", &other)),
        }
    }

    async fn add(&mut self, table: u32, rows: &[u32], values: &[f32]) -> Result<()> {
        let msg = Msg::Data(Payload::Add {
            table,
            rows,
            values,
        });

        self.ack(&msg).await
    }

    async fn barrier(&mut self) -> Result<()> {
        self.ack(&Msg::Control(Command::Barrier)).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        match self.control(Command::Disconnect).await? {
            Msg::Control(Command::Disconnect) => Ok(()),
            other => Err(unexpected("disconnect", &other)),
        }
    }
}

fn unexpected(expected: &'static str, got: &Msg) -> WorkerErr {
    WorkerErr::UnexpectedMessage {
        expected,
        got: got.kind(),
    }
}
