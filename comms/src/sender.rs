//! Writes length prefixed frames.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LEN_TYPE_SIZE, LenType, Serialize};

/// Writing half of a framed connection.
///
/// The encoding buffer is kept between sends, so steady traffic doesn't allocate.
pub struct OnoSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    frame: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            frame: Vec::new(),
        }
    }

    /// Encodes `msg` and writes it as a single frame, then flushes.
    ///
    /// A trailing section returned by `Serialize::serialize` is written from the caller's
    /// memory, it's only accounted for in the length prefix.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        self.frame.clear();
        self.frame.resize(LEN_TYPE_SIZE, 0);

        let tail = msg.serialize(&mut self.frame)?.unwrap_or_default();
        let body_len = self.frame.len() - LEN_TYPE_SIZE + tail.len();
        self.frame[..LEN_TYPE_SIZE].copy_from_slice(&(body_len as LenType).to_be_bytes());

        self.tx.write_all(&self.frame).await?;
        if !tail.is_empty() {
            self.tx.write_all(tail).await?;
        }

        self.tx.flush().await
    }
}
