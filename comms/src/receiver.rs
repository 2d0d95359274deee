//! Reads length prefixed frames.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Align4, Deserialize, LEN_TYPE_SIZE, LenType};

/// Reading half of a framed connection.
pub struct OnoReceiver<R: AsyncRead + Unpin> {
    rx: R,
}

impl<R: AsyncRead + Unpin> OnoReceiver<R> {
    pub(super) fn new(rx: R) -> Self {
        Self { rx }
    }

    /// Reads the next frame into `buf` and decodes it.
    ///
    /// The decoded value borrows from `buf`, whose element type keeps the frame aligned
    /// for numeric sections to be cast in place.
    pub async fn recv_into<'buf, T, B>(&mut self, buf: &'buf mut Vec<B>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
        B: Align4,
    {
        let mut size_buf = [0; LEN_TYPE_SIZE];
        self.rx.read_exact(&mut size_buf).await?;
        let len = LenType::from_be_bytes(size_buf) as usize;

        let needed_amount = len.div_ceil(size_of::<B>());
        buf.resize(needed_amount, B::zeroed());

        let buf: &'buf mut [B] = buf.as_mut_slice();
        let view: &'buf mut [u8] = bytemuck::cast_slice_mut(buf);
        let frame = &mut view[..len];
        self.rx.read_exact(frame).await?;

        T::deserialize(frame)
    }
}
