use std::io;

/// Reads a value out of a received frame, possibly borrowing from it.
pub trait Deserialize<'a>: Sized {
    /// Should decode `buf` into a new value.
    ///
    /// # Arguments
    /// * `buf` - The whole frame, without the length prefix.
    ///
    /// # Returns
    /// The decoded value or an io error of kind `InvalidData`.
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
