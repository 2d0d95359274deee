use std::io;

/// Writes a value into a byte buffer ahead of it being framed and sent.
pub trait Serialize<'a> {
    /// Should append the owned part of the encoding to `buf`.
    ///
    /// # Arguments
    /// * `buf` - The buffer to append the encoding to.
    ///
    /// # Returns
    /// An optional trailing slice that will be written right after `buf` without being
    /// copied, or an io error if the value can't be encoded.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> io::Result<Option<&'a [u8]>>;
}
