use crate::error::Result;

/// A duplex byte stream between host and controller.
///
/// Reads never block: a channel with nothing pending returns `Ok(0)` from
/// [`read_available`](ByteChannel::read_available). A channel whose remote end
/// has gone away returns [`TransportError::Closed`](crate::TransportError::Closed).
pub trait ByteChannel {
    /// Write every byte of `bytes`, flushing before returning.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Number of inbound bytes that can be read without blocking.
    ///
    /// Implementations may under-report; they never over-report.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read up to `buf.len()` pending bytes without blocking.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;
}

impl<C: ByteChannel + ?Sized> ByteChannel for &mut C {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_available(buf)
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for Box<C> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_available(buf)
    }
}
