use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::ByteChannel;

const PEEK_WINDOW: usize = 256;

/// A [`ByteChannel`] over a Unix domain socket.
///
/// Serial bridges and the device simulator expose the controller link as a
/// socket. The stream is switched to non-blocking mode so reads return
/// immediately when nothing is pending.
#[derive(Debug)]
pub struct SocketChannel {
    stream: UnixStream,
}

impl SocketChannel {
    fn from_stream(stream: UnixStream) -> Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self { stream })
    }

    /// Connect to a listening socket (blocking until connected).
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to unix domain socket");
        Self::from_stream(stream)
    }

    /// Create a connected pair of channels.
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = UnixStream::pair()?;
        Ok((Self::from_stream(left)?, Self::from_stream(right)?))
    }

    /// Try to clone this channel (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            stream: self.stream.try_clone()?,
        })
    }
}

impl ByteChannel for SocketChannel {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.stream.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => std::thread::yield_now(),
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                    return Err(TransportError::Closed)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let mut window = [0u8; PEEK_WINDOW];
        let fd = self.stream.as_raw_fd();
        loop {
            // SAFETY: `window` is a valid writable buffer of `window.len()` bytes,
            // and `fd` is the open socket owned by `self.stream`.
            let rc = unsafe {
                libc::recv(
                    fd,
                    window.as_mut_ptr().cast::<libc::c_void>(),
                    window.len(),
                    libc::MSG_PEEK | libc::MSG_DONTWAIT,
                )
            };
            if rc > 0 {
                return Ok(rc as usize);
            }
            if rc == 0 {
                return Err(TransportError::Closed);
            }
            let err = std::io::Error::last_os_error();
            return match err.kind() {
                ErrorKind::Interrupted => continue,
                ErrorKind::WouldBlock => Ok(0),
                _ => Err(TransportError::Io(err)),
            };
        }
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            return match self.stream.read(buf) {
                Ok(0) => Err(TransportError::Closed),
                Ok(n) => Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(0),
                Err(err) => Err(TransportError::Io(err)),
            };
        }
    }
}

/// Listening side of a socket-backed link.
///
/// The socket file is created on bind and removed again on drop, unless the
/// path was replaced by something else in the meantime.
pub struct SocketListener {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl SocketListener {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Unix `sockaddr_un.sun_path` is 108 bytes on Linux, 104 elsewhere.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on `path`, replacing a stale socket file if present.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        let bind_err = |path: &Path, source: std::io::Error| TransportError::Bind {
            path: path.to_path_buf(),
            source,
        };

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| bind_err(&path, e))?;
            if !metadata.file_type().is_socket() {
                return Err(bind_err(
                    &path,
                    std::io::Error::new(
                        ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                ));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(|e| bind_err(&path, e))?;
        }

        let listener = UnixListener::bind(&path).map_err(|e| bind_err(&path, e))?;
        std::fs::set_permissions(
            &path,
            std::fs::Permissions::from_mode(Self::DEFAULT_SOCKET_MODE),
        )
        .map_err(|e| bind_err(&path, e))?;
        let created = std::fs::symlink_metadata(&path).map_err(|e| bind_err(&path, e))?;

        info!(?path, "listening for controller link");

        Ok(Self {
            listener,
            created_inode: Some((created.dev(), created.ino())),
            path,
        })
    }

    /// Accept the next connection (blocking).
    pub fn accept(&self) -> Result<SocketChannel> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "accepted link");
        SocketChannel::from_stream(stream)
    }

    /// Accept a pending connection without blocking.
    ///
    /// Returns `Ok(None)` when nobody is waiting. The listener is switched to
    /// non-blocking mode on first use.
    pub fn try_accept(&self) -> Result<Option<SocketChannel>> {
        self.listener
            .set_nonblocking(true)
            .map_err(TransportError::Accept)?;
        match self.listener.accept() {
            Ok((stream, _addr)) => {
                debug!(path = ?self.path, "accepted link");
                SocketChannel::from_stream(stream).map(Some)
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(TransportError::Accept(err)),
        }
    }

    /// The path this listener is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SocketListener {
    fn drop(&mut self) {
        let Some((expected_dev, expected_ino)) = self.created_inode else {
            return;
        };
        let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
            return;
        };
        if metadata.file_type().is_socket()
            && metadata.dev() == expected_dev
            && metadata.ino() == expected_ino
        {
            debug!(path = ?self.path, "cleaning up socket file");
            let _ = std::fs::remove_file(&self.path);
        } else {
            debug!(path = ?self.path, "socket path identity changed; skipping cleanup");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("zipwire-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn read_until(channel: &mut SocketChannel, want: usize) -> Vec<u8> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        while out.len() < want && Instant::now() < deadline {
            let n = channel.read_available(&mut buf).unwrap();
            out.extend_from_slice(&buf[..n]);
            if n == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        out
    }

    #[test]
    fn pair_roundtrip() {
        let (mut left, mut right) = SocketChannel::pair().unwrap();
        left.write_all(b"hello").unwrap();
        assert_eq!(read_until(&mut right, 5), b"hello");
    }

    #[test]
    fn empty_read_does_not_block() {
        let (_left, mut right) = SocketChannel::pair().unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(right.read_available(&mut buf).unwrap(), 0);
        assert_eq!(right.bytes_available().unwrap(), 0);
    }

    #[test]
    fn bytes_available_counts_without_consuming() {
        let (mut left, mut right) = SocketChannel::pair().unwrap();
        left.write_all(&[1, 2, 3]).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while right.bytes_available().unwrap() < 3 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(right.bytes_available().unwrap(), 3);
        assert_eq!(read_until(&mut right, 3), vec![1, 2, 3]);
    }

    #[test]
    fn bytes_available_reports_closed_after_drain() {
        let (mut left, mut right) = SocketChannel::pair().unwrap();
        left.write_all(&[7, 8]).unwrap();
        drop(left);

        assert_eq!(right.bytes_available().unwrap(), 2);
        assert_eq!(read_until(&mut right, 2), vec![7, 8]);
        assert!(matches!(
            right.bytes_available(),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn dropped_peer_reports_closed() {
        let (left, mut right) = SocketChannel::pair().unwrap();
        drop(left);
        let mut buf = [0u8; 8];
        let err = right.read_available(&mut buf).unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn bind_accept_connect() {
        let dir = temp_dir("bind");
        let sock_path = dir.join("link.sock");

        let listener = SocketListener::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        let path_clone = sock_path.clone();
        let handle = std::thread::spawn(move || {
            let mut client = SocketChannel::connect(&path_clone).unwrap();
            client.write_all(b"zip").unwrap();
        });

        let mut server = listener.accept().unwrap();
        assert_eq!(read_until(&mut server, 3), b"zip");
        handle.join().unwrap();

        drop(listener);
        assert!(!sock_path.exists(), "socket file should be cleaned up on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn try_accept_without_client_returns_none() {
        let dir = temp_dir("try-accept");
        let sock_path = dir.join("link.sock");
        let listener = SocketListener::bind(&sock_path).unwrap();

        assert!(listener.try_accept().unwrap().is_none());

        let _client = SocketChannel::connect(&sock_path).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut accepted = None;
        while accepted.is_none() && Instant::now() < deadline {
            accepted = listener.try_accept().unwrap();
            if accepted.is_none() {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        assert!(accepted.is_some());

        drop(listener);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = SocketListener::bind(&long_path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn bind_rejects_existing_non_socket_file() {
        let dir = temp_dir("bind-file");
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = SocketListener::bind(&sock_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
