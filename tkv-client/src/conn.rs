//! # Connections and Handles
//!
//! Purpose: Wrap the network-level connection to a store server and the
//! per-caller handle that owns or borrows it.
//!
//! A [`StoreConn`] is opaque to this layer beyond open, tune, and close; the
//! byte protocol spoken over it belongs to the data-operation code built on
//! top. A [`ConnHandle`] tracks whether its connection is exclusively owned
//! (transient) or shared through the pool (persistent), and encodes that
//! distinction in the type so that dropping a handle can never close a
//! connection other holders still use.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

/// Tuning applied to a connection before it is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnTuning {
    /// Connect/read/write timeout in seconds. Must be positive.
    pub timeout: f64,
    /// Whether the connection should transparently re-establish itself after
    /// a transient network failure. Enabled for pooled connections so that
    /// other holders do not observe a hard failure.
    pub auto_reconnect: bool,
}

/// A single blocking TCP connection to a store server.
///
/// The connection records the tuning it was opened with so the data layer
/// can honor it without re-deriving anything.
pub struct StoreConn {
    stream: TcpStream,
    tuning: ConnTuning,
}

impl StoreConn {
    /// Opens a connection to `host:port` with the provided tuning.
    ///
    /// Resolution may yield several addresses; each is tried in order and the
    /// last error is returned if none succeeds.
    pub(crate) fn open(host: &str, port: u16, tuning: ConnTuning) -> io::Result<Self> {
        let timeout = Duration::try_from_secs_f64(tuning.timeout).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "timeout must be positive")
        })?;

        let mut last_err = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    // Disable Nagle to keep request latency low for small payloads.
                    stream.set_nodelay(true)?;
                    debug!(host, port, ?tuning, "opened store connection");
                    return Ok(StoreConn { stream, tuning });
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "host resolved to no addresses")
        }))
    }

    /// Raw stream access for the data-operation layer.
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// The tuning this connection was opened with.
    pub fn tuning(&self) -> ConnTuning {
        self.tuning
    }

    /// Whether auto-reconnect tuning is enabled on this connection.
    pub fn auto_reconnect(&self) -> bool {
        self.tuning.auto_reconnect
    }
}

/// Ownership tag for a handle's underlying connection.
///
/// `Owned` connections close when the holder lets go; `Shared` connections
/// belong to the pool and outlive any single handle.
enum Underlying {
    Owned(StoreConn),
    Shared(Arc<StoreConn>),
}

/// Per-caller connection handle.
///
/// Created disconnected; connected and disconnected exclusively through a
/// [`Connector`](crate::Connector). Dropping the handle releases an owned
/// connection and merely forgets a shared one.
#[derive(Default)]
pub struct ConnHandle {
    underlying: Option<Underlying>,
}

impl ConnHandle {
    /// Creates a fresh handle in the disconnected state.
    pub fn new() -> Self {
        ConnHandle { underlying: None }
    }

    /// Whether the handle currently holds a live connection.
    pub fn is_connected(&self) -> bool {
        self.underlying.is_some()
    }

    /// Whether the held connection is shared through the pool.
    pub fn is_persistent(&self) -> bool {
        matches!(self.underlying, Some(Underlying::Shared(_)))
    }

    /// The underlying connection, if connected.
    pub fn conn(&self) -> Option<&StoreConn> {
        match &self.underlying {
            Some(Underlying::Owned(conn)) => Some(conn),
            Some(Underlying::Shared(conn)) => Some(conn.as_ref()),
            None => None,
        }
    }

    /// Drops the held connection and returns the handle to the disconnected
    /// state. An owned connection is closed; a pooled one stays open for its
    /// other holders.
    pub fn disconnect(&mut self) {
        self.underlying = None;
    }

    pub(crate) fn adopt_owned(&mut self, conn: StoreConn) {
        self.underlying = Some(Underlying::Owned(conn));
    }

    pub(crate) fn adopt_shared(&mut self, conn: Arc<StoreConn>) {
        self.underlying = Some(Underlying::Shared(conn));
    }
}
