//! # Connector
//!
//! Purpose: Drive the connect/reconnect state machine for a handle: decide
//! persistent vs transient, consult and update the pool, and apply tuning
//! options before the blocking network open.
//!
//! ## Design Principles
//! 1. **Typed Options at the Boundary**: Loosely-typed option sets (query
//!    strings, host-environment maps) are parsed once into [`ConnectOptions`];
//!    the state machine never inspects a generic container.
//! 2. **No Partial Side Effects**: A failed open leaves the handle exactly as
//!    it was — disconnected, with the half-built connection dropped here.
//! 3. **Explicit Configuration**: Defaults (timeout, well-known port) are
//!    plain injected values, not process globals.

use std::io;

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::conn::{ConnHandle, ConnTuning, StoreConn};
use crate::pool::{ConnectionPool, PoolKey};

/// Well-known store server port, used when the caller supplies none.
pub const DEFAULT_PORT: u16 = 1978;

/// Process-wide default connect timeout in seconds.
pub const DEFAULT_TIMEOUT: f64 = 30.0;

/// Result type for connection operations.
pub type ConnResult<T> = Result<T, ConnError>;

/// Errors surfaced by the connection layer.
#[derive(Debug, Error)]
pub enum ConnError {
    /// The network open failed: refused, timed out, or unresolvable.
    #[error("connection failed: {0}")]
    Connect(#[from] io::Error),
    /// The endpoint URL could not be parsed.
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The endpoint URL carries no host component.
    #[error("endpoint url has no host")]
    MissingHost,
}

/// Recognized connect options with their defaults.
///
/// Unrecognized option names and unparseable values are ignored, matching
/// the lenient contract of the host-environment boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOptions {
    /// Share the connection through the pool.
    pub persistent: bool,
    /// Timeout override in seconds; only positive values are honored.
    pub timeout: Option<f64>,
    /// Allow auto-reconnect tuning on persistent connections.
    pub reconnect: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            persistent: false,
            timeout: None,
            reconnect: true,
        }
    }
}

impl ConnectOptions {
    /// Builds options from a loosely-typed key/value pair set, such as a
    /// decoded URL query. Later pairs win over earlier duplicates.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = ConnectOptions::default();
        for (name, value) in pairs {
            match name.as_ref() {
                "persistent" => {
                    if let Some(flag) = parse_bool(value.as_ref()) {
                        options.persistent = flag;
                    }
                }
                "timeout" => {
                    if let Some(timeout) = parse_timeout(value.as_ref()) {
                        options.timeout = Some(timeout);
                    }
                }
                "reconnect" => {
                    if let Some(flag) = parse_bool(value.as_ref()) {
                        options.reconnect = flag;
                    }
                }
                _ => {}
            }
        }
        options
    }

    /// Convenience builder for persistent connects.
    pub fn persistent() -> Self {
        ConnectOptions {
            persistent: true,
            ..ConnectOptions::default()
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "" | "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn parse_timeout(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|timeout| timeout.is_finite() && *timeout > 0.0)
}

/// External configuration for the connector.
#[derive(Debug, Clone, Copy)]
pub struct ConnectorConfig {
    /// Timeout in seconds applied when the caller supplies none. Must be
    /// positive.
    pub default_timeout: f64,
    /// Port substituted when the caller supplies none or a non-positive one.
    pub default_port: u16,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        ConnectorConfig {
            default_timeout: DEFAULT_TIMEOUT,
            default_port: DEFAULT_PORT,
        }
    }
}

/// Orchestrates connect and reconnect for handles against one pool.
///
/// Connectors that should share persistent connections are built over clones
/// of the same [`ConnectionPool`].
pub struct Connector {
    pool: ConnectionPool,
    config: ConnectorConfig,
}

impl Connector {
    /// Creates a connector over `pool` with default configuration.
    pub fn new(pool: ConnectionPool) -> Self {
        Connector::with_config(pool, ConnectorConfig::default())
    }

    /// Creates a connector with explicit configuration.
    pub fn with_config(pool: ConnectionPool, config: ConnectorConfig) -> Self {
        Connector { pool, config }
    }

    /// The pool this connector registers persistent connections into.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Connects a disconnected handle to `host:port`.
    ///
    /// A persistent request first consults the pool; a hit adopts the shared
    /// connection without any network open. A miss, or a transient request,
    /// opens a fresh connection with the effective timeout applied. Newly
    /// opened persistent connections are published to the pool.
    ///
    /// # Panics
    /// Panics if the handle is already connected. Callers must disconnect
    /// first (or use [`open`](Connector::open), which does so).
    pub fn connect(
        &self,
        handle: &mut ConnHandle,
        host: &str,
        port: u16,
        options: &ConnectOptions,
    ) -> ConnResult<()> {
        assert!(
            !handle.is_connected(),
            "connect called on an already-connected handle"
        );

        let timeout = self.effective_timeout(options);

        if options.persistent {
            let key = PoolKey::new(host, port, timeout);
            if let Some(shared) = self.pool.get(&key) {
                debug!(%key, "adopting pooled connection");
                handle.adopt_shared(shared);
                return Ok(());
            }

            let tuning = ConnTuning {
                timeout,
                auto_reconnect: options.reconnect,
            };
            // Open before publishing; a failed open drops the half-built
            // connection here and leaves both handle and pool untouched.
            let conn = StoreConn::open(host, port, tuning)?;
            let shared = self.pool.put(&key, conn);
            handle.adopt_shared(shared);
        } else {
            let tuning = ConnTuning {
                timeout,
                auto_reconnect: false,
            };
            let conn = StoreConn::open(host, port, tuning)?;
            handle.adopt_owned(conn);
        }

        Ok(())
    }

    /// Connects with caller-friendly normalization: a non-positive port falls
    /// back to the configured default, and an already-connected handle is
    /// disconnected first, so reuse of a handle for a new endpoint is safe.
    pub fn open(
        &self,
        handle: &mut ConnHandle,
        host: &str,
        port: i32,
        options: &ConnectOptions,
    ) -> ConnResult<()> {
        let port = self.normalize_port(port);
        if handle.is_connected() {
            handle.disconnect();
        }
        self.connect(handle, host, port, options)
    }

    /// Connects from an endpoint URL such as
    /// `tkv://db1:1978?persistent=true&timeout=5`.
    ///
    /// The query, when present, is decoded into the same named option set
    /// [`open`](Connector::open) consumes; absent query means all defaults.
    pub fn open_url(&self, handle: &mut ConnHandle, url: &str) -> ConnResult<()> {
        let url = Url::parse(url)?;
        let host = url.host_str().ok_or(ConnError::MissingHost)?;
        let port = url.port().map(i32::from).unwrap_or(0);
        let options = match url.query() {
            Some(query) => ConnectOptions::from_pairs(form_urlencoded::parse(query.as_bytes())),
            None => ConnectOptions::default(),
        };
        self.open(handle, host, port, &options)
    }

    fn effective_timeout(&self, options: &ConnectOptions) -> f64 {
        options
            .timeout
            .filter(|timeout| *timeout > 0.0)
            .unwrap_or(self.config.default_timeout)
    }

    fn normalize_port(&self, port: i32) -> u16 {
        u16::try_from(port)
            .ok()
            .filter(|port| *port > 0)
            .unwrap_or(self.config.default_port)
    }
}
