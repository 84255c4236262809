//! # TKV Connection Layer
//!
//! Purpose: Establish, reuse, and tear down blocking TCP connections to a TKV
//! store endpoint, optionally sharing long-lived connections across unrelated
//! client handles that target the same endpoint and options.
//!
//! ## Design Principles
//! 1. **Injectable Pool**: The pool is an explicit, cloneable object owned by
//!    the caller, never ambient global state.
//! 2. **Ownership in the Type**: A handle either owns its connection or holds
//!    a shared reference into the pool; the release-on-drop rule follows from
//!    the variant, not a runtime flag.
//! 3. **Fail Fast**: Connecting an already-connected handle is a programmer
//!    error and panics; network failures surface as recoverable errors.
//! 4. **Minimal Locking**: One mutex guards the pool map; it is held only for
//!    the lookup or insert itself, never across a network open.

mod conn;
mod connector;
mod pool;

pub use conn::{ConnHandle, ConnTuning, StoreConn};
pub use connector::{
    ConnError, ConnResult, ConnectOptions, Connector, ConnectorConfig, DEFAULT_PORT,
    DEFAULT_TIMEOUT,
};
pub use pool::{ConnectionPool, PoolKey};
