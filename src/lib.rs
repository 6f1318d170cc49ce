//! hs2client - An async client for HiveServer2-style session/cursor services
//!
//! The crate opens a session over a caller-supplied transport, executes
//! statements through cursors, and fetches results either in bulk or as a
//! cancellable stream of chunks. `Client` wraps a lazily established session
//! and reconnects once the underlying transport has terminated.

pub mod api;
pub mod config;
pub mod core;
pub mod decoder;
pub mod protocol;
pub mod utils;

pub use crate::api::{
    CallArgs, CallShape, Capability, ChunkStream, Client, ClosingChunkStream, Cursor,
    CursorReply, PendingFetch, Session, DEFAULT_MAX_ROWS,
};
pub use crate::config::{Config, ConfigError};
pub use crate::core::{
    AuthMechanism, AuthParams, ClientError, ClientResult, ColumnDescriptor, ColumnType, Endpoint,
    ErrorCode, ResultChunk, ResultRow, TransportError, TransportResult, Value,
};
pub use crate::protocol::{DriverHandle, Hs2Service, TransportFactory};
