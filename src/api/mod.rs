//! 客户端 API
//!
//! - `session`: 会话，持有传输与服务端签发的会话句柄
//! - `cursor`: 游标与分块流
//! - `client`: 带惰性连接与自动重连的门面

pub mod client;
pub mod cursor;
pub mod session;

pub use client::{CallArgs, CallShape, Capability, Client, ClosingChunkStream, CursorReply};
pub use cursor::{ChunkStream, Cursor, PendingFetch, DEFAULT_MAX_ROWS};
pub use session::Session;
