//! 游标模块
//!
//! 语句执行、批量/流式拉取、结果集结构读取与操作句柄的关闭

pub mod cursor;
pub mod stream;

pub use cursor::{Cursor, PendingFetch, DEFAULT_MAX_ROWS};
pub use stream::ChunkStream;
