//! 核心数据类型

pub mod column;
pub mod endpoint;
pub mod value;

pub use column::{ColumnDescriptor, ColumnType};
pub use endpoint::{AuthMechanism, AuthParams, Endpoint};
pub use value::{ResultChunk, ResultRow, Value};
