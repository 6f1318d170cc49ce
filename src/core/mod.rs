pub mod error;
pub mod types;

// 错误和结果类型
pub use error::{ClientError, ClientResult, ErrorCode, TransportError, TransportResult};

// 核心数据类型
pub use types::{
    AuthMechanism, AuthParams, ColumnDescriptor, ColumnType, Endpoint, ResultChunk, ResultRow,
    Value,
};
