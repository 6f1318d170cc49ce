//! 客户端错误处理
//!
//! 1. 外部协作者（RPC 桩、传输工厂）只返回 `TransportError`
//! 2. 会话/游标层统一返回 `ClientError`，携带服务端错误码与消息
//! 3. `ClientResult<T>` 为统一返回类型

use thiserror::Error;

pub mod codes;
pub mod transport;

pub use codes::ErrorCode;
pub use transport::{TransportError, TransportResult};

/// 客户端错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("连接错误: {0}")]
    Connection(String),

    #[error("协议错误: {0}")]
    Protocol(String),

    #[error("查询错误 [{code}]: {message}")]
    Query { code: i32, message: String },

    #[error("不支持的操作: {0}")]
    UnsupportedOperation(String),

    #[error("调用方式错误: {0}")]
    Misuse(String),
}

/// 统一的结果类型
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// 由服务端状态中的错误码和消息构造查询错误
    pub fn query(code: i32, message: Option<String>) -> Self {
        ClientError::Query {
            code,
            message: message.unwrap_or_default(),
        }
    }

    /// 获取对外错误码
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            ClientError::Connection(_) => ErrorCode::ServiceUnavailable,
            ClientError::Protocol(_) => ErrorCode::ProtocolError,
            ClientError::Query { .. } => ErrorCode::ExecutionError,
            ClientError::UnsupportedOperation(_) => ErrorCode::InvalidStatement,
            ClientError::Misuse(_) => ErrorCode::InvalidInput,
        }
    }

    /// 服务端返回的原始错误码，仅查询错误携带
    pub fn server_code(&self) -> Option<i32> {
        match self {
            ClientError::Query { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Protocol(msg) => ClientError::Protocol(msg),
            other => ClientError::Connection(other.to_string()),
        }
    }
}
