//! 传输层错误类型
//!
//! 外部 RPC 桩与传输工厂只会以这些错误失败

use thiserror::Error;

/// 传输操作结果类型别名
pub type TransportResult<T> = Result<T, TransportError>;

/// 传输/RPC 层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("IO错误: {0}")]
    Io(String),

    #[error("认证握手失败: {0}")]
    Handshake(String),

    #[error("协议编解码错误: {0}")]
    Protocol(String),

    #[error("传输通道已关闭")]
    Closed,
}
