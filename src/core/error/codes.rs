//! 对外错误码定义
//!
//! 错误码格式: XXYY
//! - XX: 错误类别 (00=成功, 01=语句, 02=执行, 03=输入, 05=协议, 09=系统)
//! - YY: 具体错误

use serde::{Deserialize, Serialize};

/// 对外错误码 - 用于调用方按类别处理客户端错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    Success = 0,

    // ==================== 语句错误 (01xx) ====================
    /// 不支持的操作
    InvalidStatement = 102,

    // ==================== 执行错误 (02xx) ====================
    /// 服务端报告的执行失败
    ExecutionError = 200,

    // ==================== 输入错误 (03xx) ====================
    /// 调用方式不正确
    InvalidInput = 302,

    // ==================== 协议错误 (05xx) ====================
    /// 服务端响应不符合协议
    ProtocolError = 503,

    // ==================== 系统错误 (09xx) ====================
    /// 服务不可用（连接/认证失败）
    ServiceUnavailable = 901,
    /// 未知错误
    Unknown = 999,
}

impl ErrorCode {
    /// 获取错误码的 i32 值
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// 根据 i32 值获取错误码
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ErrorCode::Success),
            102 => Some(ErrorCode::InvalidStatement),
            200 => Some(ErrorCode::ExecutionError),
            302 => Some(ErrorCode::InvalidInput),
            503 => Some(ErrorCode::ProtocolError),
            901 => Some(ErrorCode::ServiceUnavailable),
            999 => Some(ErrorCode::Unknown),
            _ => None,
        }
    }

    /// 获取默认的错误消息
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "成功",
            ErrorCode::InvalidStatement => "不支持的操作",
            ErrorCode::ExecutionError => "执行错误",
            ErrorCode::InvalidInput => "无效调用",
            ErrorCode::ProtocolError => "协议错误",
            ErrorCode::ServiceUnavailable => "服务不可用",
            ErrorCode::Unknown => "未知错误",
        }
    }

    /// 判断错误是否可通过重新连接恢复
    pub fn is_reconnectable(&self) -> bool {
        matches!(self, ErrorCode::ServiceUnavailable)
    }
}

impl Default for ErrorCode {
    fn default() -> Self {
        ErrorCode::Success
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_i32(), self.default_message())
    }
}
