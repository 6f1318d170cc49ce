// 工具模块

// 日志模块
pub mod logging;
