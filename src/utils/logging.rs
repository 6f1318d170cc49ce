//! 客户端日志
//!
//! hs2client 内部只通过 `log` 宏记录会话建立、语句执行和游标关闭等事件，
//! 输出到哪里由宿主进程决定。需要落盘时，在进程启动阶段调用一次 [`init`]，
//! 日志按 [`LogConfig`] 写入滚动文件。
//!
//! 底层 logger 每个进程只能安装一次，所以 [`shutdown`] 之后不能再次 `init`。

use crate::config::LogConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("logging is already initialized")]
    AlreadyInitialized,
    #[error("logging is not initialized")]
    NotInitialized,
    #[error("logger error: {0}")]
    Logger(#[from] FlexiLoggerError),
}

static ACTIVE: Mutex<Option<LoggerHandle>> = Mutex::new(None);

fn active() -> MutexGuard<'static, Option<LoggerHandle>> {
    ACTIVE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 安装文件日志
///
/// 重复调用返回 [`LoggingError::AlreadyInitialized`]，已有的 logger 不受影响。
///
/// ```no_run
/// use hs2client::config::Config;
/// use hs2client::utils::logging;
///
/// let config = Config::load("hs2client.toml")?;
/// logging::init(&config.log)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn init(config: &LogConfig) -> Result<(), LoggingError> {
    let mut active = active();
    if active.is_some() {
        return Err(LoggingError::AlreadyInitialized);
    }

    let handle = Logger::try_with_str(&config.level)?
        .log_to_file(
            FileSpec::default()
                .basename(&config.file)
                .directory(&config.dir),
        )
        .rotate(
            Criterion::Size(config.max_file_size),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.max_files),
        )
        .write_mode(WriteMode::Async)
        .append()
        .start()?;

    log::info!(
        "hs2client logging to {}/{} at level {}",
        config.dir,
        config.file,
        config.level
    );
    *active = Some(handle);
    Ok(())
}

/// 运行期调整日志级别，语法同 `RUST_LOG`，如 `"debug"` 或 `"info, hs2client::api=trace"`
pub fn set_level(spec: &str) -> Result<(), LoggingError> {
    let active = active();
    let handle = active.as_ref().ok_or(LoggingError::NotInitialized)?;
    handle.parse_new_spec(spec)?;
    Ok(())
}

/// 写出异步缓冲并停止写线程
pub fn shutdown() {
    if let Some(handle) = active().take() {
        handle.flush();
        handle.shutdown();
    }
}

pub fn is_initialized() -> bool {
    active().is_some()
}
