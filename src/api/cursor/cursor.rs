//! 游标
//!
//! 游标持有一次语句执行得到的操作句柄，负责分块拉取结果、读取结果集元数据
//! 以及关闭操作句柄。

use futures::future::BoxFuture;
use log::{debug, warn};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::api::cursor::stream::ChunkStream;
use crate::core::error::{ClientError, ClientResult};
use crate::core::types::{ColumnDescriptor, ResultChunk, ResultRow};
use crate::decoder;
use crate::protocol::messages::{
    CloseOperationReq, ExecuteStatementReq, FetchResultsReq, GetResultSetMetadataReq,
    GetSchemasReq, OperationHandle, SessionHandle, Status,
};
use crate::protocol::Hs2Service;

/// 默认每次拉取的最大行数
pub const DEFAULT_MAX_ROWS: usize = 10000;

/// `get_databases` 返回的待驱动批量拉取
pub type PendingFetch<'a> = BoxFuture<'a, ClientResult<Vec<ResultRow>>>;

/// 游标
///
/// 同一时刻最多持有一个操作句柄。在已有句柄时再次 `execute` 会直接替换旧句柄，
/// 不会自动关闭它；需要时由调用方先调用 `close`。
///
/// 游标不应在持有操作句柄时被丢弃：请显式 `close`，或通过 [`Cursor::scoped`] 使用。
/// 丢弃时若仍有句柄，会记录警告并在后台尽力关闭。
///
/// # 示例
///
/// ```rust,no_run
/// # async fn example(session: &hs2client::Session) -> hs2client::ClientResult<()> {
/// let mut cursor = session.cursor();
/// let rows = cursor.fetch(Some("SELECT id FROM users"), None).await?;
/// let schema = cursor.get_schema().await?;
/// cursor.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Cursor {
    service: Arc<dyn Hs2Service>,
    session: SessionHandle,
    operation: Option<OperationHandle>,
    fetch_size: usize,
}

/// 一次 ExecuteStatement 往返的结果
pub(crate) struct Executed {
    pub(crate) operation: Option<OperationHandle>,
    pub(crate) status: ClientResult<()>,
}

impl Cursor {
    pub fn new(service: Arc<dyn Hs2Service>, session: SessionHandle) -> Self {
        Self {
            service,
            session,
            operation: None,
            fetch_size: DEFAULT_MAX_ROWS,
        }
    }

    /// 设置未显式指定 `max_rows` 时使用的分块大小
    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    pub fn fetch_size(&self) -> usize {
        self.fetch_size
    }

    pub fn session_handle(&self) -> &SessionHandle {
        &self.session
    }

    pub fn operation_handle(&self) -> Option<&OperationHandle> {
        self.operation.as_ref()
    }

    pub(crate) fn service(&self) -> Arc<dyn Hs2Service> {
        Arc::clone(&self.service)
    }

    pub(crate) fn set_operation(&mut self, operation: Option<OperationHandle>) {
        if self.operation.is_some() {
            debug!("Replacing outstanding operation handle without closing it");
        }
        self.operation = operation;
    }

    /// 执行语句
    ///
    /// 无论响应状态如何，都会先保存响应中的操作句柄，再检查错误码。
    /// 因此执行失败后句柄可能仍被设置，但不应基于它继续拉取结果。
    pub async fn execute(&mut self, statement: &str) -> ClientResult<()> {
        let executed =
            send_execute(self.service.as_ref(), &self.session, statement.to_string()).await?;
        self.set_operation(executed.operation);
        executed.status
    }

    /// 批量拉取
    ///
    /// 可选地先执行 `statement`，然后持续拉取直到服务端返回空块，返回全部行。
    /// `max_rows` 为每块的行数上限，缺省为游标的分块大小。
    pub async fn fetch(
        &mut self,
        statement: Option<&str>,
        max_rows: Option<usize>,
    ) -> ClientResult<Vec<ResultRow>> {
        if let Some(statement) = statement {
            self.execute(statement).await?;
        }

        let req = self.next_request(max_rows)?;
        let mut rows = Vec::new();
        loop {
            let chunk = fetch_chunk(self.service.as_ref(), req.clone()).await?;
            if chunk.is_empty() {
                break;
            }
            rows.extend(chunk);
        }

        debug!("Fetched {} rows in total", rows.len());
        Ok(rows)
    }

    /// 流式拉取
    ///
    /// 返回惰性、有限、不可重启的分块流；每一步都是可取消的异步任务，
    /// 需要调用方主动驱动。流被丢弃时正在进行的拉取会被取消。
    pub fn iter(&mut self, statement: Option<&str>, max_rows: Option<usize>) -> ChunkStream<&mut Cursor> {
        let max_rows = max_rows.unwrap_or(self.fetch_size);
        ChunkStream::new(self, statement.map(str::to_string), max_rows)
    }

    /// 与 [`Cursor::iter`] 相同，但流拥有游标本身
    pub fn into_stream(self, statement: Option<&str>, max_rows: Option<usize>) -> ChunkStream<Cursor> {
        let max_rows = max_rows.unwrap_or(self.fetch_size);
        ChunkStream::new(self, statement.map(str::to_string), max_rows)
    }

    /// 读取当前操作的结果集结构
    ///
    /// 没有操作句柄或服务端没有返回结构时为 `None`。
    pub async fn get_schema(&mut self) -> ClientResult<Option<Vec<ColumnDescriptor>>> {
        let Some(operation) = self.operation.clone() else {
            return Ok(None);
        };

        let req = GetResultSetMetadataReq {
            operation_handle: operation,
        };
        let resp = self.service.get_result_set_metadata(req).await?;

        Ok(resp.schema.map(|schema| {
            schema
                .columns
                .iter()
                .map(decoder::decode_column)
                .collect()
        }))
    }

    /// 列出数据库
    ///
    /// 发送 GetSchemas 请求并保存新的操作句柄，返回尚未驱动的批量拉取。
    pub async fn get_databases<'a>(&'a mut self) -> ClientResult<PendingFetch<'a>> {
        let req = GetSchemasReq {
            session_handle: self.session.clone(),
            catalog_name: None,
            schema_name: None,
        };
        debug!("Sending GetSchemas");
        let resp = self.service.get_schemas(req).await?;
        self.set_operation(resp.operation_handle);
        check_status(&resp.status)?;

        Ok(Box::pin(self.fetch(None, None)))
    }

    /// 关闭当前操作句柄，没有句柄时什么都不做
    pub async fn close(&mut self) -> ClientResult<()> {
        let Some(operation) = self.operation.clone() else {
            return Ok(());
        };
        close_operation(self.service.as_ref(), operation).await?;
        self.operation = None;
        Ok(())
    }

    /// 取出操作句柄并返回关闭它的独立 future
    ///
    /// 用于无法在当前位置 `.await` 的清理路径。
    pub(crate) fn detach_close(
        &mut self,
    ) -> Option<impl Future<Output = ClientResult<()>> + Send + 'static> {
        let operation = self.operation.take()?;
        let service = self.service();
        Some(async move { close_operation(service.as_ref(), operation).await })
    }

    /// 在作用域内使用游标，结束时总会关闭
    ///
    /// 闭包出错时返回闭包的错误，关闭失败只记录日志；
    /// 闭包成功而关闭失败时返回关闭的错误。
    pub async fn scoped<T, F>(mut self, f: F) -> ClientResult<T>
    where
        F: for<'c> FnOnce(&'c mut Cursor) -> BoxFuture<'c, ClientResult<T>>,
    {
        let result = f(&mut self).await;
        let closed = self.close().await;
        match result {
            Ok(value) => closed.map(|_| value),
            Err(e) => {
                if let Err(close_err) = closed {
                    warn!("Failed to close cursor after error: {}", close_err);
                }
                Err(e)
            }
        }
    }

    pub(crate) fn next_request(&self, max_rows: Option<usize>) -> ClientResult<FetchResultsReq> {
        let operation = self.operation.clone().ok_or_else(|| {
            ClientError::Misuse("no operation handle, execute a statement first".to_string())
        })?;
        Ok(FetchResultsReq::next(
            operation,
            max_rows.unwrap_or(self.fetch_size),
        ))
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if let Some(close) = self.detach_close() {
            warn!("Cursor dropped with a pending operation handle, closing it in the background");
            run_detached(close);
        }
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("session", &self.session)
            .field("operation", &self.operation)
            .field("fetch_size", &self.fetch_size)
            .finish()
    }
}

/// 在当前运行时上调度关闭；没有运行时时同步执行完
///
/// 失败只记录日志。
pub(crate) fn run_detached<F>(close: F)
where
    F: Future<Output = ClientResult<()>> + Send + 'static,
{
    let close = async move {
        if let Err(e) = close.await {
            warn!("Background close of operation handle failed: {}", e);
        }
    };

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(close);
        }
        Err(_) => match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt.block_on(close),
            Err(e) => warn!("No runtime available to close operation handle: {}", e),
        },
    }
}

pub(crate) fn check_status(status: &Status) -> ClientResult<()> {
    match status.error_code {
        Some(code) => Err(ClientError::query(code, status.error_message.clone())),
        None => Ok(()),
    }
}

pub(crate) async fn send_execute(
    service: &dyn Hs2Service,
    session: &SessionHandle,
    statement: String,
) -> ClientResult<Executed> {
    debug!("Executing statement: {}", statement);
    let req = ExecuteStatementReq {
        session_handle: session.clone(),
        statement,
        conf_overlay: HashMap::new(),
    };
    let resp = service.execute_statement(req).await?;
    Ok(Executed {
        status: check_status(&resp.status),
        operation: resp.operation_handle,
    })
}

/// 拉取并解码下一块
pub(crate) async fn fetch_chunk(
    service: &dyn Hs2Service,
    req: FetchResultsReq,
) -> ClientResult<ResultChunk> {
    let resp = service.fetch_results(req).await?;
    check_status(&resp.status)?;
    let row_set = resp.results.ok_or_else(|| {
        ClientError::Protocol("FetchResults response carries no row set".to_string())
    })?;
    debug!("Fetched chunk of {} rows", row_set.rows.len());
    Ok(row_set.rows.iter().map(decoder::decode_row).collect())
}

pub(crate) async fn close_operation(
    service: &dyn Hs2Service,
    operation: OperationHandle,
) -> ClientResult<()> {
    debug!("Closing operation {:?}", operation.operation_type);
    let resp = service
        .close_operation(CloseOperationReq {
            operation_handle: operation,
        })
        .await?;
    if let Some(code) = resp.status.error_code {
        warn!(
            "CloseOperation reported error [{}]: {}",
            code,
            resp.status.error_message.unwrap_or_default()
        );
    }
    Ok(())
}
