//! 客户端门面
//!
//! 持有一个会话，首次使用时建立；每次取游标前检查底层连接，
//! 连接已失效时重新连接。游标层的操作通过固定的能力集合转发，
//! 每次调用都使用新取得的游标。

use futures::future::BoxFuture;
use futures::{FutureExt, Stream};
use log::{debug, info};
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::api::cursor::cursor::run_detached;
use crate::api::cursor::{ChunkStream, Cursor};
use crate::api::session::Session;
use crate::config::Config;
use crate::core::error::{ClientError, ClientResult};
use crate::core::types::{ColumnDescriptor, Endpoint, ResultChunk, ResultRow};
use crate::protocol::messages::{OperationHandle, SessionHandle};
use crate::protocol::TransportFactory;

/// 转发调用的并发形态，决定使用哪种游标获取与清理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// 同步调用，直接作用于新游标，不做作用域清理
    Plain,
    /// 挂起并返回单个结果，游标在返回或失败时关闭
    Suspending,
    /// 返回惰性序列，游标在序列耗尽或被丢弃时关闭
    Sequence,
}

/// 游标能力集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Execute,
    Fetch,
    Iter,
    GetSchema,
    GetDatabases,
    Close,
    SessionHandle,
    OperationHandle,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::Execute,
        Capability::Fetch,
        Capability::Iter,
        Capability::GetSchema,
        Capability::GetDatabases,
        Capability::Close,
        Capability::SessionHandle,
        Capability::OperationHandle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Capability::Execute => "execute",
            Capability::Fetch => "fetch",
            Capability::Iter => "iter",
            Capability::GetSchema => "get_schema",
            Capability::GetDatabases => "get_databases",
            Capability::Close => "close",
            Capability::SessionHandle => "session_handle",
            Capability::OperationHandle => "operation_handle",
        }
    }

    pub fn shape(&self) -> CallShape {
        match self {
            Capability::SessionHandle | Capability::OperationHandle => CallShape::Plain,
            Capability::Iter => CallShape::Sequence,
            Capability::Execute
            | Capability::Fetch
            | Capability::GetSchema
            | Capability::GetDatabases
            | Capability::Close => CallShape::Suspending,
        }
    }
}

impl FromStr for Capability {
    type Err = ClientError;

    /// 同时接受 snake_case 与 camelCase 名称
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "execute" => Ok(Capability::Execute),
            "fetch" => Ok(Capability::Fetch),
            "iter" => Ok(Capability::Iter),
            "get_schema" | "getSchema" => Ok(Capability::GetSchema),
            "get_databases" | "getDatabases" => Ok(Capability::GetDatabases),
            "close" => Ok(Capability::Close),
            "session_handle" | "sessionHandle" => Ok(Capability::SessionHandle),
            "operation_handle" | "operationHandle" => Ok(Capability::OperationHandle),
            other => Err(ClientError::UnsupportedOperation(format!(
                "Client has no attribute {:?}",
                other
            ))),
        }
    }
}

/// 转发调用的参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallArgs {
    pub statement: Option<String>,
    pub max_rows: Option<usize>,
}

impl CallArgs {
    pub fn statement(statement: impl Into<String>) -> Self {
        Self {
            statement: Some(statement.into()),
            max_rows: None,
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

/// 转发调用的结果
#[derive(Debug)]
pub enum CursorReply {
    Done,
    Rows(Vec<ResultRow>),
    Schema(Option<Vec<ColumnDescriptor>>),
    Stream(ClosingChunkStream),
    SessionHandle(SessionHandle),
    OperationHandle(Option<OperationHandle>),
}

/// 客户端
///
/// 对同一个 Client 的调用需要由调用方串行化，所有操作都要求 `&mut self`。
///
/// # 示例
///
/// ```rust,no_run
/// use hs2client::{Client, Endpoint};
/// # use std::sync::Arc;
/// # async fn example(factory: Arc<dyn hs2client::TransportFactory>) -> hs2client::ClientResult<()> {
/// let mut client = Client::new(Endpoint::new("127.0.0.1", 10000), factory);
///
/// let rows = client.fetch(Some("SELECT id FROM users"), None).await?;
/// let databases = client.get_databases().await?;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    endpoint: Endpoint,
    factory: Arc<dyn TransportFactory>,
    session: Option<Session>,
    fetch_size: usize,
}

impl Client {
    pub fn new(endpoint: Endpoint, factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            endpoint,
            factory,
            session: None,
            fetch_size: crate::api::cursor::DEFAULT_MAX_ROWS,
        }
    }

    pub fn from_config(config: &Config, factory: Arc<dyn TransportFactory>) -> Self {
        Self::new(config.endpoint(), factory).with_fetch_size(config.fetch.max_rows)
    }

    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// 建立新会话，替换现有会话
    pub async fn connect(&mut self) -> ClientResult<()> {
        let session = Session::connect(&self.endpoint, self.factory.as_ref()).await?;
        self.session = Some(session);
        Ok(())
    }

    /// 取得绑定到当前会话的新游标
    ///
    /// 会话的驱动任务已取消或结束时丢弃该会话并重新连接一次。
    pub async fn cursor(&mut self) -> ClientResult<Cursor> {
        if let Some(session) = &self.session {
            if !session.is_alive() {
                info!(
                    "Transport to {} terminated, reconnecting",
                    self.endpoint.address()
                );
                self.session = None;
            }
        }
        if self.session.is_none() {
            self.connect().await?;
        }

        let session = self.session.as_ref().ok_or_else(|| {
            ClientError::Connection("session unavailable after connect".to_string())
        })?;
        Ok(session.cursor().with_fetch_size(self.fetch_size))
    }

    /// 在新游标上执行闭包，结束时总会关闭游标
    pub async fn with_cursor<T, F>(&mut self, f: F) -> ClientResult<T>
    where
        F: for<'c> FnOnce(&'c mut Cursor) -> BoxFuture<'c, ClientResult<T>>,
    {
        let cursor = self.cursor().await?;
        cursor.scoped(f).await
    }

    pub async fn execute(&mut self, statement: &str) -> ClientResult<()> {
        let statement = statement.to_string();
        self.with_cursor(move |cur| Box::pin(async move { cur.execute(&statement).await }))
            .await
    }

    pub async fn fetch(
        &mut self,
        statement: Option<&str>,
        max_rows: Option<usize>,
    ) -> ClientResult<Vec<ResultRow>> {
        let statement = statement.map(str::to_string);
        self.with_cursor(move |cur| {
            Box::pin(async move { cur.fetch(statement.as_deref(), max_rows).await })
        })
        .await
    }

    /// 新游标上没有操作句柄，因此总是 `None`
    pub async fn get_schema(&mut self) -> ClientResult<Option<Vec<ColumnDescriptor>>> {
        self.with_cursor(|cur| Box::pin(cur.get_schema())).await
    }

    /// 列出数据库，在关闭游标前驱动完批量拉取
    pub async fn get_databases(&mut self) -> ClientResult<Vec<ResultRow>> {
        self.with_cursor(|cur| {
            Box::pin(async move {
                let pending = cur.get_databases().await?;
                pending.await
            })
        })
        .await
    }

    /// 流式拉取，返回的流拥有游标并在耗尽、出错或被丢弃时关闭它
    pub async fn iter(
        &mut self,
        statement: Option<&str>,
        max_rows: Option<usize>,
    ) -> ClientResult<ClosingChunkStream> {
        let cursor = self.cursor().await?;
        Ok(ClosingChunkStream::new(
            cursor.into_stream(statement, max_rows),
        ))
    }

    pub async fn session_handle(&mut self) -> ClientResult<SessionHandle> {
        let cursor = self.cursor().await?;
        Ok(cursor.session_handle().clone())
    }

    /// 按名称转发游标操作
    ///
    /// 名称不在能力集合中时返回 `ClientError::UnsupportedOperation`。
    pub async fn invoke(&mut self, name: &str, args: CallArgs) -> ClientResult<CursorReply> {
        let capability = Capability::from_str(name)?;
        self.call(capability, args).await
    }

    pub async fn call(&mut self, capability: Capability, args: CallArgs) -> ClientResult<CursorReply> {
        debug!(
            "Forwarding {} ({:?}) to a fresh cursor",
            capability.name(),
            capability.shape()
        );
        let CallArgs {
            statement,
            max_rows,
        } = args;

        match capability.shape() {
            CallShape::Plain => {
                let cursor = self.cursor().await?;
                Ok(match capability {
                    Capability::OperationHandle => {
                        CursorReply::OperationHandle(cursor.operation_handle().cloned())
                    }
                    _ => CursorReply::SessionHandle(cursor.session_handle().clone()),
                })
            }
            CallShape::Sequence => {
                let stream = self.iter(statement.as_deref(), max_rows).await?;
                Ok(CursorReply::Stream(stream))
            }
            CallShape::Suspending => match capability {
                Capability::Execute => {
                    let statement = statement.ok_or_else(|| {
                        ClientError::Misuse("execute requires a statement".to_string())
                    })?;
                    self.execute(&statement).await?;
                    Ok(CursorReply::Done)
                }
                Capability::Fetch => Ok(CursorReply::Rows(
                    self.fetch(statement.as_deref(), max_rows).await?,
                )),
                Capability::GetSchema => Ok(CursorReply::Schema(self.get_schema().await?)),
                Capability::GetDatabases => Ok(CursorReply::Rows(self.get_databases().await?)),
                _ => {
                    self.with_cursor(|cur| Box::pin(cur.close())).await?;
                    Ok(CursorReply::Done)
                }
            },
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("session", &self.session)
            .field("fetch_size", &self.fetch_size)
            .finish()
    }
}

/// 拥有游标的分块流
///
/// 流耗尽或出错后先关闭游标再结束；被提前丢弃时取消进行中的拉取并在后台关闭游标。
pub struct ClosingChunkStream {
    inner: ChunkStream<Cursor>,
    closing: Option<BoxFuture<'static, ClientResult<()>>>,
    done: bool,
}

impl ClosingChunkStream {
    fn new(inner: ChunkStream<Cursor>) -> Self {
        Self {
            inner,
            closing: None,
            done: false,
        }
    }

    pub fn cursor(&self) -> &Cursor {
        self.inner.cursor()
    }

    pub fn is_finished(&self) -> bool {
        self.done
    }

    fn start_closing(&mut self) {
        self.inner.cancel();
        self.closing = self
            .inner
            .cursor_mut()
            .detach_close()
            .map(|close| Box::pin(close) as BoxFuture<'static, ClientResult<()>>);
    }
}

impl Stream for ClosingChunkStream {
    type Item = ClientResult<ResultChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.done {
                return Poll::Ready(None);
            }

            if let Some(closing) = this.closing.as_mut() {
                let closed = match closing.poll_unpin(cx) {
                    Poll::Ready(closed) => closed,
                    Poll::Pending => return Poll::Pending,
                };
                this.closing = None;
                this.done = true;
                return match closed {
                    Ok(()) => Poll::Ready(None),
                    Err(e) => Poll::Ready(Some(Err(e))),
                };
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => return Poll::Ready(Some(Ok(chunk))),
                Poll::Ready(Some(Err(e))) => {
                    this.start_closing();
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.start_closing();
                    // 继续循环以驱动关闭
                }
            }
        }
    }
}

impl Drop for ClosingChunkStream {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some(closing) = self.closing.take() {
            debug!("Stream dropped before its cursor finished closing, completing in the background");
            run_detached(closing);
            return;
        }
        self.inner.cancel();
        if let Some(close) = self.inner.cursor_mut().detach_close() {
            debug!("Closing abandoned stream's cursor in the background");
            run_detached(close);
        }
    }
}

impl std::fmt::Debug for ClosingChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosingChunkStream")
            .field("inner", &self.inner)
            .field("closing", &self.closing.is_some())
            .field("done", &self.done)
            .finish()
    }
}
