//! 分块流
//!
//! 每一步拉取都作为独立的 tokio 任务启动，因此可以被取消：
//! 流被丢弃时，正在进行的那一步会被中止。必须在 tokio 运行时内驱动。
//!
//! 带语句的第一步先执行语句再拉取。语句执行不可取消，它在单独的任务中跑完，
//! 并把新的操作句柄交回流；拉取被取消时句柄仍会回到游标，不会泄漏。

use futures::{FutureExt, Stream};
use log::debug;
use std::borrow::{Borrow, BorrowMut};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::{JoinError, JoinHandle};

use crate::api::cursor::cursor::{close_operation, fetch_chunk, run_detached, send_execute, Cursor};
use crate::core::error::{ClientError, ClientResult};
use crate::core::types::ResultChunk;
use crate::protocol::messages::{FetchResultsReq, OperationHandle};

/// 执行语句后交回的操作句柄
type OperationSlot = oneshot::Receiver<Option<OperationHandle>>;

/// 分块流
///
/// 可以直接作为 [`Stream`] 使用；也可以用 [`ChunkStream::next_step`]、
/// [`ChunkStream::resolve_step`] 与 [`ChunkStream::take_resolved`] 显式驱动每一步。
/// 第一次拉到空块后流结束，之后不会再发出请求。
pub struct ChunkStream<C: BorrowMut<Cursor>> {
    cursor: C,
    statement: Option<String>,
    max_rows: usize,
    in_flight: Option<JoinHandle<ClientResult<ResultChunk>>>,
    executed: Option<OperationSlot>,
    exhausted: bool,
}

impl<C: BorrowMut<Cursor>> ChunkStream<C> {
    pub(crate) fn new(cursor: C, statement: Option<String>, max_rows: usize) -> Self {
        Self {
            cursor,
            statement,
            max_rows,
            in_flight: None,
            executed: None,
            exhausted: false,
        }
    }

    pub fn cursor(&self) -> &Cursor {
        Borrow::<Cursor>::borrow(&self.cursor)
    }

    pub(crate) fn cursor_mut(&mut self) -> &mut Cursor {
        BorrowMut::<Cursor>::borrow_mut(&mut self.cursor)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// 是否有已启动但尚未被取走结果的步骤
    pub fn has_pending_step(&self) -> bool {
        self.in_flight.is_some()
    }

    /// 当前步骤是否已完成（结果可通过 `take_resolved` 取走）
    pub fn is_step_resolved(&self) -> bool {
        self.in_flight
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false)
    }

    /// 启动下一步
    ///
    /// 流已结束时返回 `Ok(false)`。上一步尚未被取走时启动新一步属于误用。
    pub fn next_step(&mut self) -> ClientResult<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if self.in_flight.is_some() {
            return Err(ClientError::Misuse(
                "previous fetch step has not been resolved".to_string(),
            ));
        }
        self.spawn_step()?;
        Ok(true)
    }

    /// 等待当前步骤完成并取走结果
    ///
    /// 返回 `Ok(None)` 表示拉到空块，流已结束。
    pub async fn resolve_step(&mut self) -> ClientResult<Option<ResultChunk>> {
        let task = self.in_flight.as_mut().ok_or_else(|| {
            ClientError::Misuse("no fetch step in flight".to_string())
        })?;
        let joined = task.await;
        self.in_flight = None;
        self.finish_step(joined)
    }

    /// 把当前步骤当作已完成并取走结果
    ///
    /// 步骤尚未完成时返回 `ClientError::Misuse`，步骤保持进行中。
    pub fn take_resolved(&mut self) -> ClientResult<Option<ResultChunk>> {
        let task = self.in_flight.as_mut().ok_or_else(|| {
            ClientError::Misuse("no fetch step in flight".to_string())
        })?;
        if !task.is_finished() {
            return Err(ClientError::Misuse(
                "fetch step is still pending, await it before reading its result".to_string(),
            ));
        }
        match task.now_or_never() {
            Some(joined) => {
                self.in_flight = None;
                self.finish_step(joined)
            }
            None => Err(ClientError::Misuse(
                "fetch step is still pending, await it before reading its result".to_string(),
            )),
        }
    }

    /// 取消正在进行的步骤，流随之结束
    ///
    /// 已执行语句的操作句柄仍交给游标；语句还在执行时，在后台等它返回并关闭句柄。
    pub fn cancel(&mut self) {
        if let Some(task) = self.in_flight.take() {
            debug!("Cancelling in-flight fetch step");
            task.abort();
        }
        self.adopt_operation();
        self.exhausted = true;
    }

    /// 认领语句执行交回的操作句柄
    fn adopt_operation(&mut self) {
        let Some(mut slot) = self.executed.take() else {
            return;
        };
        match slot.try_recv() {
            Ok(operation) => self.cursor_mut().set_operation(operation),
            Err(TryRecvError::Closed) => {}
            Err(TryRecvError::Empty) => {
                debug!("Statement still executing, closing its operation once it returns");
                let service = self.cursor().service();
                run_detached(async move {
                    match slot.await {
                        Ok(Some(operation)) => close_operation(service.as_ref(), operation).await,
                        _ => Ok(()),
                    }
                });
            }
        }
    }

    fn spawn_step(&mut self) -> ClientResult<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ClientError::Misuse("chunk streams must be driven inside a tokio runtime".to_string())
        })?;

        let max_rows = self.max_rows;
        let statement = self.statement.take();
        let cursor = self.cursor();
        let service = cursor.service();

        let task = match statement {
            Some(statement) => {
                let session = cursor.session_handle().clone();
                let (slot_tx, slot_rx) = oneshot::channel();

                let exec_service = service.clone();
                let execute = runtime.spawn(async move {
                    let executed = send_execute(exec_service.as_ref(), &session, statement).await?;
                    let _ = slot_tx.send(executed.operation.clone());
                    Ok::<_, ClientError>(executed)
                });
                self.executed = Some(slot_rx);

                runtime.spawn(async move {
                    let executed = execute.await.map_err(|e| {
                        ClientError::Connection(format!("statement execution aborted: {}", e))
                    })??;
                    executed.status?;
                    let handle = executed.operation.ok_or_else(|| {
                        ClientError::Protocol(
                            "ExecuteStatement response carries no operation handle".to_string(),
                        )
                    })?;
                    fetch_chunk(service.as_ref(), FetchResultsReq::next(handle, max_rows)).await
                })
            }
            None => {
                let req = match cursor.next_request(Some(max_rows)) {
                    Ok(req) => req,
                    Err(e) => {
                        self.exhausted = true;
                        return Err(e);
                    }
                };
                runtime.spawn(async move { fetch_chunk(service.as_ref(), req).await })
            }
        };

        self.in_flight = Some(task);
        Ok(())
    }

    fn finish_step(
        &mut self,
        joined: Result<ClientResult<ResultChunk>, JoinError>,
    ) -> ClientResult<Option<ResultChunk>> {
        self.adopt_operation();

        let chunk = match joined {
            Ok(chunk) => chunk,
            Err(e) => {
                self.exhausted = true;
                return Err(ClientError::Connection(format!("fetch step aborted: {}", e)));
            }
        };

        match chunk {
            Ok(chunk) if chunk.is_empty() => {
                self.exhausted = true;
                Ok(None)
            }
            Ok(chunk) => Ok(Some(chunk)),
            Err(e) => {
                self.exhausted = true;
                Err(e)
            }
        }
    }
}

impl<C: BorrowMut<Cursor> + Unpin> Stream for ChunkStream<C> {
    type Item = ClientResult<ResultChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.exhausted && this.in_flight.is_none() {
            return Poll::Ready(None);
        }

        if this.in_flight.is_none() {
            if let Err(e) = this.spawn_step() {
                return Poll::Ready(Some(Err(e)));
            }
        }

        let joined = match this.in_flight.as_mut() {
            Some(task) => match task.poll_unpin(cx) {
                Poll::Ready(joined) => joined,
                Poll::Pending => return Poll::Pending,
            },
            None => return Poll::Ready(None),
        };
        this.in_flight = None;

        match this.finish_step(joined) {
            Ok(Some(chunk)) => Poll::Ready(Some(Ok(chunk))),
            Ok(None) => Poll::Ready(None),
            Err(e) => Poll::Ready(Some(Err(e))),
        }
    }
}

impl<C: BorrowMut<Cursor>> Drop for ChunkStream<C> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            debug!("Chunk stream abandoned, cancelling in-flight fetch");
            task.abort();
        }
        self.adopt_operation();
    }
}

impl<C: BorrowMut<Cursor>> std::fmt::Debug for ChunkStream<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("cursor", self.cursor())
            .field("max_rows", &self.max_rows)
            .field("pending_step", &self.in_flight.is_some())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
