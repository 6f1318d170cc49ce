//! RPC 桩与传输工厂接口
//!
//! 线上编解码和认证握手不属于本库：调用方提供 `TransportFactory`，
//! 它完成握手后返回绑定到该双工通道的 `Hs2Service` 实现。

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::core::error::TransportResult;
use crate::core::types::Endpoint;
use crate::protocol::messages::{
    CloseOperationReq, CloseOperationResp, ExecuteStatementReq, ExecuteStatementResp,
    FetchResultsReq, FetchResultsResp, GetResultSetMetadataReq, GetResultSetMetadataResp,
    GetSchemasReq, GetSchemasResp, OpenSessionReq, OpenSessionResp,
};

/// 外部 RPC 桩
///
/// 每个方法发送一个类型化请求并等待对应的响应，
/// 传输层或编解码失败时返回 `TransportError`。
#[async_trait]
pub trait Hs2Service: Send + Sync {
    async fn open_session(&self, req: OpenSessionReq) -> TransportResult<OpenSessionResp>;

    async fn execute_statement(
        &self,
        req: ExecuteStatementReq,
    ) -> TransportResult<ExecuteStatementResp>;

    async fn fetch_results(&self, req: FetchResultsReq) -> TransportResult<FetchResultsResp>;

    async fn get_result_set_metadata(
        &self,
        req: GetResultSetMetadataReq,
    ) -> TransportResult<GetResultSetMetadataResp>;

    async fn get_schemas(&self, req: GetSchemasReq) -> TransportResult<GetSchemasResp>;

    async fn close_operation(&self, req: CloseOperationReq)
        -> TransportResult<CloseOperationResp>;

    /// 驱动底层通道的任务是否已被取消或已结束
    ///
    /// 只反映任务状态，不探测半开连接。
    fn is_terminated(&self) -> bool;
}

/// 外部传输工厂
///
/// 建立到 `endpoint` 的双工通道并完成认证握手。
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> TransportResult<Arc<dyn Hs2Service>>;
}

/// 通道驱动任务的句柄
///
/// RPC 桩实现可持有该句柄，用于回答 `Hs2Service::is_terminated`。
/// 句柄被丢弃时会中止驱动任务。
#[derive(Debug)]
pub struct DriverHandle {
    task: JoinHandle<()>,
}

impl DriverHandle {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    /// 在当前 tokio 运行时上启动驱动任务
    pub fn spawn<F>(driver: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self::new(tokio::spawn(driver))
    }

    /// 任务被取消（abort）或已运行结束时返回 true
    pub fn is_terminated(&self) -> bool {
        self.task.is_finished()
    }

    /// 取消驱动任务
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
