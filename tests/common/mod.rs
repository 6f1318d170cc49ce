//! 集成测试共享工具模块
//!
//! 提供脚本化的内存 RPC 桩与传输工厂，供所有集成测试使用

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hs2client::core::error::{TransportError, TransportResult};
use hs2client::core::types::Endpoint;
use hs2client::protocol::messages::{
    CloseOperationReq, CloseOperationResp, ColumnDesc, ColumnValue, ExecuteStatementReq,
    ExecuteStatementResp, FetchResultsReq, FetchResultsResp, GetResultSetMetadataReq,
    GetResultSetMetadataResp, GetSchemasReq, GetSchemasResp, OpenSessionReq, OpenSessionResp,
    OperationHandle, OperationType, ProtocolVersion, Row, RowSet, SessionHandle, Status,
    TableSchema, TypeDesc, TypeId,
};
use hs2client::protocol::{DriverHandle, Hs2Service, TransportFactory};

/// 每个 RPC 的调用次数
#[derive(Debug, Default)]
pub struct CallCounters {
    pub open_session: AtomicUsize,
    pub execute: AtomicUsize,
    pub fetch: AtomicUsize,
    pub metadata: AtomicUsize,
    pub get_schemas: AtomicUsize,
    pub close: AtomicUsize,
}

impl CallCounters {
    pub fn open_session(&self) -> usize {
        self.open_session.load(Ordering::SeqCst)
    }

    pub fn execute(&self) -> usize {
        self.execute.load(Ordering::SeqCst)
    }

    pub fn fetch(&self) -> usize {
        self.fetch.load(Ordering::SeqCst)
    }

    pub fn metadata(&self) -> usize {
        self.metadata.load(Ordering::SeqCst)
    }

    pub fn get_schemas(&self) -> usize {
        self.get_schemas.load(Ordering::SeqCst)
    }

    pub fn close(&self) -> usize {
        self.close.load(Ordering::SeqCst)
    }
}

/// 被阻塞的拉取请求被取消时置位
struct CancelGuard {
    flag: Arc<AtomicBool>,
    completed: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.completed {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

#[derive(Default)]
struct Script {
    chunks: VecDeque<FetchResultsResp>,
    open_status: Option<Status>,
    execute_status: Option<Status>,
    schemas_status: Option<Status>,
    close_status: Option<Status>,
    close_delay: Option<Duration>,
    schema: Option<TableSchema>,
    withhold_operation: bool,
    open_requests: Vec<OpenSessionReq>,
    statements: Vec<String>,
    fetch_sizes: Vec<i64>,
    closed: Vec<OperationHandle>,
}

/// 脚本化的 RPC 桩
///
/// 拉取队列耗尽后总是返回空块。
pub struct MockService {
    script: Mutex<Script>,
    driver: DriverHandle,
    next_operation: AtomicUsize,
    block_fetch: AtomicBool,
    fetch_cancelled: Arc<AtomicBool>,
    pub calls: CallCounters,
}

impl MockService {
    /// 需要在 tokio 运行时内调用，驱动任务一直挂起直到被取消
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script::default()),
            driver: DriverHandle::spawn(std::future::pending()),
            next_operation: AtomicUsize::new(1),
            block_fetch: AtomicBool::new(false),
            fetch_cancelled: Arc::new(AtomicBool::new(false)),
            calls: CallCounters::default(),
        })
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("mock script poisoned")
    }

    /// 追加一块 I32 单列结果
    pub fn push_i32_chunk(&self, values: &[i32]) {
        let rows = values
            .iter()
            .map(|v| Row {
                col_vals: vec![ColumnValue::i32(*v)],
            })
            .collect();
        self.push_rows(rows);
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.push_fetch_response(FetchResultsResp {
            status: Status::success(),
            has_more_rows: None,
            results: Some(RowSet {
                start_row_offset: 0,
                rows,
            }),
        });
    }

    pub fn push_fetch_response(&self, resp: FetchResultsResp) {
        self.script().chunks.push_back(resp);
    }

    pub fn set_open_status(&self, status: Status) {
        self.script().open_status = Some(status);
    }

    pub fn set_execute_status(&self, status: Status) {
        self.script().execute_status = Some(status);
    }

    pub fn set_schemas_status(&self, status: Status) {
        self.script().schemas_status = Some(status);
    }

    pub fn set_close_status(&self, status: Status) {
        self.script().close_status = Some(status);
    }

    /// 关闭请求先等待一段时间，再记录并应答
    pub fn delay_closes(&self, delay: Duration) {
        self.script().close_delay = Some(delay);
    }

    pub fn set_schema(&self, schema: TableSchema) {
        self.script().schema = Some(schema);
    }

    /// ExecuteStatement 响应不携带操作句柄
    pub fn withhold_operation_handle(&self) {
        self.script().withhold_operation = true;
    }

    /// 之后的拉取请求一直挂起，直到被取消
    pub fn block_fetches(&self) {
        self.block_fetch.store(true, Ordering::SeqCst);
    }

    pub fn fetch_was_cancelled(&self) -> bool {
        self.fetch_cancelled.load(Ordering::SeqCst)
    }

    pub fn open_requests(&self) -> Vec<OpenSessionReq> {
        self.script().open_requests.clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.script().statements.clone()
    }

    pub fn fetch_sizes(&self) -> Vec<i64> {
        self.script().fetch_sizes.clone()
    }

    pub fn closed_operations(&self) -> Vec<OperationHandle> {
        self.script().closed.clone()
    }

    /// 模拟底层通道被取消
    pub fn kill(&self) {
        self.driver.cancel();
    }

    fn issue_operation(&self, operation_type: OperationType) -> OperationHandle {
        let id = self.next_operation.fetch_add(1, Ordering::SeqCst);
        operation_handle(id as u8, operation_type)
    }
}

#[async_trait]
impl Hs2Service for MockService {
    async fn open_session(&self, req: OpenSessionReq) -> TransportResult<OpenSessionResp> {
        self.calls.open_session.fetch_add(1, Ordering::SeqCst);
        let status = {
            let mut script = self.script();
            script.open_requests.push(req);
            script.open_status.clone()
        };
        Ok(match status {
            Some(status) => OpenSessionResp {
                status,
                server_protocol_version: ProtocolVersion::V1,
                session_handle: None,
            },
            None => OpenSessionResp {
                status: Status::success(),
                server_protocol_version: ProtocolVersion::V1,
                session_handle: Some(session_handle()),
            },
        })
    }

    async fn execute_statement(
        &self,
        req: ExecuteStatementReq,
    ) -> TransportResult<ExecuteStatementResp> {
        self.calls.execute.fetch_add(1, Ordering::SeqCst);
        let (status, withhold) = {
            let mut script = self.script();
            script.statements.push(req.statement);
            (script.execute_status.clone(), script.withhold_operation)
        };
        let operation_handle = if withhold {
            None
        } else {
            Some(self.issue_operation(OperationType::ExecuteStatement))
        };
        Ok(ExecuteStatementResp {
            status: status.unwrap_or_else(Status::success),
            operation_handle,
        })
    }

    async fn fetch_results(&self, req: FetchResultsReq) -> TransportResult<FetchResultsResp> {
        self.calls.fetch.fetch_add(1, Ordering::SeqCst);
        self.script().fetch_sizes.push(req.max_rows);

        if self.block_fetch.load(Ordering::SeqCst) {
            let mut guard = CancelGuard {
                flag: Arc::clone(&self.fetch_cancelled),
                completed: false,
            };
            tokio::time::sleep(Duration::from_secs(3600)).await;
            guard.completed = true;
        }

        let next = self.script().chunks.pop_front();
        Ok(next.unwrap_or_else(|| FetchResultsResp {
            status: Status::success(),
            has_more_rows: Some(false),
            results: Some(RowSet::default()),
        }))
    }

    async fn get_result_set_metadata(
        &self,
        _req: GetResultSetMetadataReq,
    ) -> TransportResult<GetResultSetMetadataResp> {
        self.calls.metadata.fetch_add(1, Ordering::SeqCst);
        Ok(GetResultSetMetadataResp {
            status: Status::success(),
            schema: self.script().schema.clone(),
        })
    }

    async fn get_schemas(&self, _req: GetSchemasReq) -> TransportResult<GetSchemasResp> {
        self.calls.get_schemas.fetch_add(1, Ordering::SeqCst);
        let status = self.script().schemas_status.clone();
        Ok(GetSchemasResp {
            status: status.unwrap_or_else(Status::success),
            operation_handle: Some(self.issue_operation(OperationType::GetSchemas)),
        })
    }

    async fn close_operation(
        &self,
        req: CloseOperationReq,
    ) -> TransportResult<CloseOperationResp> {
        let delay = self.script().close_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.close.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script();
        script.closed.push(req.operation_handle);
        Ok(CloseOperationResp {
            status: script.close_status.clone().unwrap_or_else(Status::success),
        })
    }

    fn is_terminated(&self) -> bool {
        self.driver.is_terminated()
    }
}

/// 传输工厂桩
///
/// 按顺序交出预先准备的 RPC 桩，用完后每次连接新建一个空脚本的桩。
#[derive(Default)]
pub struct MockFactory {
    prepared: Mutex<VecDeque<Arc<MockService>>>,
    issued: Mutex<Vec<Arc<MockService>>>,
    failure: Mutex<Option<TransportError>>,
    connects: AtomicUsize,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 以单个预先准备的桩创建工厂
    pub fn with_service(service: Arc<MockService>) -> Arc<Self> {
        let factory = Self::new();
        factory.prepare(service);
        factory
    }

    pub fn prepare(&self, service: Arc<MockService>) {
        self.prepared
            .lock()
            .expect("mock factory poisoned")
            .push_back(service);
    }

    pub fn fail_with(&self, err: TransportError) {
        *self.failure.lock().expect("mock factory poisoned") = Some(err);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// 最近一次连接交出的桩
    pub fn last_service(&self) -> Option<Arc<MockService>> {
        self.issued
            .lock()
            .expect("mock factory poisoned")
            .last()
            .cloned()
    }
}

#[async_trait]
impl TransportFactory for MockFactory {
    async fn connect(&self, _endpoint: &Endpoint) -> TransportResult<Arc<dyn Hs2Service>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.lock().expect("mock factory poisoned").clone() {
            return Err(err);
        }

        let service = self
            .prepared
            .lock()
            .expect("mock factory poisoned")
            .pop_front()
            .unwrap_or_else(MockService::new);
        self.issued
            .lock()
            .expect("mock factory poisoned")
            .push(Arc::clone(&service));
        Ok(service as Arc<dyn Hs2Service>)
    }
}

pub fn session_handle() -> SessionHandle {
    SessionHandle {
        guid: vec![0xAB; 16],
        secret: vec![0xCD; 16],
    }
}

pub fn operation_handle(id: u8, operation_type: OperationType) -> OperationHandle {
    OperationHandle {
        guid: vec![id; 16],
        secret: vec![id; 16],
        operation_type,
        has_result_set: true,
    }
}

pub fn endpoint() -> Endpoint {
    Endpoint::new("127.0.0.1", 10000)
}

/// 单列 `id INT_TYPE` 的结果集结构
pub fn id_schema() -> TableSchema {
    TableSchema {
        columns: vec![ColumnDesc {
            column_name: "id".to_string(),
            type_desc: TypeDesc::primitive(TypeId::Int),
            position: 1,
            comment: None,
        }],
    }
}

/// 让出执行权，使后台任务有机会推进
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
