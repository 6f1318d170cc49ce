//! 协议层
//!
//! 外部协作者的类型化接口：请求/响应消息、RPC 桩与传输工厂

pub mod messages;
pub mod service;

pub use messages::{OperationHandle, SessionHandle, Status, TypeId};
pub use service::{DriverHandle, Hs2Service, TransportFactory};
