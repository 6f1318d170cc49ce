use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::cursor::Cursor;
use crate::core::error::{ClientError, ClientResult};
use crate::core::types::Endpoint;
use crate::protocol::messages::{OpenSessionReq, ProtocolVersion, SessionHandle};
use crate::protocol::{Hs2Service, TransportFactory};

/// Session owns one authenticated transport together with the session handle
/// the server issued on it. Both are installed by a successful `connect` and
/// dropped together.
pub struct Session {
    service: Arc<dyn Hs2Service>,
    handle: SessionHandle,
}

impl Session {
    /// Opens a new transport and an HS2 session on it.
    ///
    /// Transport or handshake failures surface as `ClientError::Connection`,
    /// an OpenSession status carrying an error code as `ClientError::Protocol`.
    pub async fn connect(endpoint: &Endpoint, factory: &dyn TransportFactory) -> ClientResult<Self> {
        info!(
            "Connecting to {} with {} auth as {}",
            endpoint.address(),
            endpoint.auth.mechanism,
            endpoint.auth.username
        );

        let service = factory
            .connect(endpoint)
            .await
            .map_err(|e| ClientError::Connection(format!("{}: {}", endpoint.address(), e)))?;

        let req = OpenSessionReq {
            client_protocol: ProtocolVersion::V1,
            username: Some(endpoint.auth.username.clone()),
            password: Some(endpoint.auth.password.clone()),
            configuration: HashMap::new(),
        };
        let resp = service.open_session(req).await?;

        if let Some(code) = resp.status.error_code {
            return Err(ClientError::Protocol(format!(
                "OpenSession rejected [{}]: {}",
                code,
                resp.status.error_message.unwrap_or_default()
            )));
        }
        let handle = resp.session_handle.ok_or_else(|| {
            ClientError::Protocol("OpenSession response carries no session handle".to_string())
        })?;

        debug!(
            "Session opened on {} (server protocol {:?})",
            endpoint.address(),
            resp.server_protocol_version
        );
        Ok(Self { service, handle })
    }

    /// Best-effort liveness check: false once the transport's driving task
    /// has been cancelled or has finished. Half-open connections go unnoticed.
    pub fn is_alive(&self) -> bool {
        !self.service.is_terminated()
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn service(&self) -> Arc<dyn Hs2Service> {
        Arc::clone(&self.service)
    }

    /// New cursor bound to this session.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.service(), self.handle.clone())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("handle", &self.handle)
            .field("alive", &self.is_alive())
            .finish()
    }
}
