//! 服务端点与认证参数

use serde::{Deserialize, Serialize};

/// 认证机制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMechanism {
    #[serde(rename = "PLAIN")]
    Plain,
    #[serde(rename = "NOSASL")]
    NoSasl,
    #[serde(rename = "GSSAPI")]
    Gssapi,
}

impl AuthMechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMechanism::Plain => "PLAIN",
            AuthMechanism::NoSasl => "NOSASL",
            AuthMechanism::Gssapi => "GSSAPI",
        }
    }
}

impl std::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 认证参数，交给传输工厂完成握手
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthParams {
    pub mechanism: AuthMechanism,
    pub username: String,
    pub password: String,
}

impl Default for AuthParams {
    /// 未提供认证信息时使用匿名 PLAIN 认证
    fn default() -> Self {
        Self {
            mechanism: AuthMechanism::Plain,
            username: "anonymous".to_string(),
            password: "anonymous".to_string(),
        }
    }
}

/// 服务端点，在 Client 生命周期内不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub auth: AuthParams,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            auth: AuthParams::default(),
        }
    }

    pub fn with_auth(mut self, auth: AuthParams) -> Self {
        self.auth = auth;
        self
    }

    /// `host:port` 形式的地址
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
