use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::api::cursor::DEFAULT_MAX_ROWS;
use crate::core::types::{AuthMechanism, AuthParams, Endpoint};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("读取配置文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("解析配置文件失败: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("序列化配置失败: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("无效的配置: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub endpoint: EndpointConfig,
    pub auth: AuthConfig,
    pub fetch: FetchConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 10000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    pub mechanism: AuthMechanism,
    pub username: String,
    pub password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let auth = AuthParams::default();
        Self {
            mechanism: auth.mechanism,
            username: auth.username,
            password: auth.password,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    /// 每次 FetchResults 请求的最大行数
    pub max_rows: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "hs2client".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.host.is_empty() {
            return Err(ConfigError::Invalid("endpoint.host 不能为空".to_string()));
        }
        if self.fetch.max_rows == 0 {
            return Err(ConfigError::Invalid("fetch.max_rows 必须大于 0".to_string()));
        }
        Ok(())
    }

    /// 由配置构造服务端点
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.endpoint.host.clone(), self.endpoint.port).with_auth(AuthParams {
            mechanism: self.auth.mechanism,
            username: self.auth.username.clone(),
            password: self.auth.password.clone(),
        })
    }
}
