use std::fmt;

use brava_shared::PermissionConfigError;

use crate::web::router::RouteError;

/// 会话过期时返回给调用者的固定消息
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired";

// =========================================================
// 错误类型枚举
// =========================================================

/// API 错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 传输层失败，没有响应
    Network,
    /// 非 2xx 响应（401 除外）
    Http(u16),
    /// 401：已触发强制登出
    AuthExpired,
    /// 响应体或令牌无法解析
    Decode,
}

impl ApiErrorKind {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiErrorKind::Network => "NETWORK_FAILURE",
            ApiErrorKind::Http(_) => "HTTP_ERROR",
            ApiErrorKind::AuthExpired => "AUTH_EXPIRED",
            ApiErrorKind::Decode => "DECODE_FAILURE",
        }
    }
}

// =========================================================
// 核心错误类型
// =========================================================

/// API 调用失败
///
/// - kind: 错误类型
/// - message: 面向用户的消息
/// - spans: 发生错误时的操作追踪
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    message: String,
    spans: Vec<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            spans: Vec::new(),
        }
    }

    // --- Convenience constructors ---

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Http(status), message)
    }

    pub fn auth_expired() -> Self {
        Self::new(ApiErrorKind::AuthExpired, SESSION_EXPIRED_MESSAGE)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Decode, message)
    }

    /// 添加操作追踪
    pub fn in_op(mut self, operation: impl Into<String>) -> Self {
        self.spans.push(operation.into());
        self
    }

    // --- Accessors ---

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn spans(&self) -> &[String] {
        &self.spans
    }

    pub fn is_auth_expired(&self) -> bool {
        self.kind == ApiErrorKind::AuthExpired
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.error_code(), self.message)?;
        if !self.spans.is_empty() {
            write!(f, " | trace: {}", self.spans.join(" -> "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// 登录或刷新失败的结果，携带可展示的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub message: String,
}

impl AuthFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ApiError> for AuthFailure {
    fn from(e: ApiError) -> Self {
        Self::new(e.message())
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AuthFailure {}

// =========================================================
// 启动错误
// =========================================================

/// 应用启动失败
#[derive(Debug)]
pub enum AppError {
    Config(PermissionConfigError),
    Route(RouteError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "invalid configuration: {}", e),
            AppError::Route(e) => write!(f, "invalid route table: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Route(e) => Some(e),
        }
    }
}

impl From<PermissionConfigError> for AppError {
    fn from(e: PermissionConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<RouteError> for AppError {
    fn from(e: RouteError) -> Self {
        AppError::Route(e)
    }
}
