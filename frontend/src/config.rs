//! 运行时配置
//!
//! 所有值都有默认常量，可以通过 builder 方法或页面 `<meta>` 覆盖。

use brava_shared::{DEFAULT_API_BASE, PermissionConfigError, PermissionTable};

const DEFAULT_ACCESS_TOKEN_KEY: &str = "brava_access_token";
const DEFAULT_REFRESH_TOKEN_KEY: &str = "brava_refresh_token";
const DEFAULT_USER_KEY: &str = "brava_user";
const DEFAULT_REQUESTED_WITH: &str = "XMLHttpRequest";
const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_HOME_PATH: &str = "/dashboard";

const META_API_BASE: &str = "brava-api-base";

/// 持久化存储中的三个键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub access_token: String,
    pub refresh_token: String,
    pub user: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            access_token: DEFAULT_ACCESS_TOKEN_KEY.to_string(),
            refresh_token: DEFAULT_REFRESH_TOKEN_KEY.to_string(),
            user: DEFAULT_USER_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base: String,
    pub storage_keys: StorageKeys,
    /// `X-Requested-With` 的值
    pub requested_with: String,
    pub login_path: String,
    pub home_path: String,
    /// 启动时访问令牌已过期但存在刷新令牌时，先尝试刷新一次
    pub refresh_on_startup: bool,
    /// 原始的角色 -> 权限配置；`None` 表示使用内置表
    permissions: Option<Vec<(String, Vec<String>)>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            storage_keys: StorageKeys::default(),
            requested_with: DEFAULT_REQUESTED_WITH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            home_path: DEFAULT_HOME_PATH.to_string(),
            refresh_on_startup: false,
            permissions: None,
        }
    }
}

impl AppConfig {
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_refresh_on_startup(mut self, enabled: bool) -> Self {
        self.refresh_on_startup = enabled;
        self
    }

    pub fn with_permissions<R, P>(mut self, raw: impl IntoIterator<Item = (R, Vec<P>)>) -> Self
    where
        R: Into<String>,
        P: Into<String>,
    {
        self.permissions = Some(
            raw.into_iter()
                .map(|(r, ps)| (r.into(), ps.into_iter().map(Into::into).collect()))
                .collect(),
        );
        self
    }

    /// 校验并构建权限表，遇到未知名称立即失败
    pub fn permission_table(&self) -> Result<PermissionTable, PermissionConfigError> {
        match &self.permissions {
            Some(raw) => PermissionTable::from_raw(raw.iter().map(|(r, ps)| (r, ps))),
            None => Ok(PermissionTable::default()),
        }
    }

    /// 读取页面上的 `<meta name="brava-api-base" content="...">` 覆盖默认值
    pub fn from_document() -> Self {
        let config = Self::default();
        let base = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| {
                d.query_selector(&format!("meta[name=\"{}\"]", META_API_BASE))
                    .ok()
                    .flatten()
            })
            .and_then(|el| el.get_attribute("content"))
            .filter(|s| !s.is_empty());

        match base {
            Some(base) => config.with_api_base(base),
            None => config,
        }
    }
}
