//! 认证模块
//!
//! 会话存储：持久化访问令牌、刷新令牌与用户资料，负责登录、刷新、登出。
//! 生命周期事件通过 `SessionListener` 通知应用控制器，与路由系统解耦。

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use brava_shared::token;
use brava_shared::{Credentials, Permission, PermissionTable, UserProfile};

use crate::api::ApiClient;
use crate::config::{AppConfig, StorageKeys};
use crate::error::AuthFailure;
use crate::web::storage::KeyValueStore;

#[cfg(test)]
mod tests;

const NO_REFRESH_TOKEN: &str = "No refresh token";
const STORAGE_UNAVAILABLE: &str = "Could not store the session";

/// 会话生命周期回调
pub trait SessionListener {
    fn on_auth_success(&self, user: &UserProfile);
    fn on_logout(&self);
}

/// 客户端持有的身份状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}

/// 会话存储
///
/// 令牌的唯一写入方；每次状态转换都同步更新 `ApiClient` 中的令牌。
pub struct SessionStore {
    storage: Rc<dyn KeyValueStore>,
    api: Rc<ApiClient>,
    keys: StorageKeys,
    permissions: PermissionTable,
    current_user: RefCell<Option<UserProfile>>,
    listener: RefCell<Option<Weak<dyn SessionListener>>>,
}

impl SessionStore {
    /// 创建会话存储，加载缓存的用户资料，并接管 API 客户端的 401 回调
    pub fn new(
        config: &AppConfig,
        storage: Rc<dyn KeyValueStore>,
        api: Rc<ApiClient>,
        permissions: PermissionTable,
    ) -> Rc<Self> {
        let store = Rc::new(Self {
            storage,
            api,
            keys: config.storage_keys.clone(),
            permissions,
            current_user: RefCell::new(None),
            listener: RefCell::new(None),
        });

        *store.current_user.borrow_mut() = store.restore().user;

        let weak = Rc::downgrade(&store);
        store.api.set_unauthorized_hook(move || {
            if let Some(store) = weak.upgrade() {
                store.force_logout();
            }
        });

        store
    }

    pub fn set_listener(&self, listener: Weak<dyn SessionListener>) {
        *self.listener.borrow_mut() = Some(listener);
    }

    fn listener(&self) -> Option<Rc<dyn SessionListener>> {
        self.listener.borrow().as_ref().and_then(Weak::upgrade)
    }

    // =========================================================
    // 持久化
    // =========================================================

    /// 读取持久化的会话；任何一项解析失败都视为没有会话
    pub fn restore(&self) -> Session {
        let user = match self.storage.get(&self.keys.user) {
            Some(raw) => match serde_json::from_str::<UserProfile>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    log::warn!("[Auth] Discarding unreadable stored user: {}", e);
                    return Session::default();
                }
            },
            None => None,
        };

        Session {
            access_token: self.storage.get(&self.keys.access_token),
            refresh_token: self.storage.get(&self.keys.refresh_token),
            user,
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.storage.get(&self.keys.access_token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get(&self.keys.refresh_token)
    }

    /// 仅供客户端提示，不校验签名
    pub fn is_expired(&self, token: Option<&str>) -> bool {
        token::is_expired(token)
    }

    /// 全部写入或全部回滚到写入前的值
    fn persist_all(&self, entries: &[(&str, &str)]) -> bool {
        let previous: Vec<(&str, Option<String>)> = entries
            .iter()
            .map(|(key, _)| (*key, self.storage.get(key)))
            .collect();

        if entries.iter().all(|(key, value)| self.storage.set(key, value)) {
            return true;
        }

        for (key, value) in previous {
            match value {
                Some(v) => self.storage.set(key, &v),
                None => self.storage.delete(key),
            };
        }
        false
    }

    fn clear(&self) {
        self.storage.delete(&self.keys.access_token);
        self.storage.delete(&self.keys.refresh_token);
        self.storage.delete(&self.keys.user);
        *self.current_user.borrow_mut() = None;
        self.api.set_auth_token(None);
    }

    // =========================================================
    // 用户
    // =========================================================

    pub fn current_user(&self) -> Option<UserProfile> {
        self.current_user.borrow().clone()
    }

    /// 更新内存和持久化的用户资料
    pub fn set_current_user(&self, user: UserProfile) {
        match serde_json::to_string(&user) {
            Ok(raw) => {
                if !self.storage.set(&self.keys.user, &raw) {
                    log::warn!("[Auth] Could not persist user, keeping it in memory only");
                }
            }
            Err(e) => log::warn!("[Auth] Could not serialize user: {}", e),
        }
        *self.current_user.borrow_mut() = Some(user);
    }

    /// 按角色查权限表；未加载用户时为 `false`
    pub fn has_permission(&self, permission: Permission) -> bool {
        match self.current_user.borrow().as_ref() {
            Some(user) => self.permissions.allows(user.parsed_role(), permission),
            None => false,
        }
    }

    // =========================================================
    // 生命周期
    // =========================================================

    /// 登录：成功时一次性持久化三项并通知监听者
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, AuthFailure> {
        let response = match self.api.login(credentials).await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("[Auth] Login failed: {}", e);
                return Err(e.into());
            }
        };

        let user_json = serde_json::to_string(&response.user)
            .map_err(|e| AuthFailure::new(format!("Invalid user profile: {}", e)))?;

        let stored = self.persist_all(&[
            (self.keys.access_token.as_str(), response.access.as_str()),
            (self.keys.refresh_token.as_str(), response.refresh.as_str()),
            (self.keys.user.as_str(), user_json.as_str()),
        ]);
        if !stored {
            log::error!("[Auth] Login succeeded but the session could not be stored");
            return Err(AuthFailure::new(STORAGE_UNAVAILABLE));
        }

        let user = response.user;
        *self.current_user.borrow_mut() = Some(user.clone());
        self.api.set_auth_token(Some(&response.access));
        log::info!("[Auth] Logged in as {:?}", user.role);

        if let Some(listener) = self.listener() {
            listener.on_auth_success(&user);
        }
        Ok(user)
    }

    /// 用刷新令牌换取新的访问令牌，只尝试一次；失败时登出
    pub async fn refresh(&self) -> Result<(), AuthFailure> {
        let Some(refresh) = self.refresh_token() else {
            self.logout().await;
            return Err(AuthFailure::new(NO_REFRESH_TOKEN));
        };

        match self.api.refresh_token(&refresh).await {
            Ok(response) => {
                if !self.storage.set(&self.keys.access_token, &response.access) {
                    self.logout().await;
                    return Err(AuthFailure::new(STORAGE_UNAVAILABLE));
                }
                self.api.set_auth_token(Some(&response.access));
                log::info!("[Auth] Access token refreshed");
                Ok(())
            }
            Err(e) => {
                log::warn!("[Auth] Token refresh failed: {}", e);
                // 401 已经触发过强制登出
                if !e.is_auth_expired() {
                    self.logout().await;
                }
                Err(e.into())
            }
        }
    }

    /// 登出：尽力通知后端，然后无条件清除本地会话
    pub async fn logout(&self) {
        if let Some(refresh) = self.refresh_token() {
            if let Err(e) = self.api.logout(&refresh).await {
                log::warn!("[Auth] Logout notification failed: {}", e);
                if e.is_auth_expired() {
                    return;
                }
            }
        }
        self.force_logout();
    }

    /// 不通知后端，直接清除会话并通知监听者（401 时使用）
    pub fn force_logout(&self) {
        self.clear();
        log::info!("[Auth] Session cleared");
        if let Some(listener) = self.listener() {
            listener.on_logout();
        }
    }
}
