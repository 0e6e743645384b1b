//! 应用控制器
//!
//! 启动顺序：检查认证 -> 安装路由表 -> 加载基础布局 -> 隐藏加载屏 -> 首次导航。
//! 会话生命周期事件（登录成功、登出）在这里转换为布局切换和重定向。

use std::cell::Cell;
use std::rc::{Rc, Weak};

use brava_shared::UserProfile;

use crate::api::ApiClient;
use crate::auth::{SessionListener, SessionStore};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::web::http::HttpClient;
use crate::web::location::Location;
use crate::web::route::{Layout, ROOT_PATH, VIEW_ROUTES, View, ViewRoute, WILDCARD};
use crate::web::router::{RouteError, RouteTable, Router};
use crate::web::storage::KeyValueStore;


pub const INIT_FAILURE_MESSAGE: &str = "Error trying to load the app";

/// 界面外壳：控制器只通过它改变页面
pub trait Shell {
    fn load_layout(&self, layout: Layout);
    fn load_view(&self, view: View);
    fn show_not_found(&self);
    fn show_error(&self, message: &str);
    fn hide_loading_screen(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/// 平台相关的依赖
pub struct Platform {
    pub http: Rc<dyn HttpClient>,
    pub storage: Rc<dyn KeyValueStore>,
    pub location: Rc<dyn Location>,
    pub shell: Rc<dyn Shell>,
}

/// 视图可用的服务
#[derive(Clone)]
pub struct Services {
    pub api: Rc<ApiClient>,
    pub session: Rc<SessionStore>,
    pub router: Rc<Router>,
}

impl Services {
    pub fn current_user(&self) -> Option<UserProfile> {
        self.session.current_user()
    }

    pub fn navigate(&self, path: &str) {
        self.router.navigate(path);
    }
}

/// 组装所有服务；权限表非法时显示错误横幅并失败
pub fn build(config: AppConfig, platform: Platform) -> Result<Rc<AppController>, AppError> {
    let permissions = match config.permission_table() {
        Ok(table) => table,
        Err(e) => {
            log::error!("[App] Invalid permission table: {}", e);
            platform.shell.show_error(INIT_FAILURE_MESSAGE);
            return Err(e.into());
        }
    };

    let api = Rc::new(ApiClient::new(&config, platform.http));
    let session = SessionStore::new(&config, platform.storage, api.clone(), permissions);
    let router = Router::new(platform.location);
    let services = Services {
        api,
        session,
        router,
    };

    Ok(AppController::new(config, services, platform.shell))
}

/// 组装并启动应用
pub async fn start(config: AppConfig, platform: Platform) -> Result<Rc<AppController>, AppError> {
    let app = build(config, platform)?;
    app.init().await?;
    Ok(app)
}

pub struct AppController {
    config: AppConfig,
    services: Services,
    shell: Rc<dyn Shell>,
    state: Cell<AuthState>,
}

impl AppController {
    pub fn new(config: AppConfig, services: Services, shell: Rc<dyn Shell>) -> Rc<Self> {
        let app = Rc::new(Self {
            config,
            services,
            shell,
            state: Cell::new(AuthState::Unauthenticated),
        });
        let listener: Weak<dyn SessionListener> = Rc::downgrade(&app) as Weak<dyn SessionListener>;
        app.services.session.set_listener(listener);
        app
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn state(&self) -> AuthState {
        self.state.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.get() == AuthState::Authenticated
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.services.current_user()
    }

    pub fn navigate(&self, path: &str) {
        self.services.navigate(path);
    }

    // =========================================================
    // 启动
    // =========================================================

    pub async fn init(self: &Rc<Self>) -> Result<(), AppError> {
        log::info!("[App] Starting");
        let result = self.boot().await;
        if let Err(e) = &result {
            log::error!("[App] Startup failed: {}", e);
            self.shell.show_error(INIT_FAILURE_MESSAGE);
        }
        result
    }

    async fn boot(self: &Rc<Self>) -> Result<(), AppError> {
        let state = self.check_auth().await;
        log::info!("[App] Auth state: {:?}", state);

        self.services.router.init(self.routes()?);
        self.load_base_layout();
        self.shell.hide_loading_screen();

        let path = self.services.router.current_path();
        self.services.router.navigate(&path);
        Ok(())
    }

    /// 根据持久化的会话决定初始认证状态
    pub async fn check_auth(&self) -> AuthState {
        self.state.set(AuthState::Authenticating);
        let session = self.services.session.restore();

        let mut token = session
            .access_token
            .filter(|t| !self.services.session.is_expired(Some(t)));

        if token.is_none() && self.config.refresh_on_startup && session.refresh_token.is_some() {
            // 刷新失败时会话已被清除
            if self.services.session.refresh().await.is_err() {
                self.state.set(AuthState::Unauthenticated);
                return AuthState::Unauthenticated;
            }
            token = self.services.session.access_token();
        }

        let Some(token) = token else {
            self.state.set(AuthState::Unauthenticated);
            self.services.session.logout().await;
            return self.state.get();
        };

        self.services.api.set_auth_token(Some(&token));
        self.state.set(AuthState::Authenticated);

        if self.services.session.current_user().is_none() {
            match self.services.api.current_user().await {
                Ok(user) => self.services.session.set_current_user(user),
                // 401 已经触发强制登出
                Err(e) => log::warn!("[App] Could not load current user: {}", e),
            }
        }
        self.state.get()
    }

    fn load_base_layout(&self) {
        let layout = if self.is_authenticated() {
            Layout::Main
        } else {
            Layout::Auth
        };
        self.shell.load_layout(layout);
    }

    // =========================================================
    // 路由
    // =========================================================

    fn routes(self: &Rc<Self>) -> Result<RouteTable, RouteError> {
        let mut table = RouteTable::new();

        let app = Rc::downgrade(self);
        table.insert(ROOT_PATH, move |_| {
            if let Some(app) = app.upgrade() {
                let target = if app.is_authenticated() {
                    &app.config.home_path
                } else {
                    &app.config.login_path
                };
                app.navigate(target);
            }
        })?;

        for route in VIEW_ROUTES {
            table.insert_handler(route.pattern, self.view_handler(route))?;
        }

        let app = Rc::downgrade(self);
        table.insert(WILDCARD, move |_| {
            if let Some(app) = app.upgrade() {
                app.shell.show_not_found();
            }
        })?;

        Ok(table)
    }

    /// 受保护视图在每次调用时检查认证状态
    fn view_handler(self: &Rc<Self>, route: &ViewRoute) -> Rc<dyn Fn(&[String])> {
        let app = Rc::downgrade(self);
        let build = route.build;
        Rc::new(move |params: &[String]| {
            let Some(app) = app.upgrade() else {
                return;
            };
            let view = build(params);
            if view.requires_auth() && !app.is_authenticated() {
                log::debug!("[App] {} requires login, redirecting", view);
                app.navigate(&app.config.login_path);
                return;
            }
            app.shell.load_view(view);
        })
    }
}

impl SessionListener for AppController {
    fn on_auth_success(&self, user: &UserProfile) {
        log::info!("[App] Authenticated as {:?}", user.role);
        self.state.set(AuthState::Authenticated);
        self.load_base_layout();
        self.navigate(&self.config.home_path);
    }

    fn on_logout(&self) {
        self.state.set(AuthState::Unauthenticated);
        // 启动期间由 boot 负责布局和首次导航
        if !self.services.router.is_initialized() {
            return;
        }
        self.load_base_layout();
        self.navigate(&self.config.login_path);
    }
}
