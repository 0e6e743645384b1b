//! Brava 后台前端
//!
//! 分层：
//! - `web`: 浏览器原生 API 封装与路由引擎
//! - `api` / `auth`: API 客户端与会话存储
//! - `app`: 应用控制器，编排启动、认证守卫与重定向
//! - `components`: Leptos 界面层，实现 `Shell`

mod api;
mod app;
mod auth;
mod config;
mod error;
mod components {
    pub mod layout;
    pub mod login;
    pub mod resource;
}

// 原生 Web API 封装模块
// 平台能力都藏在 trait 后面，核心逻辑可以在原生测试中运行。
pub(crate) mod web {
    pub mod http;
    pub mod location;
    pub mod route;
    pub mod router;
    pub mod storage;
}

pub use app::{AppController, AuthState};
pub use config::AppConfig;

use std::rc::Rc;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use leptos::task::spawn_local;

use crate::app::{Platform, Shell};
use crate::components::layout::AppShell;
use crate::web::http::FetchClient;
use crate::web::location::HashLocation;
use crate::web::route::{Layout, View};
use crate::web::storage::{self, KeyValueStore, MemoryStorage};

// =========================================================
// 界面状态
// =========================================================

/// 内容区域当前显示的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Blank,
    View(View),
    NotFound,
}

/// 界面状态信号，通过 Context 在组件间共享
#[derive(Clone, Copy)]
pub struct ShellState {
    pub layout: RwSignal<Option<Layout>>,
    pub screen: RwSignal<Screen>,
    pub error: RwSignal<Option<String>>,
    pub loading: RwSignal<bool>,
}

impl ShellState {
    fn new() -> Self {
        Self {
            layout: RwSignal::new(None),
            screen: RwSignal::new(Screen::Blank),
            error: RwSignal::new(None),
            loading: RwSignal::new(true),
        }
    }
}

pub fn use_shell() -> ShellState {
    use_context::<ShellState>().expect("ShellState should be provided")
}

/// 控制器句柄；`Rc` 不是 `Send`，用本地存储包装后放入 Context
#[derive(Clone, Copy)]
pub struct AppHandle(StoredValue<Rc<AppController>, LocalStorage>);

impl AppHandle {
    pub fn get(&self) -> Rc<AppController> {
        self.0.get_value()
    }
}

pub fn use_app() -> AppHandle {
    use_context::<AppHandle>().expect("AppHandle should be provided")
}

/// 把控制器的界面指令写入信号
struct LeptosShell(ShellState);

impl Shell for LeptosShell {
    fn load_layout(&self, layout: Layout) {
        self.0.layout.set(Some(layout));
    }

    fn load_view(&self, view: View) {
        self.0.screen.set(Screen::View(view));
    }

    fn show_not_found(&self) {
        self.0.screen.set(Screen::NotFound);
    }

    fn show_error(&self, message: &str) {
        self.0.error.set(Some(message.to_string()));
    }

    fn hide_loading_screen(&self) {
        self.0.loading.set(false);
    }
}

fn browser_storage() -> Rc<dyn KeyValueStore> {
    if storage::LocalStorage::is_available() {
        Rc::new(storage::LocalStorage)
    } else {
        log::warn!("[App] localStorage unavailable, session will not survive reloads");
        Rc::new(MemoryStorage::new())
    }
}

#[component]
pub fn App() -> impl IntoView {
    let shell = ShellState::new();
    provide_context(shell);

    let platform = Platform {
        http: Rc::new(FetchClient),
        storage: browser_storage(),
        location: Rc::new(HashLocation),
        shell: Rc::new(LeptosShell(shell)),
    };

    if let Ok(app) = app::build(AppConfig::from_document(), platform) {
        provide_context(AppHandle(StoredValue::new_local(app.clone())));
        spawn_local(async move {
            // 失败时控制器已经显示错误横幅
            let _ = app.init().await;
        });
    }

    view! { <AppShell /> }
}
