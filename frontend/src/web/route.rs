//! 路由定义模块 - 领域模型
//!
//! 这是纯粹的业务逻辑层，不依赖于 DOM 或 web_sys。
//! 定义了应用的所有视图、它们的路径模式及属性。

use std::fmt::Display;

/// 根路径，按认证状态重定向
pub const ROOT_PATH: &str = "/";
/// 通配路由
pub const WILDCARD: &str = "*";

/// 基础布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// 侧边栏 + 顶栏
    Main,
    /// 登录/注册
    Auth,
}

/// 应用视图
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Login,
    Register,
    Dashboard,
    ProductList,
    /// `None` 表示新建
    ProductForm(Option<String>),
    ProductDetail(String),
    OrderList,
    OrderDetail(String),
    CustomerList,
    CustomerForm,
    CustomerDetail(String),
    Settings,
}

/// 路径模式 -> 视图
#[derive(Debug, Clone, Copy)]
pub struct ViewRoute {
    pub pattern: &'static str,
    /// 按声明顺序接收路径参数
    pub build: fn(&[String]) -> View,
}

fn first(params: &[String]) -> String {
    params.first().cloned().unwrap_or_default()
}

const fn route(pattern: &'static str, build: fn(&[String]) -> View) -> ViewRoute {
    ViewRoute { pattern, build }
}

/// 所有视图路由，按声明顺序
pub const VIEW_ROUTES: &[ViewRoute] = &[
    route("/login", |_| View::Login),
    route("/register", |_| View::Register),
    route("/dashboard", |_| View::Dashboard),
    route("/products", |_| View::ProductList),
    route("/products/new", |_| View::ProductForm(None)),
    route("/products/:id", |p| View::ProductDetail(first(p))),
    route("/products/:id/edit", |p| View::ProductForm(Some(first(p)))),
    route("/orders", |_| View::OrderList),
    route("/orders/:id", |p| View::OrderDetail(first(p))),
    route("/customers", |_| View::CustomerList),
    route("/customers/new", |_| View::CustomerForm),
    route("/customers/:id", |p| View::CustomerDetail(first(p))),
    route("/settings", |_| View::Settings),
];

impl View {
    /// 获取视图对应的 URL 片段
    pub fn to_path(&self) -> String {
        match self {
            Self::Login => "/login".into(),
            Self::Register => "/register".into(),
            Self::Dashboard => "/dashboard".into(),
            Self::ProductList => "/products".into(),
            Self::ProductForm(None) => "/products/new".into(),
            Self::ProductForm(Some(id)) => format!("/products/{}/edit", id),
            Self::ProductDetail(id) => format!("/products/{}", id),
            Self::OrderList => "/orders".into(),
            Self::OrderDetail(id) => format!("/orders/{}", id),
            Self::CustomerList => "/customers".into(),
            Self::CustomerForm => "/customers/new".into(),
            Self::CustomerDetail(id) => format!("/customers/{}", id),
            Self::Settings => "/settings".into(),
        }
    }

    /// **核心守卫逻辑：定义该视图是否需要认证**
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Login | Self::Register)
    }
}

impl Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}
