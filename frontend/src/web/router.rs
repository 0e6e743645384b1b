//! 路由服务模块 - 核心引擎
//!
//! 把地址片段匹配到路由表中的处理函数：
//! 精确匹配优先，其次按声明顺序尝试带 `:name` 参数的模式，最后是通配路由 `*`。
//! 所有对地址的修改都通过 `Location` 完成，变化事件再回到匹配流程。

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use regex::Regex;

use super::location::{Location, LocationEvent};
use super::route::{ROOT_PATH, WILDCARD};


/// 路由处理函数，按声明顺序接收参数值
pub type RouteHandler = Rc<dyn Fn(&[String])>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    EmptyPattern,
    DuplicatePattern(String),
    InvalidPattern { pattern: String, reason: String },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::EmptyPattern => write!(f, "route pattern is empty"),
            RouteError::DuplicatePattern(p) => write!(f, "route pattern registered twice: {}", p),
            RouteError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid route pattern {}: {}", pattern, reason)
            }
        }
    }
}

impl std::error::Error for RouteError {}

// =========================================================
// 路由表
// =========================================================

enum PatternKind {
    Static,
    Param { regex: Regex, names: Vec<String> },
    Wildcard,
}

struct Route {
    pattern: String,
    kind: PatternKind,
    handler: RouteHandler,
}

/// 把 `:name` 占位替换为单段捕获组，其余部分按字面量转义
fn compile_pattern(pattern: &str) -> Result<(Regex, Vec<String>), RouteError> {
    let invalid = |reason: String| RouteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    };
    let placeholder = Regex::new(r":([^/]+)").map_err(|e| invalid(e.to_string()))?;

    let mut source = String::from("^");
    let mut names = Vec::new();
    let mut last = 0;
    for caps in placeholder.captures_iter(pattern) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        source.push_str(&regex::escape(&pattern[last..whole.start()]));
        source.push_str("([^/]+)");
        names.push(name.as_str().to_string());
        last = whole.end();
    }
    source.push_str(&regex::escape(&pattern[last..]));
    source.push('$');

    let regex = Regex::new(&source).map_err(|e| invalid(e.to_string()))?;
    Ok((regex, names))
}

/// 路由表：模式 -> 处理函数
///
/// 插入顺序决定参数模式的匹配优先级；最多一个通配路由。
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&[String]) + 'static,
    {
        self.insert_handler(pattern, Rc::new(handler))
    }

    pub fn insert_handler(&mut self, pattern: &str, handler: RouteHandler) -> Result<(), RouteError> {
        if pattern.is_empty() {
            return Err(RouteError::EmptyPattern);
        }
        if self.contains(pattern) {
            return Err(RouteError::DuplicatePattern(pattern.to_string()));
        }

        let kind = if pattern == WILDCARD {
            PatternKind::Wildcard
        } else if pattern.contains(':') {
            let (regex, names) = compile_pattern(pattern)?;
            PatternKind::Param { regex, names }
        } else {
            PatternKind::Static
        };

        self.routes.push(Route {
            pattern: pattern.to_string(),
            kind,
            handler,
        });
        Ok(())
    }

    /// 链式注册
    pub fn route<F>(mut self, pattern: &str, handler: F) -> Result<Self, RouteError>
    where
        F: Fn(&[String]) + 'static,
    {
        self.insert(pattern, handler)?;
        Ok(self)
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.routes.iter().any(|r| r.pattern == pattern)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// 纯匹配，不调用处理函数
    fn resolve(&self, path: &str) -> Resolution {
        if let Some(route) = self
            .routes
            .iter()
            .find(|r| matches!(r.kind, PatternKind::Static) && r.pattern == path)
        {
            return Resolution {
                outcome: MatchOutcome::Exact(route.pattern.clone()),
                handler: Some(route.handler.clone()),
                params: Vec::new(),
            };
        }

        for route in &self.routes {
            let PatternKind::Param { regex, names } = &route.kind else {
                continue;
            };
            let Some(caps) = regex.captures(path) else {
                continue;
            };
            let params = names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
                    (name.clone(), value.to_string())
                })
                .collect();
            return Resolution {
                outcome: MatchOutcome::Parameterized(route.pattern.clone()),
                handler: Some(route.handler.clone()),
                params,
            };
        }

        match self
            .routes
            .iter()
            .find(|r| matches!(r.kind, PatternKind::Wildcard))
        {
            Some(route) => Resolution {
                outcome: MatchOutcome::Wildcard,
                handler: Some(route.handler.clone()),
                params: Vec::new(),
            },
            None => Resolution {
                outcome: MatchOutcome::Unmatched,
                handler: None,
                params: Vec::new(),
            },
        }
    }
}

struct Resolution {
    outcome: MatchOutcome,
    handler: Option<RouteHandler>,
    /// (名称, 值)，按声明顺序
    params: Vec<(String, String)>,
}

/// 一次匹配的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Exact(String),
    Parameterized(String),
    Wildcard,
    /// 既无匹配也无通配路由，不调用任何处理函数
    Unmatched,
}

/// 当前导航状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub pattern: Option<String>,
    pub params: HashMap<String, String>,
}

/// 导航代次凭证
///
/// 异步视图加载完成后用 `is_current()` 判断期间是否发生了新的导航。
#[derive(Debug, Clone)]
pub struct NavigationTicket {
    generation: u64,
    counter: Rc<Cell<u64>>,
}

impl NavigationTicket {
    pub fn is_current(&self) -> bool {
        self.counter.get() == self.generation
    }
}

// =========================================================
// 路由服务
// =========================================================

/// 路由器服务
pub struct Router {
    location: Rc<dyn Location>,
    table: RefCell<RouteTable>,
    state: RefCell<NavigationState>,
    generation: Rc<Cell<u64>>,
    initialized: Cell<bool>,
}

impl Router {
    pub fn new(location: Rc<dyn Location>) -> Rc<Self> {
        Rc::new(Self {
            location,
            table: RefCell::new(RouteTable::new()),
            state: RefCell::new(NavigationState::default()),
            generation: Rc::new(Cell::new(0)),
            initialized: Cell::new(false),
        })
    }

    /// 安装路由表并订阅地址变化（重复调用只替换路由表）
    pub fn init(self: &Rc<Self>, table: RouteTable) {
        *self.table.borrow_mut() = table;

        if self.initialized.replace(true) {
            return;
        }

        let router = Rc::downgrade(self);
        self.location.subscribe(Rc::new(move |event| {
            let Some(router) = router.upgrade() else {
                return;
            };
            match event {
                LocationEvent::FragmentChanged => {
                    router.handle_route_change();
                }
                LocationEvent::LinkClicked(path) => router.navigate(&path),
            }
        }));
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// 修改地址片段，由变化事件驱动匹配
    ///
    /// 目标与当前片段相同时平台不会发出事件，此时直接重新匹配。
    pub fn navigate(&self, path: &str) {
        if self.location.fragment() == path {
            if self.initialized.get() {
                self.handle_route_change();
            }
            return;
        }
        self.location.set_fragment(path);
    }

    /// 当前路径；片段为空时为 `/`
    pub fn current_path(&self) -> String {
        let fragment = self.location.fragment();
        if fragment.is_empty() {
            ROOT_PATH.to_string()
        } else {
            fragment
        }
    }

    pub fn handle_route_change(&self) -> MatchOutcome {
        let path = self.current_path();
        self.match_route(&path)
    }

    /// 匹配路径并调用处理函数
    pub fn match_route(&self, path: &str) -> MatchOutcome {
        self.generation.set(self.generation.get() + 1);

        let resolution = self.table.borrow().resolve(path);
        let Resolution {
            outcome,
            handler,
            params,
        } = resolution;

        // 先更新状态再调用处理函数：处理函数可能重定向并重入本方法
        {
            let mut state = self.state.borrow_mut();
            state.params.clear();
            state.pattern = match &outcome {
                MatchOutcome::Exact(p) | MatchOutcome::Parameterized(p) => Some(p.clone()),
                MatchOutcome::Wildcard => Some(WILDCARD.to_string()),
                MatchOutcome::Unmatched => None,
            };
            state.params.extend(params.iter().cloned());
        }

        match &outcome {
            MatchOutcome::Unmatched => {
                log::warn!("[Router] No route for {} and no wildcard registered", path);
            }
            other => log::debug!("[Router] {} -> {:?}", path, other),
        }

        if let Some(handler) = handler {
            let args: Vec<String> = params.into_iter().map(|(_, v)| v).collect();
            handler(&args);
        }
        outcome
    }

    pub fn current_route(&self) -> Option<String> {
        self.state.borrow().pattern.clone()
    }

    pub fn params(&self) -> HashMap<String, String> {
        self.state.borrow().params.clone()
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.state.borrow().params.get(name).cloned()
    }

    pub fn navigation_state(&self) -> NavigationState {
        self.state.borrow().clone()
    }

    pub fn ticket(&self) -> NavigationTicket {
        NavigationTicket {
            generation: self.generation.get(),
            counter: self.generation.clone(),
        }
    }
}
