//! 地址片段（`#` 之后的部分）封装
//!
//! 路由器的唯一输入/输出。平台事件（hashchange、页内链接点击）
//! 被转换为 `LocationEvent` 消息推送给订阅者。

use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

/// 平台导航事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationEvent {
    /// 地址片段已变化（包括浏览器后退/前进）
    FragmentChanged,
    /// 点击了 `href="#..."` 的链接，携带去掉 `#` 后的路径
    LinkClicked(String),
}

pub type LocationListener = Rc<dyn Fn(LocationEvent)>;

pub trait Location {
    /// 当前片段，不含 `#`
    fn fragment(&self) -> String;

    /// 修改片段；片段真正变化时平台会随后发出 `FragmentChanged`
    fn set_fragment(&self, path: &str);

    fn subscribe(&self, listener: LocationListener);
}

// =========================================================
// 浏览器实现
// =========================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct HashLocation;

impl Location for HashLocation {
    fn fragment(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().hash().ok())
            .map(|h| h.trim_start_matches('#').to_string())
            .unwrap_or_default()
    }

    fn set_fragment(&self, path: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.location().set_hash(&format!("#{}", path));
        }
    }

    fn subscribe(&self, listener: LocationListener) {
        let Some(window) = web_sys::window() else {
            return;
        };

        let on_hash_change = {
            let listener = listener.clone();
            Closure::<dyn Fn()>::new(move || listener(LocationEvent::FragmentChanged))
        };
        let _ = window
            .add_event_listener_with_callback("hashchange", on_hash_change.as_ref().unchecked_ref());
        // 监听器需要与页面同寿命
        on_hash_change.forget();

        let on_click = Closure::<dyn Fn(web_sys::Event)>::new(move |ev: web_sys::Event| {
            let anchor = ev
                .target()
                .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
                .and_then(|el| el.closest("a[href^=\"#\"]").ok().flatten());
            let Some(href) = anchor.and_then(|a| a.get_attribute("href")) else {
                return;
            };
            ev.prevent_default();
            listener(LocationEvent::LinkClicked(
                href.trim_start_matches('#').to_string(),
            ));
        });
        if let Some(document) = window.document() {
            let _ = document
                .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref());
        }
        on_click.forget();
    }
}

// =========================================================
// 测试实现 (Mock)
// =========================================================

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::cell::RefCell;

    /// 内存地址栏；默认同步触发事件，`deferred` 模式下排队直到 `flush()`
    #[derive(Default)]
    pub struct MockLocation {
        fragment: RefCell<String>,
        listeners: RefCell<Vec<LocationListener>>,
        deferred: bool,
        pending: RefCell<Vec<LocationEvent>>,
        /// 每次 `set_fragment` 的参数
        pub history: RefCell<Vec<String>>,
    }

    impl MockLocation {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn at(fragment: &str) -> Self {
            let location = Self::default();
            *location.fragment.borrow_mut() = fragment.to_string();
            location
        }

        /// 像浏览器一样异步投递 hashchange
        pub fn deferred(fragment: &str) -> Self {
            let location = Self {
                deferred: true,
                ..Self::default()
            };
            *location.fragment.borrow_mut() = fragment.to_string();
            location
        }

        /// 投递所有排队的事件，包括投递过程中新产生的
        pub fn flush(&self) {
            loop {
                let pending: Vec<LocationEvent> = self.pending.borrow_mut().drain(..).collect();
                if pending.is_empty() {
                    return;
                }
                for event in pending {
                    self.emit(event);
                }
            }
        }

        fn emit(&self, event: LocationEvent) {
            let listeners = self.listeners.borrow().clone();
            for listener in listeners {
                listener(event.clone());
            }
        }

        /// 模拟用户点击页内链接
        pub fn click_link(&self, href: &str) {
            self.emit(LocationEvent::LinkClicked(
                href.trim_start_matches('#').to_string(),
            ));
        }

        /// 模拟浏览器后退/前进直接改写地址
        pub fn browse_to(&self, fragment: &str) {
            *self.fragment.borrow_mut() = fragment.to_string();
            self.emit(LocationEvent::FragmentChanged);
        }
    }

    impl Location for MockLocation {
        fn fragment(&self) -> String {
            self.fragment.borrow().clone()
        }

        fn set_fragment(&self, path: &str) {
            self.history.borrow_mut().push(path.to_string());
            let changed = *self.fragment.borrow() != path;
            if changed {
                *self.fragment.borrow_mut() = path.to_string();
                if self.deferred {
                    self.pending.borrow_mut().push(LocationEvent::FragmentChanged);
                } else {
                    self.emit(LocationEvent::FragmentChanged);
                }
            }
        }

        fn subscribe(&self, listener: LocationListener) {
            self.listeners.borrow_mut().push(listener);
        }
    }
}
