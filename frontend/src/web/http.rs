//! HTTP 传输层
//!
//! `HttpClient` 抽象出一次请求/响应往返，核心逻辑只依赖该 trait。
//! 浏览器中使用 `FetchClient`（`web_sys::fetch`），测试中使用 `MockHttpClient`。

use std::collections::HashMap;

use async_trait::async_trait;
use brava_shared::protocol::HttpMethod;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response};

#[cfg(test)]
use std::cell::RefCell;

/// HTTP 错误类型
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// 请求构建失败
    RequestBuildFailed(String),
    /// 网络请求失败
    NetworkError(String),
    /// 响应解析失败
    ResponseParseFailed(String),
}

impl core::fmt::Display for HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HttpError::RequestBuildFailed(msg) => write!(f, "request build failed: {}", msg),
            HttpError::NetworkError(msg) => write!(f, "network error: {}", msg),
            HttpError::ResponseParseFailed(msg) => write!(f, "response parse failed: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// multipart 表单负载（字段名 -> 文本值）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

/// 请求体
#[derive(Debug, Clone, PartialEq)]
pub enum HttpBody {
    Text(String),
    /// Content-Type 由浏览器设置（含 boundary）
    Form(FormData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<HttpBody>,
}

impl HttpRequest {
    pub fn new(url: &str, method: HttpMethod) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// 大小写不敏感地查找请求头
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 已读取完毕的响应
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    /// 检查响应是否成功 (2xx)
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains(brava_shared::CONTENT_TYPE_JSON))
    }
}

#[async_trait(?Send)]
pub trait HttpClient {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, HttpError>;
}

// =========================================================
// 实现层: fetch 客户端
// =========================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchClient;

impl FetchClient {
    fn build_request(req: &HttpRequest) -> Result<Request, HttpError> {
        let headers = Headers::new()
            .map_err(|e| HttpError::RequestBuildFailed(format!("create Headers: {:?}", e)))?;

        for (key, value) in &req.headers {
            headers
                .set(key, value)
                .map_err(|e| HttpError::RequestBuildFailed(format!("set header {}: {:?}", key, e)))?;
        }

        let opts = RequestInit::new();
        opts.set_method(req.method.as_str());
        opts.set_headers(&headers.into());

        match &req.body {
            Some(HttpBody::Text(body)) => opts.set_body(&JsValue::from_str(body)),
            Some(HttpBody::Form(form)) => {
                let data = web_sys::FormData::new()
                    .map_err(|e| HttpError::RequestBuildFailed(format!("create FormData: {:?}", e)))?;
                for (name, value) in form.fields() {
                    data.append_with_str(name, value).map_err(|e| {
                        HttpError::RequestBuildFailed(format!("append {}: {:?}", name, e))
                    })?;
                }
                opts.set_body(&data.into());
            }
            None => {}
        }

        Request::new_with_str_and_init(&req.url, &opts)
            .map_err(|e| HttpError::RequestBuildFailed(format!("{:?}", e)))
    }
}

#[async_trait(?Send)]
impl HttpClient for FetchClient {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        let request = Self::build_request(&req)?;

        let window = web_sys::window()
            .ok_or_else(|| HttpError::NetworkError("window is not available".to_string()))?;

        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| HttpError::NetworkError(format!("{:?}", e)))?;

        let response: Response = resp_value
            .dyn_into()
            .map_err(|e| HttpError::ResponseParseFailed(format!("not a Response: {:?}", e)))?;

        let content_type = response.headers().get("content-type").ok().flatten();

        let promise = response
            .text()
            .map_err(|e| HttpError::ResponseParseFailed(format!("{:?}", e)))?;
        let body = JsFuture::from(promise)
            .await
            .map_err(|e| HttpError::ResponseParseFailed(format!("{:?}", e)))?
            .as_string()
            .unwrap_or_default();

        Ok(HttpResponse {
            status: response.status(),
            content_type,
            body,
        })
    }
}

// =========================================================
// 测试工具: MockHttpClient
// =========================================================

#[cfg(test)]
pub struct MockHttpClient {
    // "METHOD URL" 或 URL -> 响应
    responses: RefCell<HashMap<String, Result<HttpResponse, HttpError>>>,
    // 记录发出的请求
    pub requests: RefCell<Vec<HttpRequest>>,
}

#[cfg(test)]
impl MockHttpClient {
    pub fn new() -> Self {
        Self {
            responses: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn insert(&self, key: String, response: Result<HttpResponse, HttpError>) {
        self.responses.borrow_mut().insert(key, response);
    }

    /// 对该 URL 的任意方法返回 JSON 响应
    pub fn mock_response(&self, url: &str, status: u16, body: serde_json::Value) {
        self.mock_raw(url, status, Some("application/json"), &body.to_string());
    }

    /// 仅对指定方法返回 JSON 响应（优先于 URL 级别的设置）
    pub fn mock_method(&self, method: HttpMethod, url: &str, status: u16, body: serde_json::Value) {
        self.insert(
            format!("{} {}", method.as_str(), url),
            Ok(HttpResponse {
                status,
                content_type: Some("application/json".to_string()),
                body: body.to_string(),
            }),
        );
    }

    pub fn mock_raw(&self, url: &str, status: u16, content_type: Option<&str>, body: &str) {
        self.insert(
            url.to_string(),
            Ok(HttpResponse {
                status,
                content_type: content_type.map(str::to_string),
                body: body.to_string(),
            }),
        );
    }

    pub fn mock_network_error(&self, url: &str) {
        self.insert(
            url.to_string(),
            Err(HttpError::NetworkError("connection refused".to_string())),
        );
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.borrow().last().cloned()
    }

    pub fn request_count(&self, method: HttpMethod, url: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }
}

#[cfg(test)]
#[async_trait(?Send)]
impl HttpClient for MockHttpClient {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        let keyed = format!("{} {}", req.method.as_str(), req.url);
        let url = req.url.clone();
        self.requests.borrow_mut().push(req);

        let responses = self.responses.borrow();
        match responses.get(&keyed).or_else(|| responses.get(&url)) {
            Some(response) => response.clone(),
            None => Ok(HttpResponse {
                status: 404,
                content_type: Some("text/plain".to_string()),
                body: "Not Found".to_string(),
            }),
        }
    }
}
