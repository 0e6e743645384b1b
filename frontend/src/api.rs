//! REST API 客户端
//!
//! 负责拼接版本化路径、附加 Bearer 令牌、统一处理响应与错误。
//! 401 会触发注入的强制登出回调。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use brava_shared::protocol::{
    ApiRequest, CurrentUserRequest, ErrorBody, HttpMethod, LoginResponse, LogoutRequest,
    RefreshRequest, RefreshResponse,
};
use brava_shared::{
    CONTENT_TYPE_JSON, Credentials, HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE,
    HEADER_REQUESTED_WITH, UserProfile,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::web::http::{FormData, HttpBody, HttpClient, HttpRequest, HttpResponse};


/// 请求体：JSON 序列化，或由浏览器编码的 multipart 表单
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(FormData),
}

impl From<Value> for RequestBody {
    fn from(v: Value) -> Self {
        RequestBody::Json(v)
    }
}

impl From<FormData> for RequestBody {
    fn from(f: FormData) -> Self {
        RequestBody::Form(f)
    }
}

/// 调用方的覆盖选项，覆盖的请求头优先于默认值
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// 成功的响应
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// JSON 响应，已解析
    Json(Value),
    /// 非 JSON 响应，由调用方自行读取
    Raw(HttpResponse),
}

impl ApiResponse {
    /// 取出 JSON；空的非 JSON 响应（如 204）视为 `null`
    pub fn json(self) -> ApiResult<Value> {
        match self {
            ApiResponse::Json(v) => Ok(v),
            ApiResponse::Raw(r) if r.body.trim().is_empty() => Ok(Value::Null),
            ApiResponse::Raw(r) => Err(ApiError::decode(format!(
                "expected a JSON response, got {}",
                r.content_type.as_deref().unwrap_or("no content type")
            ))),
        }
    }

    pub fn parse<T: DeserializeOwned>(self) -> ApiResult<T> {
        let value = self.json()?;
        serde_json::from_value(value).map_err(|e| ApiError::decode(e.to_string()))
    }
}

/// 大小写不敏感地写入请求头
fn set_header(headers: &mut HashMap<String, String>, key: &str, value: &str) {
    headers.retain(|k, _| !k.eq_ignore_ascii_case(key));
    headers.insert(key.to_string(), value.to_string());
}

/// 把扁平的键值参数拼到路径后，参数为空时不加 `?`
pub fn with_query(path: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    match serde_urlencoded::to_string(params) {
        Ok(query) if !query.is_empty() => format!("{}?{}", path, query),
        _ => path.to_string(),
    }
}

pub struct ApiClient {
    base_url: String,
    requested_with: String,
    http: Rc<dyn HttpClient>,
    token: RefCell<Option<String>>,
    on_unauthorized: RefCell<Option<Rc<dyn Fn()>>>,
}

impl ApiClient {
    pub fn new(config: &AppConfig, http: Rc<dyn HttpClient>) -> Self {
        Self {
            base_url: config.api_base.trim_end_matches('/').to_string(),
            requested_with: config.requested_with.clone(),
            http,
            token: RefCell::new(None),
            on_unauthorized: RefCell::new(None),
        }
    }

    /// 设置或清除当前 Bearer 令牌
    pub fn set_auth_token(&self, token: Option<&str>) {
        *self.token.borrow_mut() = token.map(str::to_string);
    }

    pub fn auth_token(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    /// 收到 401 时调用
    pub fn set_unauthorized_hook(&self, hook: impl Fn() + 'static) {
        *self.on_unauthorized.borrow_mut() = Some(Rc::new(hook));
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn headers(&self, options: &RequestOptions) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        set_header(&mut headers, HEADER_CONTENT_TYPE, CONTENT_TYPE_JSON);
        set_header(&mut headers, HEADER_REQUESTED_WITH, &self.requested_with);
        if let Some(token) = self.token.borrow().as_deref() {
            set_header(&mut headers, HEADER_AUTHORIZATION, &format!("Bearer {}", token));
        }
        for (k, v) in &options.headers {
            set_header(&mut headers, k, v);
        }
        headers
    }

    // =========================================================
    // 核心请求
    // =========================================================

    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> ApiResult<ApiResponse> {
        let mut req = HttpRequest::new(&self.url(path), method);
        req.headers = self.headers(&options);

        if method.carries_body() {
            match body {
                Some(RequestBody::Form(form)) => {
                    req.headers
                        .retain(|k, _| !k.eq_ignore_ascii_case(HEADER_CONTENT_TYPE));
                    req.body = Some(HttpBody::Form(form));
                }
                Some(RequestBody::Json(value)) => {
                    req.body = Some(HttpBody::Text(value.to_string()));
                }
                None => {}
            }
        }

        let response = match self.http.send(req).await {
            Ok(r) => r,
            Err(e) => {
                log::error!("API request error: {} {}: {}", method.as_str(), path, e);
                return Err(ApiError::network(e.to_string())
                    .in_op(format!("{} {}", method.as_str(), path)));
            }
        };

        self.handle_response(response)
            .map_err(|e| e.in_op(format!("{} {}", method.as_str(), path)))
    }

    fn handle_response(&self, response: HttpResponse) -> ApiResult<ApiResponse> {
        if response.status == 401 {
            log::info!("[Api] 401 received, forcing logout");
            let hook = self.on_unauthorized.borrow().clone();
            if let Some(hook) = hook {
                hook();
            }
            return Err(ApiError::auth_expired());
        }

        if !response.ok() {
            let message = serde_json::from_str::<ErrorBody>(&response.body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            return Err(ApiError::http(response.status, message));
        }

        if response.is_json() {
            let value = serde_json::from_str(&response.body)
                .map_err(|e| ApiError::decode(format!("invalid JSON body: {}", e)))?;
            return Ok(ApiResponse::Json(value));
        }

        Ok(ApiResponse::Raw(response))
    }

    // --- 便捷方法 ---

    pub async fn get(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(HttpMethod::Get, path, None, RequestOptions::default())
            .await
    }

    pub async fn post(&self, path: &str, body: impl Into<RequestBody>) -> ApiResult<ApiResponse> {
        self.request(HttpMethod::Post, path, Some(body.into()), RequestOptions::default())
            .await
    }

    pub async fn put(&self, path: &str, body: impl Into<RequestBody>) -> ApiResult<ApiResponse> {
        self.request(HttpMethod::Put, path, Some(body.into()), RequestOptions::default())
            .await
    }

    pub async fn patch(&self, path: &str, body: impl Into<RequestBody>) -> ApiResult<ApiResponse> {
        self.request(HttpMethod::Patch, path, Some(body.into()), RequestOptions::default())
            .await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(HttpMethod::Delete, path, None, RequestOptions::default())
            .await
    }

    /// 发送类型化请求
    pub async fn send<R: ApiRequest>(&self, req: &R) -> ApiResult<R::Response> {
        let body = serde_json::to_value(req).map_err(|e| ApiError::decode(e.to_string()))?;
        self.request(R::METHOD, R::PATH, Some(body.into()), RequestOptions::default())
            .await?
            .parse()
    }

    // =========================================================
    // 认证
    // =========================================================

    pub async fn login(&self, credentials: &Credentials) -> ApiResult<LoginResponse> {
        self.send(credentials).await
    }

    pub async fn refresh_token(&self, refresh: &str) -> ApiResult<RefreshResponse> {
        self.send(&RefreshRequest {
            refresh: refresh.to_string(),
        })
        .await
    }

    pub async fn logout(&self, refresh: &str) -> ApiResult<()> {
        self.send(&LogoutRequest {
            refresh: refresh.to_string(),
        })
        .await
        .map(|_| ())
    }

    pub async fn current_user(&self) -> ApiResult<UserProfile> {
        self.send(&CurrentUserRequest).await
    }

    // =========================================================
    // 资源
    // =========================================================

    async fn get_json(&self, path: &str) -> ApiResult<Value> {
        self.get(path).await?.json()
    }

    pub async fn get_products(&self, params: &[(&str, &str)]) -> ApiResult<Value> {
        self.get_json(&with_query("/products/", params)).await
    }

    pub async fn get_product(&self, id: &str) -> ApiResult<Value> {
        self.get_json(&format!("/products/{}/", id)).await
    }

    pub async fn create_product(&self, data: impl Into<RequestBody>) -> ApiResult<Value> {
        self.post("/products/", data).await?.json()
    }

    pub async fn update_product(&self, id: &str, data: impl Into<RequestBody>) -> ApiResult<Value> {
        self.put(&format!("/products/{}/", id), data).await?.json()
    }

    pub async fn delete_product(&self, id: &str) -> ApiResult<Value> {
        self.delete(&format!("/products/{}/", id)).await?.json()
    }

    pub async fn get_orders(&self, params: &[(&str, &str)]) -> ApiResult<Value> {
        self.get_json(&with_query("/orders/", params)).await
    }

    pub async fn get_order(&self, id: &str) -> ApiResult<Value> {
        self.get_json(&format!("/orders/{}/", id)).await
    }

    pub async fn get_customers(&self, params: &[(&str, &str)]) -> ApiResult<Value> {
        self.get_json(&with_query("/customers/", params)).await
    }

    pub async fn get_customer(&self, id: &str) -> ApiResult<Value> {
        self.get_json(&format!("/customers/{}/", id)).await
    }

    pub async fn get_dashboard_stats(&self) -> ApiResult<Value> {
        self.get_json("/dashboard/stats/").await
    }
}
