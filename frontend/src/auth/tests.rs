use super::*;
use crate::error::SESSION_EXPIRED_MESSAGE;
use crate::web::http::MockHttpClient;
use crate::web::storage::MemoryStorage;
use brava_shared::protocol::HttpMethod;
use serde_json::json;

// exp = 4102444800 (2100-01-01)
const VALID_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJleHAiOjQxMDI0NDQ4MDB9.c2ln";
// exp = 1000000000 (2001-09-09)
const EXPIRED_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJleHAiOjEwMDAwMDAwMDB9.c2ln";

// =========================================================
// Shared Mock Components
// =========================================================

#[derive(Default)]
struct RecordingListener {
    events: RefCell<Vec<String>>,
}

impl SessionListener for RecordingListener {
    fn on_auth_success(&self, user: &UserProfile) {
        self.events
            .borrow_mut()
            .push(format!("auth:{}", user.role.clone().unwrap_or_default()));
    }

    fn on_logout(&self) {
        self.events.borrow_mut().push("logout".to_string());
    }
}

struct TestContext {
    http: Rc<MockHttpClient>,
    storage: Rc<MemoryStorage>,
    api: Rc<ApiClient>,
    store: Rc<SessionStore>,
    listener: Rc<RecordingListener>,
}

impl TestContext {
    fn new() -> Self {
        Self::with_storage(MemoryStorage::new())
    }

    fn with_storage(storage: MemoryStorage) -> Self {
        let config = AppConfig::default();
        let http = Rc::new(MockHttpClient::new());
        let storage = Rc::new(storage);
        let api = Rc::new(ApiClient::new(&config, http.clone()));
        let store = SessionStore::new(
            &config,
            storage.clone(),
            api.clone(),
            PermissionTable::default(),
        );
        let listener = Rc::new(RecordingListener::default());
        let weak: Weak<dyn SessionListener> = Rc::downgrade(&listener) as Weak<dyn SessionListener>;
        store.set_listener(weak);
        Self {
            http,
            storage,
            api,
            store,
            listener,
        }
    }

    fn events(&self) -> Vec<String> {
        self.listener.events.borrow().clone()
    }

    fn mock_login_ok(&self, role: &str) {
        self.http.mock_response(
            "/api/v1/auth/login/",
            200,
            json!({
                "access": VALID_TOKEN,
                "refresh": "refresh-1",
                "user": {"role": role, "email": "ana@brava.com"}
            }),
        );
    }
}

fn stored_session(role: &str) -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage.set("brava_access_token", VALID_TOKEN);
    storage.set("brava_refresh_token", "refresh-1");
    storage.set("brava_user", &format!(r#"{{"role":"{}"}}"#, role));
    storage
}

fn credentials() -> Credentials {
    Credentials {
        email: "ana@brava.com".into(),
        password: "secret1".into(),
    }
}

// =========================================================
// restore / is_expired
// =========================================================

#[test]
fn test_restore_empty_storage() {
    let ctx = TestContext::new();
    assert!(ctx.store.restore().is_empty());
    assert!(ctx.store.current_user().is_none());
}

#[test]
fn test_restore_loads_all_three_entries() {
    let ctx = TestContext::with_storage(stored_session("manager"));

    let session = ctx.store.restore();

    assert_eq!(session.access_token.as_deref(), Some(VALID_TOKEN));
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(session.user, Some(UserProfile::with_role("manager")));
    // 构造时已加载缓存的用户
    assert_eq!(ctx.store.current_user(), Some(UserProfile::with_role("manager")));
}

#[test]
fn test_restore_treats_corrupt_user_as_absent() {
    let storage = stored_session("manager");
    storage.set("brava_user", "{not json");
    let ctx = TestContext::with_storage(storage);

    assert!(ctx.store.restore().is_empty());
    assert!(ctx.store.current_user().is_none());
}

#[test]
fn test_is_expired_hint() {
    let ctx = TestContext::new();
    assert!(ctx.store.is_expired(None));
    assert!(ctx.store.is_expired(Some("garbage")));
    assert!(ctx.store.is_expired(Some(EXPIRED_TOKEN)));
    assert!(!ctx.store.is_expired(Some(VALID_TOKEN)));
}

// =========================================================
// login
// =========================================================

#[tokio::test]
async fn test_login_persists_session_and_notifies() {
    let ctx = TestContext::new();
    ctx.mock_login_ok("seller");

    let user = ctx.store.login(&credentials()).await.unwrap();

    assert_eq!(user.role.as_deref(), Some("seller"));
    let snapshot = ctx.storage.snapshot();
    assert_eq!(snapshot["brava_access_token"], VALID_TOKEN);
    assert_eq!(snapshot["brava_refresh_token"], "refresh-1");
    let stored_user: UserProfile = serde_json::from_str(&snapshot["brava_user"]).unwrap();
    assert_eq!(stored_user, user);
    assert_eq!(ctx.api.auth_token().as_deref(), Some(VALID_TOKEN));
    assert_eq!(ctx.store.current_user(), Some(user));
    assert_eq!(ctx.events(), vec!["auth:seller"]);
}

#[tokio::test]
async fn test_login_failure_leaves_storage_untouched() {
    let ctx = TestContext::new();
    ctx.http.mock_response(
        "/api/v1/auth/login/",
        400,
        json!({"message": "Credenciais inválidas"}),
    );

    let failure = ctx.store.login(&credentials()).await.unwrap_err();

    assert_eq!(failure.message, "Credenciais inválidas");
    assert!(ctx.storage.is_empty());
    assert!(ctx.api.auth_token().is_none());
    assert!(ctx.events().is_empty());
}

#[tokio::test]
async fn test_login_with_malformed_response_writes_nothing() {
    let ctx = TestContext::new();
    ctx.http
        .mock_response("/api/v1/auth/login/", 200, json!({"access": "only"}));

    let failure = ctx.store.login(&credentials()).await.unwrap_err();

    assert!(!failure.message.is_empty());
    assert!(ctx.storage.is_empty());
}

#[tokio::test]
async fn test_login_rolls_back_when_storage_rejects_writes() {
    let storage = stored_session("operator");
    storage.set_read_only(true);
    let ctx = TestContext::with_storage(storage);
    let before = ctx.storage.snapshot();
    ctx.mock_login_ok("admin");

    let failure = ctx.store.login(&credentials()).await.unwrap_err();

    assert_eq!(failure.message, STORAGE_UNAVAILABLE);
    assert_eq!(ctx.storage.snapshot(), before);
    assert!(ctx.api.auth_token().is_none());
}

// =========================================================
// refresh
// =========================================================

#[tokio::test]
async fn test_refresh_without_token_fails_without_network() {
    let ctx = TestContext::new();

    let failure = ctx.store.refresh().await.unwrap_err();

    assert_eq!(failure.message, NO_REFRESH_TOKEN);
    assert!(ctx.http.requests.borrow().is_empty());
}

#[tokio::test]
async fn test_refresh_success_replaces_access_token() {
    let ctx = TestContext::with_storage(stored_session("seller"));
    ctx.http
        .mock_response("/api/v1/auth/refresh/", 200, json!({"access": "new-access"}));

    ctx.store.refresh().await.unwrap();

    assert_eq!(ctx.store.access_token().as_deref(), Some("new-access"));
    assert_eq!(ctx.api.auth_token().as_deref(), Some("new-access"));
    assert_eq!(ctx.store.refresh_token().as_deref(), Some("refresh-1"));
    assert_eq!(ctx.http.request_count(HttpMethod::Post, "/api/v1/auth/refresh/"), 1);
}

#[tokio::test]
async fn test_refresh_failure_logs_out_once() {
    let ctx = TestContext::with_storage(stored_session("seller"));
    ctx.http
        .mock_response("/api/v1/auth/refresh/", 400, json!({"message": "blacklisted"}));
    ctx.http.mock_raw("/api/v1/auth/logout/", 205, None, "");

    let failure = ctx.store.refresh().await.unwrap_err();

    assert_eq!(failure.message, "blacklisted");
    assert!(ctx.storage.is_empty());
    assert_eq!(ctx.events(), vec!["logout"]);
    assert_eq!(ctx.http.request_count(HttpMethod::Post, "/api/v1/auth/refresh/"), 1);
    assert_eq!(ctx.http.request_count(HttpMethod::Post, "/api/v1/auth/logout/"), 1);
}

#[tokio::test]
async fn test_refresh_unauthorized_forces_single_logout() {
    let ctx = TestContext::with_storage(stored_session("seller"));
    ctx.http.mock_response("/api/v1/auth/refresh/", 401, json!({}));

    let failure = ctx.store.refresh().await.unwrap_err();

    assert_eq!(failure.message, SESSION_EXPIRED_MESSAGE);
    assert!(ctx.storage.is_empty());
    assert_eq!(ctx.events(), vec!["logout"]);
    assert_eq!(ctx.http.request_count(HttpMethod::Post, "/api/v1/auth/logout/"), 0);
}

// =========================================================
// logout
// =========================================================

#[tokio::test]
async fn test_logout_notifies_backend_and_clears() {
    let ctx = TestContext::with_storage(stored_session("seller"));
    ctx.api.set_auth_token(Some(VALID_TOKEN));
    ctx.http.mock_raw("/api/v1/auth/logout/", 205, None, "");

    ctx.store.logout().await;

    let req = ctx.http.last_request().unwrap();
    assert_eq!(req.url, "/api/v1/auth/logout/");
    assert_eq!(req.header("Authorization"), Some(format!("Bearer {}", VALID_TOKEN).as_str()));
    assert!(ctx.storage.is_empty());
    assert!(ctx.store.current_user().is_none());
    assert!(ctx.api.auth_token().is_none());
    assert_eq!(ctx.events(), vec!["logout"]);
}

#[tokio::test]
async fn test_logout_clears_even_when_backend_unreachable() {
    let ctx = TestContext::with_storage(stored_session("seller"));
    ctx.http.mock_network_error("/api/v1/auth/logout/");

    ctx.store.logout().await;

    assert!(ctx.storage.is_empty());
    assert_eq!(ctx.events(), vec!["logout"]);
}

#[tokio::test]
async fn test_logout_without_refresh_token_skips_backend() {
    let ctx = TestContext::new();

    ctx.store.logout().await;

    assert!(ctx.http.requests.borrow().is_empty());
    assert_eq!(ctx.events(), vec!["logout"]);
}

// =========================================================
// 401 强制登出
// =========================================================

#[tokio::test]
async fn test_any_unauthorized_response_forces_logout() {
    let ctx = TestContext::with_storage(stored_session("manager"));
    ctx.api.set_auth_token(Some(VALID_TOKEN));
    ctx.http.mock_response("/api/v1/customers/3/", 401, json!({}));

    let err = ctx.api.get_customer("3").await.unwrap_err();

    assert_eq!(err.message(), SESSION_EXPIRED_MESSAGE);
    assert!(ctx.storage.is_empty());
    assert!(ctx.api.auth_token().is_none());
    assert_eq!(ctx.events(), vec!["logout"]);
    // 强制登出不通知后端
    assert_eq!(ctx.http.requests.borrow().len(), 1);
}

// =========================================================
// 权限
// =========================================================

#[test]
fn test_has_permission_by_role() {
    let manage_orders: Permission = "manage_orders".parse().unwrap();

    let manager = TestContext::with_storage(stored_session("manager"));
    assert!(manager.store.has_permission(manage_orders));

    let admin = TestContext::with_storage(stored_session("admin"));
    assert!(admin.store.has_permission(manage_orders));
    assert!(admin.store.has_permission(Permission::ViewReports));

    let operator = TestContext::with_storage(stored_session("operator"));
    assert!(!operator.store.has_permission(manage_orders));

    let nobody = TestContext::new();
    assert!(!nobody.store.has_permission(manage_orders));
}

#[test]
fn test_set_current_user_survives_storage_failure() {
    let storage = MemoryStorage::new();
    storage.set_read_only(true);
    let ctx = TestContext::with_storage(storage);

    ctx.store.set_current_user(UserProfile::with_role("seller"));

    assert_eq!(ctx.store.current_user(), Some(UserProfile::with_role("seller")));
    assert!(ctx.storage.is_empty());
}

#[test]
fn test_unknown_role_has_no_permissions() {
    let ctx = TestContext::with_storage(stored_session("intern"));
    assert!(!ctx.store.has_permission(Permission::ViewDashboard));
}
