use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod protocol;
pub mod token;

// =========================================================
// 常量定义 (Constants)
// =========================================================

pub const DEFAULT_API_BASE: &str = "/api/v1";
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_REQUESTED_WITH: &str = "X-Requested-With";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// 权限表中代表"全部权限"的哨兵值
pub const PERMISSION_ALL: &str = "*";

// =========================================================
// 领域模型 (Domain Models)
// =========================================================

/// 登录凭据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// 当前用户资料
///
/// 对前端来说是不透明的负载，只读取 `role` 用于权限判断，
/// 其余字段原样保留（持久化时完整写回）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            extra: serde_json::Map::new(),
        }
    }

    /// 解析后的角色；未知角色返回 `None`
    pub fn parsed_role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Seller,
    Operator,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Manager, Role::Seller, Role::Operator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Seller => "seller",
            Role::Operator => "operator",
        }
    }
}

impl FromStr for Role {
    type Err = PermissionConfigError;

    /// 后端使用大写（`ADMIN`），前端配置使用小写，这里不区分大小写
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| PermissionConfigError::UnknownRole(s.to_string()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewDashboard,
    ViewProducts,
    ManageProducts,
    ViewOrders,
    ManageOrders,
    ViewCustomers,
    ViewReports,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::ViewDashboard,
        Permission::ViewProducts,
        Permission::ManageProducts,
        Permission::ViewOrders,
        Permission::ManageOrders,
        Permission::ViewCustomers,
        Permission::ViewReports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewDashboard => "view_dashboard",
            Permission::ViewProducts => "view_products",
            Permission::ManageProducts => "manage_products",
            Permission::ViewOrders => "view_orders",
            Permission::ManageOrders => "manage_orders",
            Permission::ViewCustomers => "view_customers",
            Permission::ViewReports => "view_reports",
        }
    }
}

impl FromStr for Permission {
    type Err = PermissionConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PermissionConfigError::UnknownPermission(s.to_string()))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =========================================================
// 权限表 (Permission Table)
// =========================================================

/// 权限表配置错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionConfigError {
    UnknownRole(String),
    UnknownPermission(String),
}

impl fmt::Display for PermissionConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionConfigError::UnknownRole(r) => write!(f, "unknown role: {}", r),
            PermissionConfigError::UnknownPermission(p) => write!(f, "unknown permission: {}", p),
        }
    }
}

impl std::error::Error for PermissionConfigError {}

/// 单个角色被授予的权限
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// `*`：所有权限
    All,
    Only(HashSet<Permission>),
}

impl Grant {
    pub fn allows(&self, permission: Permission) -> bool {
        match self {
            Grant::All => true,
            Grant::Only(set) => set.contains(&permission),
        }
    }
}

/// 角色 -> 权限集合 的映射
///
/// 以枚举为键，构造时校验原始配置，未知名称直接报错。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTable {
    grants: HashMap<Role, Grant>,
}

impl PermissionTable {
    /// 从原始字符串配置构建权限表
    pub fn from_raw<R, P, I>(raw: impl IntoIterator<Item = (R, I)>) -> Result<Self, PermissionConfigError>
    where
        R: AsRef<str>,
        P: AsRef<str>,
        I: IntoIterator<Item = P>,
    {
        let mut grants = HashMap::new();
        for (role, permissions) in raw {
            let role: Role = role.as_ref().parse()?;
            let mut set = HashSet::new();
            let mut all = false;
            for p in permissions {
                let p = p.as_ref();
                if p == PERMISSION_ALL {
                    all = true;
                } else {
                    set.insert(p.parse::<Permission>()?);
                }
            }
            let grant = if all { Grant::All } else { Grant::Only(set) };
            grants.insert(role, grant);
        }
        Ok(Self { grants })
    }

    pub fn grant(&self, role: Role) -> Option<&Grant> {
        self.grants.get(&role)
    }

    /// 角色缺失或未知时视为空权限集
    pub fn allows(&self, role: Option<Role>, permission: Permission) -> bool {
        role.and_then(|r| self.grants.get(&r))
            .is_some_and(|g| g.allows(permission))
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        use Permission::*;
        let only = |ps: &[Permission]| Grant::Only(ps.iter().copied().collect());

        let mut grants = HashMap::new();
        grants.insert(Role::Admin, Grant::All);
        grants.insert(
            Role::Manager,
            only(&[ViewDashboard, ManageProducts, ManageOrders, ViewCustomers, ViewReports]),
        );
        grants.insert(
            Role::Seller,
            only(&[ViewDashboard, ViewProducts, ManageOrders, ViewCustomers]),
        );
        grants.insert(Role::Operator, only(&[ViewDashboard, ViewProducts, ViewOrders]));
        Self { grants }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_matches_roles() {
        let table = PermissionTable::default();
        assert!(table.allows(Some(Role::Manager), Permission::ManageOrders));
        assert!(table.allows(Some(Role::Admin), Permission::ViewReports));
        assert!(!table.allows(Some(Role::Operator), Permission::ManageOrders));
        assert!(!table.allows(None, Permission::ViewDashboard));
    }

    #[test]
    fn test_from_raw_rejects_unknown_names() {
        let err = PermissionTable::from_raw([("owner", vec!["*"])]).unwrap_err();
        assert_eq!(err, PermissionConfigError::UnknownRole("owner".into()));

        let err = PermissionTable::from_raw([("seller", vec!["fly_drones"])]).unwrap_err();
        assert_eq!(err, PermissionConfigError::UnknownPermission("fly_drones".into()));
    }

    #[test]
    fn test_from_raw_sentinel_grants_all() {
        let table = PermissionTable::from_raw([("seller", vec!["*", "view_orders"])]).unwrap();
        assert_eq!(table.grant(Role::Seller), Some(&Grant::All));
        assert!(!table.allows(Some(Role::Admin), Permission::ViewOrders));
    }

    #[test]
    fn test_role_parse_ignores_case() {
        assert_eq!("MANAGER".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(UserProfile::with_role("ghost").parsed_role(), None);
    }

    #[test]
    fn test_user_profile_keeps_unknown_fields() {
        let raw = r#"{"role":"seller","email":"a@b.c","id":7}"#;
        let user: UserProfile = serde_json::from_str(raw).unwrap();
        assert_eq!(user.parsed_role(), Some(Role::Seller));
        assert_eq!(user.extra["id"], 7);

        let back: serde_json::Value = serde_json::to_value(&user).unwrap();
        assert_eq!(back["email"], "a@b.c");
    }
}
