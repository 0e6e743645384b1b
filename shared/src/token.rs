//! 访问令牌（JWT）的客户端解析
//!
//! 只解码 payload 读取 `exp`，不做任何签名校验。
//! 结果仅用于避免发送注定失败的请求，真正的鉴权由服务端负责。

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::Deserialize;

/// 令牌解码失败的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    /// 缺少第二个 `.` 分隔段
    MissingPayload,
    /// payload 不是合法的 base64url
    Base64(String),
    /// payload 不是包含数字 `exp` 的 JSON
    Json(String),
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeFailure::MissingPayload => write!(f, "token has no payload segment"),
            DecodeFailure::Base64(e) => write!(f, "token payload is not base64url: {}", e),
            DecodeFailure::Json(e) => write!(f, "token payload is not valid JSON: {}", e),
        }
    }
}

impl std::error::Error for DecodeFailure {}

/// 客户端关心的 JWT 声明
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenClaims {
    /// 过期时间，Unix 秒
    pub exp: f64,
}

impl TokenClaims {
    pub fn decode(token: &str) -> Result<Self, DecodeFailure> {
        let payload = token
            .split('.')
            .nth(1)
            .filter(|s| !s.is_empty())
            .ok_or(DecodeFailure::MissingPayload)?;
        let payload = payload.trim_end_matches('=');

        // 兼容用标准字母表编码的 payload
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .or_else(|_| STANDARD_NO_PAD.decode(payload))
            .map_err(|e| DecodeFailure::Base64(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| DecodeFailure::Json(e.to_string()))
    }

    pub fn is_expired_at(&self, now_secs: f64) -> bool {
        self.exp < now_secs
    }
}

/// 以给定时间判断令牌是否过期
///
/// 令牌缺失、格式错误或无法解码时一律视为过期。
pub fn is_expired_at(token: Option<&str>, now_secs: f64) -> bool {
    match token.map(TokenClaims::decode) {
        Some(Ok(claims)) => claims.is_expired_at(now_secs),
        _ => true,
    }
}

/// 以当前时间判断令牌是否过期
pub fn is_expired(token: Option<&str>) -> bool {
    is_expired_at(token, now_secs())
}

pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.c2ln", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn test_absent_token_is_expired() {
        assert!(is_expired_at(None, 0.0));
    }

    #[test]
    fn test_token_without_payload_is_expired() {
        assert!(is_expired_at(Some("opaque"), 0.0));
        assert!(is_expired_at(Some("header."), 0.0));
        assert_eq!(
            TokenClaims::decode("opaque").unwrap_err(),
            DecodeFailure::MissingPayload
        );
    }

    #[test]
    fn test_undecodable_payload_is_expired() {
        assert!(is_expired_at(Some("a.!!!.c"), 0.0));
        let not_json = token_with_payload("not json");
        assert!(matches!(
            TokenClaims::decode(&not_json),
            Err(DecodeFailure::Json(_))
        ));
        assert!(is_expired_at(Some(&not_json), 0.0));
    }

    #[test]
    fn test_missing_exp_is_expired() {
        let token = token_with_payload(r#"{"sub":"1"}"#);
        assert!(is_expired_at(Some(&token), 0.0));
    }

    #[test]
    fn test_exp_compared_against_now() {
        let token = token_with_payload(r#"{"exp":1700000000,"user_id":3}"#);
        assert!(!is_expired_at(Some(&token), 1_699_999_999.5));
        assert!(is_expired_at(Some(&token), 1_700_000_000.5));
    }

    #[test]
    fn test_padded_and_standard_alphabet_payloads_decode() {
        let padded = format!(
            "h.{}.s",
            base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":10}"#)
        );
        assert_eq!(TokenClaims::decode(&padded).unwrap().exp, 10.0);
    }

    #[test]
    fn test_far_future_token_is_valid_now() {
        let token = token_with_payload(r#"{"exp":4102444800}"#);
        assert!(!is_expired(Some(&token)));
    }
}
