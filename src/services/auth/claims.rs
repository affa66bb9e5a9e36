/*
 * Responsibility
 * - token に埋め込む Claims の定義 (wire 名は user_id/email/roles/exp/iat/nbf/iss/sub)
 * - 発行用 / refresh 用の Claims 組み立て
 * - token 文字列の構造チェック (header.payload.signature)
 *
 * Notes
 * - Claims は decode 後に変更しない。refresh は renewed() で新しい値を作る
 */
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::services::auth::error::TokenError;

/// The authenticated principal a token is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub email: String,
    pub roles: Vec<String>,
}

/// Claim set carried in the token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "user_id")]
    pub subject_id: i64,
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub roles: Vec<String>,
    #[serde(rename = "exp")]
    pub expires_at: i64,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "nbf")]
    pub not_before: i64,
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "sub")]
    pub subject_label: String,
}

// "roles": null と欠落はどちらも空リスト
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Claims {
    pub fn for_principal(
        principal: &Principal,
        now: DateTime<Utc>,
        ttl: ChronoDuration,
        issuer: &str,
    ) -> Self {
        let now_ts = now.timestamp();
        Self {
            subject_id: principal.id,
            email: principal.email.clone(),
            roles: principal.roles.clone(),
            expires_at: now_ts + ttl.num_seconds(),
            issued_at: now_ts,
            not_before: now_ts,
            issuer: issuer.to_string(),
            subject_label: subject_label(principal.id),
        }
    }

    /// Same subject, fresh validity window.
    pub fn renewed(&self, now: DateTime<Utc>, ttl: ChronoDuration, issuer: &str) -> Self {
        let now_ts = now.timestamp();
        Self {
            subject_id: self.subject_id,
            email: self.email.clone(),
            roles: self.roles.clone(),
            expires_at: now_ts + ttl.num_seconds(),
            issued_at: now_ts,
            not_before: now_ts,
            issuer: issuer.to_string(),
            subject_label: self.subject_label.clone(),
        }
    }

    /// `not_before <= now < expires_at`
    pub fn check_window(&self, now: i64) -> Result<(), TokenError> {
        if now < self.not_before {
            return Err(TokenError::NotYetValid);
        }
        if now >= self.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(())
    }

    /// Seconds elapsed since issuance.
    pub fn age_seconds(&self, now: i64) -> i64 {
        now - self.issued_at
    }
}

pub fn subject_label(id: i64) -> String {
    format!("user_{id}")
}

#[derive(Debug, Deserialize)]
struct WireHeader {
    alg: String,
}

/// Result of the structural parse. Only the algorithm is kept; the signature
/// itself is checked by jsonwebtoken afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenParts {
    pub alg: String,
}

/// Split `<header>.<payload>.<signature>` and make sure every segment is
/// well-formed base64url, without checking the signature.
pub fn split_token(token: &str) -> Result<TokenParts, TokenError> {
    let mut segments = token.split('.');
    let (header, payload, signature) = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(h), Some(p), Some(s), None) => (h, p, s),
        _ => return Err(TokenError::Malformed),
    };

    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return Err(TokenError::Malformed);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::Malformed)?;
    let header: WireHeader =
        serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Malformed)?;

    URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| TokenError::Malformed)?;
    URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| TokenError::Malformed)?;

    Ok(TokenParts { alg: header.alg })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn principal() -> Principal {
        Principal {
            id: 42,
            email: "alice@example.com".to_string(),
            roles: vec!["user".to_string(), "admin".to_string()],
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn for_principal_sets_window_and_labels() {
        let claims = Claims::for_principal(&principal(), t0(), ChronoDuration::hours(24), "gate");

        assert_eq!(claims.subject_id, 42);
        assert_eq!(claims.subject_label, "user_42");
        assert_eq!(claims.issuer, "gate");
        assert_eq!(claims.issued_at, t0().timestamp());
        assert_eq!(claims.not_before, claims.issued_at);
        assert_eq!(claims.expires_at - claims.issued_at, 24 * 3600);
    }

    #[test]
    fn claims_use_wire_field_names() {
        let claims = Claims::for_principal(&principal(), t0(), ChronoDuration::hours(1), "gate");
        let value = serde_json::to_value(&claims).unwrap();

        for key in ["user_id", "email", "roles", "exp", "iat", "nbf", "iss", "sub"] {
            assert!(value.get(key).is_some(), "missing wire field {key}");
        }
        assert!(value.get("subject_id").is_none());
    }

    #[test]
    fn null_or_missing_roles_decode_as_empty() {
        let mut value =
            serde_json::to_value(Claims::for_principal(&principal(), t0(), ChronoDuration::hours(1), "gate"))
                .unwrap();

        value["roles"] = serde_json::Value::Null;
        let claims: Claims = serde_json::from_value(value.clone()).unwrap();
        assert!(claims.roles.is_empty());

        value.as_object_mut().unwrap().remove("roles");
        let claims: Claims = serde_json::from_value(value).unwrap();
        assert!(claims.roles.is_empty());
    }

    #[test]
    fn renewed_keeps_subject_and_moves_window() {
        let original = Claims::for_principal(&principal(), t0(), ChronoDuration::hours(24), "gate");
        let later = t0() + ChronoDuration::hours(5);
        let renewed = original.renewed(later, ChronoDuration::hours(24), "gate");

        assert_eq!(renewed.subject_id, original.subject_id);
        assert_eq!(renewed.email, original.email);
        assert_eq!(renewed.roles, original.roles);
        assert_eq!(renewed.subject_label, original.subject_label);
        assert_eq!(renewed.issued_at, later.timestamp());
        assert_eq!(renewed.expires_at, (later + ChronoDuration::hours(24)).timestamp());
        // original untouched
        assert_eq!(original.issued_at, t0().timestamp());
    }

    #[test]
    fn check_window_boundaries() {
        let claims = Claims::for_principal(&principal(), t0(), ChronoDuration::hours(1), "gate");
        let nbf = claims.not_before;
        let exp = claims.expires_at;

        assert!(matches!(claims.check_window(nbf - 1), Err(TokenError::NotYetValid)));
        assert!(claims.check_window(nbf).is_ok());
        assert!(claims.check_window(exp - 1).is_ok());
        assert!(matches!(claims.check_window(exp), Err(TokenError::Expired)));
        assert!(matches!(claims.check_window(exp + 60), Err(TokenError::Expired)));
    }

    #[test]
    fn split_token_rejects_bad_structure() {
        for bad in [
            "",
            "abc",
            "a.b",
            "a.b.c.d",
            "..",
            "not-base64!.e30.c2ln",
            // header decodes but is not JSON
            "aGVsbG8.e30.c2ln",
            // header is JSON without alg
            "e30.e30.c2ln",
        ] {
            assert!(
                matches!(split_token(bad), Err(TokenError::Malformed)),
                "expected malformed for {bad:?}"
            );
        }
    }

    #[test]
    fn split_token_reads_algorithm() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS512","typ":"JWT"}"#);
        let token = format!("{header}.e30.c2ln");

        let parts = split_token(&token).unwrap();
        assert_eq!(parts.alg, "HS512");
    }
}
