/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が token を検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - 1 リクエスト専用。リクエストをまたいで共有・キャッシュしない
 * - extensions は型で引くので、キーの衝突は起きない
 * - 「未認証」(context が無い) と「認証済みで role が空」は別物として扱う
 */
use std::collections::BTreeSet;

use serde::Serialize;

use crate::services::auth::Claims;

/// Role names with set semantics (sorted, no duplicates).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn intersects(&self, other: &RoleSet) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `subject_id` は token の `user_id`
/// - `email` は情報用。認可の判断には使わない
/// - `roles` は coarse-grained な権限情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityContext {
    subject_id: i64,
    email: String,
    roles: RoleSet,
}

impl IdentityContext {
    pub fn new(subject_id: i64, email: impl Into<String>, roles: RoleSet) -> Self {
        Self {
            subject_id,
            email: email.into(),
            roles,
        }
    }

    pub fn from_claims(claims: &Claims) -> Self {
        Self::new(
            claims.subject_id,
            claims.email.clone(),
            claims.roles.iter().cloned().collect(),
        )
    }

    pub fn subject_id(&self) -> i64 {
        self.subject_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_any_role(&self, accepted: &RoleSet) -> bool {
        self.roles.intersects(accepted)
    }
}
