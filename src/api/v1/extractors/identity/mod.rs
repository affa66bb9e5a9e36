/*!
 * Identity context extractor
 *
 * Responsibility:
 * - 認証済みリクエストのコンテキスト（IdentityContext）を handler に提供する
 * - HTTP / axum 依存は core に閉じ込め、型定義は types に分離する
 *
 * Public API:
 * - IdentityContext / RoleSet
 * - Identity
 */

mod core;
mod types;

pub use core::Identity;
pub use types::{IdentityContext, RoleSet};
