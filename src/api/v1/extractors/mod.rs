/*
 * Responsibility
 * - handler 向け extractor の公開ポイント
 */
pub mod identity;

pub use identity::{Identity, IdentityContext, RoleSet};
