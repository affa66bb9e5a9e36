/*
 * Responsibility
 * - middleware の公開インターフェース (re-export)
 * - auth: guard pipeline / cors / http (request id, trace, timeout)
 */
pub mod auth;
pub mod cors;
pub mod http;
