/**
 * Responsibility
 * - repo が上位に伝える意味の定義
 * - unique 制約違反 (email の重複) は Conflict として区別する
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[source] sqlx::Error),
    #[error("conflict")]
    Conflict,
}

pub type RepoResult<T> = Result<T, RepoError>;

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(dbe) = &e {
            if dbe.code().as_deref() == Some("23505") {
                return RepoError::Conflict;
            }
        }
        RepoError::Db(e)
    }
}
