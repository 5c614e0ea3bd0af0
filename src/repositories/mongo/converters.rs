use anyhow::anyhow;
use mongodb::error::Result as MongoResult;

use crate::repositories::{RepositoryError, Result as RepoResult};

pub fn convert_repo_err<T, E>(result: Result<T, E>) -> RepoResult<T>
where
    E: Sync + Send + ::std::error::Error + 'static,
{
    result.map_err(|e| RepositoryError::Internal(anyhow!(e)))
}

/// Maps a duplicate-key write (code 11000 on a unique index) to `Ok(false)`
/// so callers can treat "already there" as a normal outcome.
pub fn try_unique_check<T>(result: MongoResult<T>) -> RepoResult<bool> {
    let err = match result {
        Ok(_) => return Ok(true),
        Err(e) => e,
    };

    match *err.kind.clone() {
        ::mongodb::error::ErrorKind::Write(::mongodb::error::WriteFailure::WriteError(we))
            if we.code == 11000 =>
        {
            Ok(false)
        }
        _ => Err(RepositoryError::Internal(anyhow!(err))),
    }
}

pub fn convert_404_or<T>(option: Option<T>) -> RepoResult<T> {
    match option {
        Some(t) => Ok(t),
        None => Err(RepositoryError::NotFound),
    }
}

/// An `update_one` that matched nothing means the target is gone.
pub fn matched_or_404(matched_count: u64) -> RepoResult<()> {
    match matched_count {
        0 => Err(RepositoryError::NotFound),
        _ => Ok(()),
    }
}
