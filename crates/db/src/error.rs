use moduleab_core::error::CoreError;
use moduleab_core::vault::VaultError;

use crate::store::StoreError;

/// Failure of an engine or catalog operation.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Caller-fixable: the payload broke a field rule.
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Core(CoreError),
}

impl From<CoreError> for DataError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => DataError::Validation(msg),
            CoreError::NotFound { entity, key } => DataError::NotFound { entity, key },
            other => DataError::Core(other),
        }
    }
}
