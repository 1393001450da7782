use thiserror::Error;

/// Top-level failure for one sync run. Any variant exits with status 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Validation(#[from] equisync_core::ValidationError),

    #[error(transparent)]
    Api(#[from] equisync_core::ApiError),

    #[error(transparent)]
    Store(#[from] equisync_store::StoreError),
}
