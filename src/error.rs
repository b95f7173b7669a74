use reqwest::Error as REQWEST_ERROR;
use sqlx::error::Error as SQL_ERROR;
use std::num::TryFromIntError as TRY_FROM_INT_ERROR;
use std::{env::VarError, io::Error as IO_ERROR, num::ParseIntError};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;
use url::ParseError as URL_ERROR;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    URL(#[from] URL_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    SQL(#[from] SQL_ERROR),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Asset not supported: {0}")]
    NotSupportedAsset(String),

    #[error("Chain error: {0}")]
    ChainError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Task error: {0}")]
    TaskError(String),

    #[error("Runner error: {0}")]
    RunnerError(String),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("{0}")]
    TryFromIntError(#[from] TRY_FROM_INT_ERROR),

    #[error("{0}")]
    ReqwestError(#[from] REQWEST_ERROR),
}
