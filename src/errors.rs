// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskDagError {
    #[error("task `{0}` is not attached to a graph (or its graph was dropped)")]
    Detached(String),

    #[error("execution pool rejected work for task `{0}`")]
    PoolRejected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskDagError>;
