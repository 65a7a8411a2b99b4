//! # Error Handling
//!
//! Centralized error handling for `pom-sync`, built on `thiserror`.
//!
//! Every failure in a run is fatal: there is no retry, no partial
//! application, and no best-effort continuation. Errors bubble up to the
//! binary, which reports them and exits non-zero. Because the document is
//! mutated only in memory and saved as the last step, a failure anywhere
//! leaves the on-disk `pom.xml` exactly as it was before the run.
//!
//! The variants mirror the run's phases:
//!
//! - `GitTimeout` / `GitCommand` / `GitEmptyOutput`: resolving the git
//!   `origin` remote of the working copy.
//! - `InvalidOrigin`: the remote URL does not look like a GitHub HTTPS
//!   origin.
//! - `Remote`: the GitHub metadata query failed at the transport or
//!   protocol level.
//! - `Document`: the build descriptor could not be parsed.
//! - `Io`: reading or writing the descriptor, or spawning git.

use thiserror::Error;

/// Main error type for pom-sync operations
#[derive(Error, Debug)]
pub enum Error {
    /// The git subprocess did not finish within its fixed deadline.
    #[error("timeout while resolving the git remote url")]
    GitTimeout,

    /// The git subprocess exited non-zero; carries the captured stderr.
    #[error("resolving the git remote url failed [{status}]: {stderr}")]
    GitCommand { status: i32, stderr: String },

    /// The git subprocess succeeded but printed nothing.
    #[error("resolving the git remote url produced no output")]
    GitEmptyOutput,

    /// The remote origin does not match `https://github.com/<owner>/<name>`.
    #[error("not a valid github remote origin: '{origin}'")]
    InvalidOrigin { origin: String },

    /// The GitHub metadata call failed (transport, HTTP, or GraphQL level).
    #[error("GitHub metadata query failed: {message}")]
    Remote { message: String },

    /// The build descriptor document is malformed or unloadable.
    #[error("document error: {message}")]
    Document { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
