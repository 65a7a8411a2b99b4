//! # CLI Command Implementations
//!
//! `pom-sync` is a single-purpose tool, so there is exactly one command:
//! the sync itself. It follows the usual shape of an args struct derived
//! with `clap` plus an `execute` function that orchestrates the library.

pub mod sync;
