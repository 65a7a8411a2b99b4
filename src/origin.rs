//! # Remote Origin
//!
//! The canonical HTTPS URL of the hosted repository, parsed once per run
//! into its (owner, name) coordinates. Only GitHub HTTPS origins are
//! accepted; SSH remotes and other hosts fail with
//! [`Error::InvalidOrigin`](crate::error::Error::InvalidOrigin).

use regex::Regex;

use crate::error::{Error, Result};

/// The canonical remote repository URL and its parsed coordinates.
///
/// Resolved at run start from the local working copy and never
/// re-resolved mid-run. The `url` field keeps the origin exactly as git
/// reported it (including a trailing `.git`), since that is the form the
/// `scm` section should carry.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteOrigin {
    pub url: String,
    pub owner: String,
    pub name: String,
}

impl RemoteOrigin {
    /// Parse `https://github.com/<owner>/<name>`, with an optional
    /// trailing `.git` stripped from the name.
    pub fn parse(origin: &str) -> Result<Self> {
        let pattern = Regex::new(r"^https://github\.com/([^/]+)/([^/]+?)(?:\.git)?$")
            .expect("origin pattern is valid");
        let captures = pattern.captures(origin).ok_or_else(|| Error::InvalidOrigin {
            origin: origin.to_string(),
        })?;
        Ok(RemoteOrigin {
            url: origin.to_string(),
            owner: captures[1].to_string(),
            name: captures[2].to_string(),
        })
    }
}
