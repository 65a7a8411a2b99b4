//! # Sync Command Implementation
//!
//! Runs the whole reconciliation: resolve the git origin, fetch the
//! repository metadata, load the descriptor, apply the merge steps, and
//! save the result in place.
//!
//! The document on disk is only rewritten by the final save; any earlier
//! failure exits non-zero and leaves it untouched.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use url::Url;

use pom_sync::git;
use pom_sync::github::{GithubClient, GithubConfig};
use pom_sync::origin::RemoteOrigin;
use pom_sync::sync::{MatchScope, SyncEngine, SyncOptions};
use pom_sync::xml::Document;

/// Sync the descriptor in the current working directory
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Path to the build descriptor.
    #[arg(long, value_name = "FILE", default_value = "pom.xml")]
    pub pom: PathBuf,

    /// GraphQL endpoint of the repository host.
    #[arg(
        long,
        value_name = "URL",
        default_value = pom_sync::github::DEFAULT_ENDPOINT
    )]
    pub endpoint: Url,

    /// Bearer credential for the metadata query.
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Plugin existence-check scope: 'deep' matches a plugin anywhere in
    /// the document, 'direct' only under build/plugins.
    #[arg(long, value_name = "SCOPE", default_value = "deep")]
    pub match_scope: MatchScope,
}

/// Execute the sync.
pub fn execute(args: SyncArgs) -> Result<()> {
    let origin_url = git::origin_url()?;
    let origin = RemoteOrigin::parse(&origin_url)?;
    log::info!("origin resolved to {}/{}", origin.owner, origin.name);

    let client = GithubClient::new(GithubConfig {
        endpoint: args.endpoint,
        token: args.token,
    });
    let metadata = client.fetch(&origin)?;

    let doc = Document::load(&args.pom)?;
    let mut engine = SyncEngine::new(
        doc,
        origin,
        metadata,
        SyncOptions {
            match_scope: args.match_scope,
        },
    );
    engine.apply();
    engine.into_document().save(&args.pom)?;

    println!("synced {}", args.pom.display());
    Ok(())
}
