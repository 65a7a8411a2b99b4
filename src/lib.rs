//! # pom-sync Library
//!
//! Core functionality for reconciling a Maven `pom.xml` with canonical
//! metadata from the repository host. It is used by the `pom-sync`
//! command-line tool but the engine is plain library code driven through
//! explicit handles, so it can be exercised entirely in memory.
//!
//! ## Core Concepts
//!
//! - **Document access (`xml`)**: an ordered element tree that keeps
//!   whitespace, comments, and attributes in place so untouched regions
//!   of the descriptor round-trip byte-for-byte.
//! - **Origin resolution (`git`, `origin`)**: the working copy's `origin`
//!   remote, resolved once and parsed into (owner, name).
//! - **Metadata (`github`)**: one GraphQL query returning the display
//!   URL, description, license, and collaborator list.
//! - **Anchors (`anchors`)**: two insertion positions computed up front
//!   so new sections land in conventional descriptor order no matter
//!   which sections already exist.
//! - **Merge engine (`sync`)**: the fixed sequence of idempotent apply
//!   steps.
//!
//! ## Execution Flow
//!
//! 1. Resolve the git `origin` remote (fatal on timeout, non-zero exit,
//!    or empty output).
//! 2. Parse it into (owner, name) and fetch the repository metadata.
//! 3. Load `pom.xml` into the in-memory tree.
//! 4. Run the apply steps against the tree.
//! 5. Save the tree back in place.
//!
//! Any failure aborts the run before the save, leaving the on-disk
//! descriptor untouched.
//!
//! ## Quick Example
//!
//! ```
//! use pom_sync::origin::RemoteOrigin;
//! use pom_sync::github::RepositoryMetadata;
//! use pom_sync::sync::{SyncEngine, SyncOptions};
//! use pom_sync::xml::Document;
//!
//! let doc = Document::parse(
//!     "<project>\n    <artifactId>widget</artifactId>\n</project>\n",
//! ).unwrap();
//! let origin = RemoteOrigin::parse("https://github.com/acme/widget.git").unwrap();
//! let metadata = RepositoryMetadata {
//!     url: Some("https://github.com/acme/widget".to_string()),
//!     description: None,
//!     license_info: None,
//!     collaborators: None,
//! };
//!
//! let mut engine = SyncEngine::new(doc, origin, metadata, SyncOptions::default());
//! engine.apply();
//! let out = engine.into_document().to_xml();
//! assert!(out.contains("<name>widget</name>"));
//! assert!(out.contains("<tag>HEAD</tag>"));
//! ```

pub mod anchors;
pub mod error;
pub mod git;
pub mod github;
pub mod origin;
pub mod sync;
pub mod xml;
