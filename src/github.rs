//! # Repository Metadata Client
//!
//! Fetches the canonical metadata of a GitHub repository (display URL,
//! description, license, collaborators) with a single GraphQL query.
//!
//! The client is a plain configuration struct plus a blocking `ureq`
//! agent; there is exactly one call per run and no retry, so anything
//! fancier would be dead weight. Transport failures, non-2xx statuses,
//! and GraphQL-level errors all surface as
//! [`Error::Remote`](crate::error::Error::Remote) and abort the run.

use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::error::{Error, Result};
use crate::origin::RemoteOrigin;

/// Default GraphQL endpoint of the hosted API.
pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";

/// Network timeout for the metadata call. The engine itself enforces no
/// deadline; this only keeps a dead network from hanging the process.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

const REPOSITORY_QUERY: &str = "\
query($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    url
    description
    licenseInfo { name url }
    collaborators { nodes { login name } totalCount }
  }
}";

/// Client configuration: where to call and how to authenticate.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub endpoint: Url,
    /// Bearer credential, typically sourced from `GITHUB_TOKEN`.
    pub token: String,
}

/// Blocking client for the repository-metadata query.
pub struct GithubClient {
    config: GithubConfig,
    agent: ureq::Agent,
}

/// Canonical metadata of the hosted repository, fetched once per run and
/// read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryMetadata {
    pub url: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "licenseInfo")]
    pub license_info: Option<LicenseInfo>,
    pub collaborators: Option<Collaborators>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LicenseInfo {
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collaborators {
    pub nodes: Vec<Collaborator>,
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collaborator {
    pub login: String,
    /// Display name; GitHub reports `null` for users who never set one.
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    repository: Option<RepositoryMetadata>,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(CALL_TIMEOUT).build();
        GithubClient { config, agent }
    }

    /// Fetch metadata for the repository behind a parsed remote origin.
    pub fn fetch(&self, origin: &RemoteOrigin) -> Result<RepositoryMetadata> {
        self.fetch_repository(&origin.owner, &origin.name)
    }

    /// Fetch metadata by explicit (owner, name) coordinates.
    pub fn fetch_repository(&self, owner: &str, name: &str) -> Result<RepositoryMetadata> {
        let body = json!({
            "query": REPOSITORY_QUERY,
            "variables": { "owner": owner, "name": name },
        });

        let started = Instant::now();
        let response = self
            .agent
            .post(self.config.endpoint.as_str())
            .set("Authorization", &format!("Bearer {}", self.config.token))
            .send_json(body);
        log::debug!(
            "GitHub metadata call for {}/{} took {} ms",
            owner,
            name,
            started.elapsed().as_millis()
        );

        let response = response.map_err(|e| Error::Remote {
            message: e.to_string(),
        })?;
        let envelope: GraphQlResponse = response.into_json().map_err(|e| Error::Remote {
            message: format!("malformed response: {}", e),
        })?;
        unwrap_envelope(envelope, owner, name)
    }
}

/// Turn the GraphQL response envelope into metadata or a fatal error.
fn unwrap_envelope(
    envelope: GraphQlResponse,
    owner: &str,
    name: &str,
) -> Result<RepositoryMetadata> {
    if let Some(errors) = envelope.errors {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        return Err(Error::Remote {
            message: messages.join("; "),
        });
    }
    envelope
        .data
        .and_then(|d| d.repository)
        .ok_or_else(|| Error::Remote {
            message: format!("no repository data for {}/{}", owner, name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> GraphQlResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_deserialize_full_response() {
        let metadata = unwrap_envelope(
            envelope(
                r#"{
                    "data": {
                        "repository": {
                            "url": "https://github.com/acme/widget",
                            "description": "A widget",
                            "licenseInfo": {
                                "name": "Apache License 2.0",
                                "url": "https://api.github.com/licenses/apache-2.0"
                            },
                            "collaborators": {
                                "nodes": [
                                    {"login": "alice", "name": "Alice A."},
                                    {"login": "bob", "name": null}
                                ],
                                "totalCount": 2
                            }
                        }
                    }
                }"#,
            ),
            "acme",
            "widget",
        )
        .unwrap();

        assert_eq!(metadata.url.as_deref(), Some("https://github.com/acme/widget"));
        assert_eq!(metadata.description.as_deref(), Some("A widget"));
        assert_eq!(metadata.license_info.unwrap().name, "Apache License 2.0");
        let collaborators = metadata.collaborators.unwrap();
        assert_eq!(collaborators.total_count, 2);
        assert_eq!(collaborators.nodes[1].login, "bob");
        assert!(collaborators.nodes[1].name.is_none());
    }

    #[test]
    fn test_deserialize_sparse_response() {
        let metadata = unwrap_envelope(
            envelope(
                r#"{"data": {"repository": {
                    "url": "https://github.com/acme/widget",
                    "description": null,
                    "licenseInfo": null,
                    "collaborators": null
                }}}"#,
            ),
            "acme",
            "widget",
        )
        .unwrap();
        assert!(metadata.description.is_none());
        assert!(metadata.license_info.is_none());
        assert!(metadata.collaborators.is_none());
    }

    #[test]
    fn test_graphql_errors_are_fatal() {
        let err = unwrap_envelope(
            envelope(r#"{"data": null, "errors": [{"message": "rate limited"}]}"#),
            "acme",
            "widget",
        )
        .unwrap_err();
        match err {
            Error::Remote { message } => assert!(message.contains("rate limited")),
            other => panic!("expected Remote, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_repository_is_fatal() {
        let err = unwrap_envelope(
            envelope(r#"{"data": {"repository": null}}"#),
            "acme",
            "widget",
        )
        .unwrap_err();
        match err {
            Error::Remote { message } => assert!(message.contains("acme/widget")),
            other => panic!("expected Remote, got {:?}", other),
        }
    }
}
