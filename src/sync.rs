//! # Merge Engine
//!
//! The idempotent structural merge: a fixed, linear sequence of apply
//! steps that each inspect the document and the fetched metadata, then
//! mutate the in-memory tree. Re-running the sequence against an already
//! synced document changes nothing except the singleton fields that are
//! always reasserted (`scm`, the license name/url,
//! `distributionManagement`), and those rewrite identical values rather
//! than duplicating siblings.
//!
//! Three kinds of step:
//!
//! - **Singleton upserts** (`scm`, `licenses/license`,
//!   `distributionManagement`): located by tag name, created at an anchor
//!   when missing, content overwritten on every run.
//! - **Additive collections** (`developers`): existing entries are never
//!   modified or removed; only missing ones are appended, matched by the
//!   text of a designated child.
//! - **Existence-gated upserts** (build plugins, the release profile):
//!   skipped entirely when a matching entry exists anywhere in scope, so
//!   manual configuration is never touched; otherwise a complete subtree
//!   is constructed.
//!
//! Steps run in a fixed order and there is no rollback: a failure before
//! the final save simply discards the in-memory tree.

use std::str::FromStr;

use crate::anchors::InsertionAnchors;
use crate::github::RepositoryMetadata;
use crate::origin::RemoteOrigin;
use crate::xml::Document;

const STAGING_HOST_ID: &str = "ossrh";
const SNAPSHOT_REPOSITORY_URL: &str = "https://oss.sonatype.org/content/repositories/snapshots";
const RELEASE_REPOSITORY_URL: &str =
    "https://oss.sonatype.org/service/local/staging/deploy/maven2/";
const NEXUS_URL: &str = "https://oss.sonatype.org/";

/// Repository id of the sunset JCenter package host, cleaned out of
/// existing descriptors.
const JCENTER_REPOSITORY_ID: &str = "jcenter";

const RELEASE_PROFILE_ID: &str = "release";

const MAVEN_SOURCE_PLUGIN_VERSION: &str = "3.3.0";
const MAVEN_JAVADOC_PLUGIN_VERSION: &str = "3.6.3";
const MAVEN_RELEASE_PLUGIN_VERSION: &str = "3.0.1";
const NEXUS_STAGING_PLUGIN_VERSION: &str = "1.6.13";
const MAVEN_GPG_PLUGIN_VERSION: &str = "3.1.0";

/// How widely plugin existence checks look for a matching artifactId.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    /// Match a plugin anywhere in the document, including
    /// `pluginManagement` and profile builds.
    Deep,
    /// Match only direct entries of `build/plugins`.
    Direct,
}

impl FromStr for MatchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deep" => Ok(MatchScope::Deep),
            "direct" => Ok(MatchScope::Direct),
            other => Err(format!(
                "invalid match scope '{}', expected 'deep' or 'direct'",
                other
            )),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub match_scope: MatchScope,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            match_scope: MatchScope::Deep,
        }
    }
}

/// The merge engine: owns the document for the duration of the run.
///
/// Anchors are computed from the document at construction, before any
/// step mutates it. The engine takes the document as an explicit handle,
/// so tests drive it with in-memory documents and hand-built metadata.
pub struct SyncEngine {
    doc: Document,
    origin: RemoteOrigin,
    metadata: RepositoryMetadata,
    anchors: InsertionAnchors,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(
        doc: Document,
        origin: RemoteOrigin,
        metadata: RepositoryMetadata,
        options: SyncOptions,
    ) -> Self {
        let anchors = InsertionAnchors::compute(&doc);
        SyncEngine {
            doc,
            origin,
            metadata,
            anchors,
            options,
        }
    }

    /// Run every apply step, in order.
    pub fn apply(&mut self) {
        self.apply_name();
        self.apply_description();
        self.apply_url();
        self.apply_scm();
        self.apply_license();
        self.apply_distribution_management();
        self.apply_developers();

        self.cleanup_legacy_repositories();

        self.apply_source_plugin();
        self.apply_javadoc_plugin();
        self.apply_release_plugin();
        self.apply_nexus_staging_plugin();

        self.apply_release_profile();
    }

    /// Give the mutated document back for saving.
    pub fn into_document(self) -> Document {
        self.doc
    }

    /// `name` is created once, defaulted to the project's own artifactId,
    /// and never overwritten: the descriptor, not the remote, owns it.
    fn apply_name(&mut self) {
        if self.doc.root().has_child("name") {
            return;
        }
        let Some(artifact_id) = self.doc.root().child_text("artifactId") else {
            return;
        };
        self.doc
            .edit_root()
            .get_or_create_at("name", &self.anchors.further_up)
            .set_text(&artifact_id);
    }

    fn apply_description(&mut self) {
        let Some(description) = self.metadata.description.clone() else {
            return;
        };
        self.doc
            .edit_root()
            .get_or_create_at("description", &self.anchors.further_up)
            .set_text(&description);
    }

    fn apply_url(&mut self) {
        let Some(url) = self.metadata.url.clone() else {
            return;
        };
        self.doc
            .edit_root()
            .get_or_create_at("url", &self.anchors.further_up)
            .set_text(&url);
    }

    fn apply_scm(&mut self) {
        let origin = self.origin.url.clone();
        let mut root = self.doc.edit_root();
        let mut scm = root.get_or_create_at("scm", &self.anchors.further_down);
        scm.set_child_text("developerConnection", &format!("scm:git:{}", origin));
        scm.set_child_text("url", &origin);
        scm.set_child_text("tag", "HEAD");
    }

    fn apply_license(&mut self) {
        let Some(license) = self.metadata.license_info.clone() else {
            return;
        };
        let mut root = self.doc.edit_root();
        let mut licenses = root.get_or_create_at("licenses", &self.anchors.further_down);
        let mut entry = licenses.get_or_create("license");
        entry.set_child_text("name", &license.name);
        if let Some(url) = &license.url {
            entry.set_child_text("url", url);
        }
        // A manually chosen distribution is kept.
        if !entry.has_child("distribution") {
            entry.set_child_text("distribution", "repo");
        }
    }

    /// Fixed-content template, always reasserted: the staging host is a
    /// constant of the release process, not remote metadata.
    fn apply_distribution_management(&mut self) {
        let mut root = self.doc.edit_root();
        let mut section =
            root.get_or_create_at("distributionManagement", &self.anchors.further_down);

        let mut snapshots = section.get_or_create("snapshotRepository");
        snapshots.set_child_text("id", STAGING_HOST_ID);
        snapshots.set_child_text("url", SNAPSHOT_REPOSITORY_URL);

        let mut releases = section.get_or_create("repository");
        releases.set_child_text("id", STAGING_HOST_ID);
        releases.set_child_text("url", RELEASE_REPOSITORY_URL);
    }

    /// Additive only: collaborators missing from `developers` are
    /// appended; existing entries are never modified or removed, so a
    /// hand-edited display name survives.
    fn apply_developers(&mut self) {
        let Some(collaborators) = self.metadata.collaborators.clone() else {
            return;
        };
        if collaborators.total_count == 0 || collaborators.nodes.is_empty() {
            return;
        }
        let mut root = self.doc.edit_root();
        let mut developers = root.get_or_create_at("developers", &self.anchors.further_down);
        for collaborator in &collaborators.nodes {
            let known = developers
                .as_element()
                .find("developer/id")
                .iter()
                .any(|id| id.text() == collaborator.login);
            if known {
                continue;
            }
            log::debug!("adding developer {}", collaborator.login);
            let mut developer = developers.add("developer");
            developer.add("id").set_text(&collaborator.login);
            developer.set_child_text(
                "name",
                collaborator.name.as_deref().unwrap_or(&collaborator.login),
            );
        }
    }

    /// Drop `repositories/repository` entries pointing at the sunset
    /// JCenter host. The section itself goes too once it holds no other
    /// repository; unrelated entries keep it alive.
    fn cleanup_legacy_repositories(&mut self) {
        let root = self.doc.root_mut();
        let emptied = {
            let Some(repositories) = root.child_mut("repositories") else {
                return;
            };
            let removed = repositories.remove_children_where("repository", |entry| {
                entry.child_text("id").as_deref() == Some(JCENTER_REPOSITORY_ID)
            });
            if removed > 0 {
                log::debug!("removed {} legacy repository entries", removed);
            }
            removed > 0 && repositories.element_children().next().is_none()
        };
        if emptied {
            root.remove_children_where("repositories", |_| true);
        }
    }

    fn has_plugin(&self, artifact_id: &str) -> bool {
        let matches_id =
            |plugin: &&crate::xml::Element| plugin.child_text("artifactId").as_deref() == Some(artifact_id);
        match self.options.match_scope {
            MatchScope::Deep => self
                .doc
                .root()
                .descendants_named("plugin")
                .iter()
                .any(matches_id),
            MatchScope::Direct => self
                .doc
                .root()
                .find("build/plugins/plugin")
                .iter()
                .any(matches_id),
        }
    }

    fn has_profile(&self, profile_id: &str) -> bool {
        self.doc
            .root()
            .find("profiles/profile/id")
            .iter()
            .any(|id| id.text() == profile_id)
    }

    fn apply_source_plugin(&mut self) {
        if self.has_plugin("maven-source-plugin") {
            return;
        }
        let mut root = self.doc.edit_root();
        let mut build = root.get_or_create_at("build", &self.anchors.further_down);
        let mut plugins = build.get_or_create("plugins");
        let mut plugin = plugins.add("plugin");
        plugin.set_child_text("artifactId", "maven-source-plugin");
        plugin.set_child_text("version", MAVEN_SOURCE_PLUGIN_VERSION);
        let mut executions = plugin.get_or_create("executions");
        let mut execution = executions.get_or_create("execution");
        execution.set_child_text("id", "attach-sources");
        execution
            .get_or_create("goals")
            .set_child_text("goal", "jar-no-fork");
    }

    fn apply_javadoc_plugin(&mut self) {
        if self.has_plugin("maven-javadoc-plugin") {
            return;
        }
        let mut root = self.doc.edit_root();
        let mut build = root.get_or_create_at("build", &self.anchors.further_down);
        let mut plugins = build.get_or_create("plugins");
        let mut plugin = plugins.add("plugin");
        plugin.set_child_text("artifactId", "maven-javadoc-plugin");
        plugin.set_child_text("version", MAVEN_JAVADOC_PLUGIN_VERSION);

        let mut executions = plugin.get_or_create("executions");
        let mut execution = executions.get_or_create("execution");
        execution.set_child_text("id", "attach-javadocs");
        execution.get_or_create("goals").set_child_text("goal", "jar");

        let mut configuration = plugin.get_or_create("configuration");
        configuration.set_child_text("doclint", "-missing");
    }

    fn apply_release_plugin(&mut self) {
        if self.has_plugin("maven-release-plugin") {
            return;
        }
        let mut root = self.doc.edit_root();
        let mut build = root.get_or_create_at("build", &self.anchors.further_down);
        let mut plugins = build.get_or_create("plugins");
        let mut plugin = plugins.add("plugin");
        plugin.set_child_text("artifactId", "maven-release-plugin");
        plugin.set_child_text("version", MAVEN_RELEASE_PLUGIN_VERSION);

        let mut configuration = plugin.get_or_create("configuration");
        configuration.set_child_text("autoVersionSubmodules", "true");
        configuration.set_child_text("useReleaseProfile", "false");
        configuration.set_child_text("releaseProfiles", RELEASE_PROFILE_ID);
        configuration.set_child_text("tagNameFormat", "@{project.version}");
    }

    fn apply_nexus_staging_plugin(&mut self) {
        if self.has_plugin("nexus-staging-maven-plugin") {
            return;
        }
        let mut root = self.doc.edit_root();
        let mut build = root.get_or_create_at("build", &self.anchors.further_down);
        let mut plugins = build.get_or_create("plugins");
        let mut plugin = plugins.add("plugin");
        plugin.set_child_text("groupId", "org.sonatype.plugins");
        plugin.set_child_text("artifactId", "nexus-staging-maven-plugin");
        plugin.set_child_text("version", NEXUS_STAGING_PLUGIN_VERSION);

        let mut configuration = plugin.get_or_create("configuration");
        configuration.set_child_text("serverId", STAGING_HOST_ID);
        configuration.set_child_text("nexusUrl", NEXUS_URL);
        configuration.set_child_text("autoReleaseAfterClose", "true");
    }

    fn apply_release_profile(&mut self) {
        if self.has_profile(RELEASE_PROFILE_ID) {
            return;
        }
        let mut root = self.doc.edit_root();
        let mut profiles = root.get_or_create("profiles");
        let mut profile = profiles.add("profile");
        profile.set_child_text("id", RELEASE_PROFILE_ID);

        let mut build = profile.get_or_create("build");
        let mut plugins = build.get_or_create("plugins");
        plugins.add_comment(
            "always run source+javadoc => see problems early & source available in local repo",
        );

        let mut plugin = plugins.add("plugin");
        plugin.add_comment("but don't run gpg everywhere, esp. not in github actions");
        plugin.set_child_text("artifactId", "maven-gpg-plugin");
        plugin.set_child_text("version", MAVEN_GPG_PLUGIN_VERSION);

        let mut executions = plugin.get_or_create("executions");
        let mut execution = executions.get_or_create("execution");
        execution.set_child_text("id", "sign-artifacts");
        execution.set_child_text("phase", "verify");
        execution.get_or_create("goals").set_child_text("goal", "sign");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{Collaborator, Collaborators, LicenseInfo};

    fn origin() -> RemoteOrigin {
        RemoteOrigin::parse("https://github.com/acme/widget.git").unwrap()
    }

    fn metadata() -> RepositoryMetadata {
        RepositoryMetadata {
            url: Some("https://github.com/acme/widget".to_string()),
            description: Some("A widget".to_string()),
            license_info: Some(LicenseInfo {
                name: "Apache License 2.0".to_string(),
                url: Some("https://api.github.com/licenses/apache-2.0".to_string()),
            }),
            collaborators: Some(Collaborators {
                nodes: vec![Collaborator {
                    login: "alice".to_string(),
                    name: Some("Alice A.".to_string()),
                }],
                total_count: 1,
            }),
        }
    }

    fn engine(pom: &str) -> SyncEngine {
        let doc = Document::parse(pom).unwrap();
        SyncEngine::new(doc, origin(), metadata(), SyncOptions::default())
    }

    const MINIMAL: &str = "<project>\n    <modelVersion>4.0.0</modelVersion>\n    <groupId>com.acme</groupId>\n    <artifactId>widget</artifactId>\n    <version>1.0.0-SNAPSHOT</version>\n</project>\n";

    #[test]
    fn test_name_defaults_to_artifact_id() {
        let mut engine = engine(MINIMAL);
        engine.apply_name();
        let doc = engine.into_document();
        assert_eq!(doc.root().child_text("name").as_deref(), Some("widget"));
    }

    #[test]
    fn test_name_is_never_overwritten() {
        let mut engine =
            engine("<project>\n    <artifactId>widget</artifactId>\n    <name>The Widget</name>\n</project>\n");
        engine.apply_name();
        let doc = engine.into_document();
        assert_eq!(doc.root().child_text("name").as_deref(), Some("The Widget"));
    }

    #[test]
    fn test_description_skipped_without_metadata() {
        let doc = Document::parse(MINIMAL).unwrap();
        let mut meta = metadata();
        meta.description = None;
        let mut engine = SyncEngine::new(doc, origin(), meta, SyncOptions::default());
        engine.apply_description();
        assert!(!engine.into_document().root().has_child("description"));
    }

    #[test]
    fn test_scm_is_always_reasserted() {
        let mut engine = engine(
            "<project>\n    <artifactId>widget</artifactId>\n    <scm>\n        <url>https://old.example.com</url>\n    </scm>\n</project>\n",
        );
        engine.apply_scm();
        let doc = engine.into_document();
        let scm = doc.root().child("scm").unwrap();
        assert_eq!(
            scm.child_text("developerConnection").as_deref(),
            Some("scm:git:https://github.com/acme/widget.git")
        );
        assert_eq!(
            scm.child_text("url").as_deref(),
            Some("https://github.com/acme/widget.git")
        );
        assert_eq!(scm.child_text("tag").as_deref(), Some("HEAD"));
        // Still a singleton.
        assert_eq!(doc.root().children_named("scm").count(), 1);
    }

    #[test]
    fn test_license_distribution_default_and_override() {
        let mut engine = engine(MINIMAL);
        engine.apply_license();
        let doc = engine.into_document();
        let license = doc.root().child("licenses").unwrap().child("license").unwrap();
        assert_eq!(license.child_text("distribution").as_deref(), Some("repo"));

        let mut engine = engine_with_manual_distribution();
        engine.apply_license();
        let doc = engine.into_document();
        let license = doc.root().child("licenses").unwrap().child("license").unwrap();
        assert_eq!(license.child_text("distribution").as_deref(), Some("manual"));
        // name/url still overwritten.
        assert_eq!(
            license.child_text("name").as_deref(),
            Some("Apache License 2.0")
        );
    }

    fn engine_with_manual_distribution() -> SyncEngine {
        engine(
            "<project>\n    <licenses>\n        <license>\n            <name>Old</name>\n            <distribution>manual</distribution>\n        </license>\n    </licenses>\n</project>\n",
        )
    }

    #[test]
    fn test_jcenter_cleanup_removes_emptied_section() {
        let mut engine = engine(
            "<project>\n    <repositories>\n        <repository>\n            <id>jcenter</id>\n        </repository>\n    </repositories>\n</project>\n",
        );
        engine.cleanup_legacy_repositories();
        assert!(!engine.into_document().root().has_child("repositories"));
    }

    #[test]
    fn test_jcenter_cleanup_keeps_other_repositories() {
        let mut engine = engine(
            "<project>\n    <repositories>\n        <repository>\n            <id>jcenter</id>\n        </repository>\n        <repository>\n            <id>spring-milestones</id>\n        </repository>\n    </repositories>\n</project>\n",
        );
        engine.cleanup_legacy_repositories();
        let doc = engine.into_document();
        let repositories = doc.root().child("repositories").unwrap();
        let ids: Vec<String> = repositories
            .find("repository/id")
            .iter()
            .map(|id| id.text())
            .collect();
        assert_eq!(ids, vec!["spring-milestones"]);
    }

    #[test]
    fn test_has_plugin_deep_sees_plugin_management() {
        let pom = "<project>\n    <build>\n        <pluginManagement>\n            <plugins>\n                <plugin>\n                    <artifactId>maven-source-plugin</artifactId>\n                </plugin>\n            </plugins>\n        </pluginManagement>\n    </build>\n</project>\n";
        let deep = engine(pom);
        assert!(deep.has_plugin("maven-source-plugin"));

        let doc = Document::parse(pom).unwrap();
        let direct = SyncEngine::new(
            doc,
            origin(),
            metadata(),
            SyncOptions {
                match_scope: MatchScope::Direct,
            },
        );
        assert!(!direct.has_plugin("maven-source-plugin"));
    }

    #[test]
    fn test_release_profile_gated_on_profile_id() {
        let mut engine = engine(
            "<project>\n    <profiles>\n        <profile>\n            <id>release</id>\n        </profile>\n    </profiles>\n</project>\n",
        );
        let before = engine.doc.to_xml();
        engine.apply_release_profile();
        assert_eq!(engine.doc.to_xml(), before);
    }

    #[test]
    fn test_match_scope_from_str() {
        assert_eq!("deep".parse::<MatchScope>().unwrap(), MatchScope::Deep);
        assert_eq!("direct".parse::<MatchScope>().unwrap(), MatchScope::Direct);
        assert!("shallow".parse::<MatchScope>().is_err());
    }
}
