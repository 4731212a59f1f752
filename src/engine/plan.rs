//! engine::plan
//!
//! Project discovery and the two-stage execution plan.
//!
//! # Stages
//!
//! 1. Shared components, mutually independent
//! 2. Projects, mutually independent, each reading the frozen correlation
//!    tables of the components it mounts
//!
//! Building a plan reads the source repository but writes nothing.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::core::config::{ConfigError, SplitConfig};
use crate::core::types::{Oid, RepoName, ScopePath, TypeError};
use crate::git::{Git, GitError, TreeEntry};

/// Errors from building a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error("unknown project '{0}'")]
    UnknownProject(String),

    #[error("merge source '{repo}' targets '{project}', which is not a project")]
    UnknownMergeTarget { project: String, repo: String },

    #[error(transparent)]
    InvalidName(#[from] TypeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A shared component to split in stage 1.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentPlan {
    pub name: RepoName,
    /// Path the component is split from
    pub source: ScopePath,
    /// Every mount path, including projects not selected for this run
    pub mounts: Vec<ScopePath>,
}

/// A shared component as seen from one project.
#[derive(Debug, Clone, Serialize)]
pub struct MountPlan {
    pub component: RepoName,
    /// Path of the gitlink inside the project
    pub local: ScopePath,
}

/// A project to split in stage 2.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectPlan {
    pub name: RepoName,
    pub mounts: Vec<MountPlan>,
    /// Indexes into the configured merge sources, in configuration order
    pub merges: Vec<usize>,
}

/// The full execution plan.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    /// The source commit log, oldest first, shared by every split
    #[serde(skip)]
    pub log: Arc<Vec<Oid>>,
    pub commits: usize,
    pub components: Vec<ComponentPlan>,
    pub projects: Vec<ProjectPlan>,
}

impl Plan {
    /// Read the source log, discover projects and order the work.
    ///
    /// `only` restricts the projects; components are kept when a selected
    /// project mounts them. An empty `only` selects everything.
    ///
    /// # Errors
    ///
    /// - [`PlanError::UnknownProject`] for a name in `only` that is not a project
    /// - [`PlanError::UnknownMergeTarget`] for a merge source aimed elsewhere
    /// - [`PlanError::Config`] if the configuration does not validate
    pub fn build(config: &SplitConfig, only: &[String]) -> Result<Self, PlanError> {
        config.validate()?;
        let source = Git::open(&config.main_repo)?;
        let log = source.topo_log()?;

        let all = if config.discovery.projects.is_empty() {
            discover(&source, &log, config)?
        } else {
            config
                .discovery
                .projects
                .iter()
                .map(|p| RepoName::new(p.as_str()))
                .collect::<Result<Vec<_>, _>>()?
        };

        for merge in &config.merge {
            if !all.contains(&merge.project) {
                return Err(PlanError::UnknownMergeTarget {
                    project: merge.project.to_string(),
                    repo: merge.repo.display().to_string(),
                });
            }
        }

        for name in only {
            if !all.iter().any(|p| p.as_str() == name) {
                return Err(PlanError::UnknownProject(name.clone()));
            }
        }
        let selected: Vec<RepoName> = all
            .into_iter()
            .filter(|p| only.is_empty() || only.iter().any(|o| o == p.as_str()))
            .collect();

        let projects: Vec<ProjectPlan> = selected
            .into_iter()
            .map(|name| project_plan(config, name))
            .collect();

        let mut components = Vec::new();
        for shared in &config.shared {
            let mounted = projects
                .iter()
                .any(|p| p.mounts.iter().any(|m| m.component == shared.name));
            if only.is_empty() || mounted {
                components.push(ComponentPlan {
                    name: shared.name.clone(),
                    source: shared.source_path()?.clone(),
                    mounts: shared.mounts.clone(),
                });
            }
        }

        Ok(Self {
            commits: log.len(),
            log: Arc::new(log),
            components,
            projects,
        })
    }

    /// Human-readable summary for `plan`.
    pub fn render(&self, config: &SplitConfig) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "source: {} ({} commits)", config.main_repo.display(), self.commits);
        let _ = writeln!(out, "output: {}", config.output.display());

        let _ = writeln!(out, "\nstage 1: shared components");
        if self.components.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for component in &self.components {
            let mounts: Vec<&str> = component.mounts.iter().map(|m| m.as_str()).collect();
            let _ = writeln!(
                out,
                "  {} <- {} (mounted at {})",
                component.name,
                component.source,
                mounts.join(", ")
            );
        }

        let _ = writeln!(out, "\nstage 2: projects");
        for project in &self.projects {
            let _ = writeln!(out, "  {}", project.name);
            for mount in &project.mounts {
                let _ = writeln!(out, "    submodule {} -> {}", mount.local, mount.component);
            }
            for &index in &project.merges {
                let merge = &config.merge[index];
                let _ = writeln!(out, "    merge {}", merge.repo.display());
                for mapping in &merge.mappings {
                    let _ = writeln!(out, "      {} -> {}", mapping.from, mapping.to);
                }
            }
        }
        out
    }
}

/// Every top-level directory name that appears anywhere in `log` and
/// qualifies as a project, sorted.
fn discover(source: &Git, log: &[Oid], config: &SplitConfig) -> Result<Vec<RepoName>, PlanError> {
    let mut seen_trees = BTreeSet::new();
    let mut names = BTreeSet::new();
    for oid in log {
        let commit = source.commit(oid)?;
        if !seen_trees.insert(commit.tree.clone()) {
            continue;
        }
        for (name, entry) in source.tree_entries(&commit.tree)? {
            if matches!(entry, TreeEntry::Tree { .. }) {
                names.insert(name);
            }
        }
    }

    Ok(names
        .into_iter()
        .filter(|name| config.discovery.accepts(name))
        .filter(|name| {
            !config
                .shared
                .iter()
                .any(|s| {
                    s.name.as_str() == name
                        || s.source_path().is_ok_and(|source| source.as_str() == name)
                })
        })
        .filter_map(|name| RepoName::new(name).ok())
        .collect())
}

fn project_plan(config: &SplitConfig, name: RepoName) -> ProjectPlan {
    let mounts = config
        .shared
        .iter()
        .filter_map(|shared| {
            shared
                .mounts
                .iter()
                .find_map(|m| m.relative_to(name.as_str()))
                .and_then(|local| ScopePath::new(local).ok())
                .map(|local| MountPlan {
                    component: shared.name.clone(),
                    local,
                })
        })
        .collect();

    let merges = config
        .merge
        .iter()
        .enumerate()
        .filter(|(_, m)| m.project == name)
        .map(|(i, _)| i)
        .collect();

    ProjectPlan {
        name,
        mounts,
        merges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{FileMode, Timestamp};
    use crate::git::Identity;
    use tempfile::TempDir;

    fn ident() -> Identity {
        Identity {
            name: "T".into(),
            email: "t@example.com".into(),
            when: Timestamp {
                seconds: 1_500_000_000,
                offset_minutes: 0,
            },
        }
    }

    /// Source with top-level `A`, `B`, `Common`, `build-tools` over two
    /// commits; `B` only exists in the first.
    fn source(dir: &TempDir) {
        let git = Git::init(dir.path(), "master").unwrap();
        for path in ["A/a.txt", "B/b.txt", "Common/c.txt", "build-tools/t.sh"] {
            let blob = git.write_blob(path.as_bytes()).unwrap();
            git.stage_file(path, &blob, FileMode::Regular).unwrap();
        }
        git.commit_index("one", &ident(), &ident()).unwrap();
        git.unstage_dir("B").unwrap();
        git.commit_index("two", &ident(), &ident()).unwrap();
    }

    fn config(dir: &TempDir, extra: &str) -> SplitConfig {
        let text = format!(
            "main_repo = {:?}\norigin_url = \"{{name}}\"\n{}",
            dir.path().display().to_string(),
            extra
        );
        let config: SplitConfig = toml::from_str(&text).unwrap();
        config.validate().unwrap();
        config
    }

    const SHARED: &str = r#"
        [[shared]]
        name = "Common"
        source = "Common"
        mounts = ["A/libCommon", "B/libCommon"]
    "#;

    #[test]
    fn discovers_projects_across_history() {
        let dir = TempDir::new().unwrap();
        source(&dir);
        let plan = Plan::build(&config(&dir, SHARED), &[]).unwrap();

        let names: Vec<&str> = plan.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(plan.commits, 2);
        assert_eq!(plan.log.len(), 2);
        assert_eq!(plan.components.len(), 1);
        assert_eq!(plan.components[0].source.as_str(), "Common");
    }

    #[test]
    fn mounts_are_relative_to_project() {
        let dir = TempDir::new().unwrap();
        source(&dir);
        let plan = Plan::build(&config(&dir, SHARED), &[]).unwrap();
        let a = &plan.projects[0];
        assert_eq!(a.mounts.len(), 1);
        assert_eq!(a.mounts[0].local.as_str(), "libCommon");
        assert_eq!(a.mounts[0].component.as_str(), "Common");
    }

    #[test]
    fn only_filters_projects_and_components() {
        let dir = TempDir::new().unwrap();
        source(&dir);
        let extra = r#"
            [[shared]]
            name = "Common"
            source = "Common"
            mounts = ["A/libCommon"]
        "#;
        let cfg = config(&dir, extra);

        let plan = Plan::build(&cfg, &["B".to_string()]).unwrap();
        assert_eq!(plan.projects.len(), 1);
        assert!(plan.components.is_empty());

        let plan = Plan::build(&cfg, &["A".to_string()]).unwrap();
        assert_eq!(plan.components.len(), 1);

        assert!(matches!(
            Plan::build(&cfg, &["Nope".to_string()]),
            Err(PlanError::UnknownProject(_))
        ));
    }

    #[test]
    fn explicit_projects_skip_discovery() {
        let dir = TempDir::new().unwrap();
        source(&dir);
        let plan = Plan::build(&config(&dir, "[discovery]\nprojects = [\"A\"]\n"), &[]).unwrap();
        let names: Vec<&str> = plan.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A"]);
    }

    #[test]
    fn merge_target_must_be_a_project() {
        let dir = TempDir::new().unwrap();
        source(&dir);
        let extra = r#"
            [[merge]]
            project = "Z"
            repo = "/legacy"
            mappings = [{ from = "a", to = "b" }]
        "#;
        assert!(matches!(
            Plan::build(&config(&dir, extra), &[]),
            Err(PlanError::UnknownMergeTarget { .. })
        ));
    }

    #[test]
    fn unvalidated_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        source(&dir);
        let text = format!(
            "main_repo = {:?}\norigin_url = \"{{name}}\"\n[[shared]]\nname = \"Common\"\nmounts = []\n",
            dir.path().display().to_string(),
        );
        let cfg: SplitConfig = toml::from_str(&text).unwrap();
        assert!(matches!(
            Plan::build(&cfg, &[]),
            Err(PlanError::Config(ConfigError::InvalidValue(_)))
        ));
    }

    #[test]
    fn render_lists_both_stages() {
        let dir = TempDir::new().unwrap();
        source(&dir);
        let cfg = config(&dir, SHARED);
        let text = Plan::build(&cfg, &[]).unwrap().render(&cfg);
        assert!(text.contains("stage 1: shared components"));
        assert!(text.contains("Common <- Common (mounted at A/libCommon, B/libCommon)"));
        assert!(text.contains("submodule libCommon -> Common"));
    }
}
