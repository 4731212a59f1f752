//! lfs command - re-run large-file object relocation on a derived repository

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use serde::Serialize;

use crate::cli::Context;
use crate::core::config::{Config, ConfigError, Policy, DEFAULT_LFS_EXTENSIONS};
use crate::engine::lfs::LfsObjectRelocator;
use crate::git::Git;
use crate::ui::output::{self, Format};

#[derive(Serialize)]
struct LfsResult<'a> {
    repo: &'a Path,
    copied: usize,
    missing: Vec<(String, String)>,
}

/// Copy the objects referenced by `repo` from `sources` into its cache.
///
/// Extensions, verification and the missing-object policy come from the
/// configuration when one is found, and from the defaults otherwise.
pub fn lfs(ctx: &Context, repo: &Path, sources: Vec<PathBuf>) -> Result<()> {
    let (extensions, verify, policy) = match Config::load(ctx.config.as_deref()) {
        Ok(loaded) => (
            loaded.config.lfs_extensions,
            loaded.config.verify_lfs_digests,
            loaded.config.policy.missing_lfs_object,
        ),
        Err(ConfigError::NotFound { .. }) if ctx.config.is_none() => (
            DEFAULT_LFS_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            true,
            Policy::Fail,
        ),
        Err(e) => return Err(e).context("failed to load configuration"),
    };

    for source in &sources {
        if !source.is_dir() {
            bail!("object cache '{}' does not exist", source.display());
        }
    }

    let git = Git::open(repo).with_context(|| format!("cannot open '{}'", repo.display()))?;
    let summary = LfsObjectRelocator::new(&extensions, sources)
        .verify(verify)
        .on_missing(policy)
        .relocate(&git, &git.lfs_objects_dir())
        .context("large-file relocation failed")?;

    for missing in &summary.missing {
        output::warn(
            format!("large-file object {} for {} not found", missing.digest, missing.path),
            ctx.verbosity,
        );
    }

    match ctx.format {
        Format::Json => {
            let result = LfsResult {
                repo,
                copied: summary.copied,
                missing: summary
                    .missing
                    .iter()
                    .map(|m| (m.path.clone(), m.digest.clone()))
                    .collect(),
            };
            output::result(serde_json::to_string_pretty(&result)?);
        }
        Format::Text => output::result(format!(
            "{}: copied {} objects, {} missing",
            repo.display(),
            summary.copied,
            summary.missing.len()
        )),
    }
    Ok(())
}
