//! Bringing analyzed repositories onto disk and up to date.
//!
//! Network access goes through the `git` executable so the user's
//! credential helpers and SSH configuration apply.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;
use truechurn_core::ChurnError;

/// Where a configured repository lives.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use truechurn_gitpulse::RepoSource;
///
/// let source = RepoSource::resolve("git@github.com:acme/widgets.git", Path::new("/work"));
/// assert_eq!(
///     source,
///     RepoSource::Remote {
///         url: "git@github.com:acme/widgets.git".into(),
///         dir: PathBuf::from("/work/widgets"),
///     }
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSource {
    /// An existing directory, used as-is.
    Local(PathBuf),
    /// A clone URL and the directory it is cloned into.
    Remote {
        /// Clone URL.
        url: String,
        /// Checkout directory.
        dir: PathBuf,
    },
}

impl RepoSource {
    /// Classify a configured repository entry.
    ///
    /// Entries naming an existing directory are local. Anything else is a
    /// clone URL whose checkout lives in `workdir` under the URL's last path
    /// segment without its `.git` suffix.
    pub fn resolve(entry: &str, workdir: &Path) -> Self {
        let path = Path::new(entry);
        if path.is_dir() {
            return RepoSource::Local(path.to_path_buf());
        }
        RepoSource::Remote {
            url: entry.to_string(),
            dir: workdir.join(checkout_name(entry)),
        }
    }

    /// Directory the repository is (or will be) checked out in.
    pub fn dir(&self) -> &Path {
        match self {
            RepoSource::Local(path) => path,
            RepoSource::Remote { dir, .. } => dir,
        }
    }
}

/// Make sure `source` is on disk and, when `update` is set, current.
///
/// Missing remote checkouts are cloned; existing ones are fast-forwarded
/// with `git pull --ff-only` when `update` is true. Local directories are
/// never touched.
///
/// # Errors
///
/// Returns [`ChurnError::Git`] if `git` fails or cannot be run, and
/// [`ChurnError::FileNotFound`] when `update` is false and a remote
/// repository has not been cloned yet.
pub fn sync_repository(source: &RepoSource, update: bool) -> Result<PathBuf, ChurnError> {
    let (url, dir) = match source {
        RepoSource::Local(path) => return Ok(path.clone()),
        RepoSource::Remote { url, dir } => (url, dir),
    };

    if !dir.exists() {
        if !update {
            return Err(ChurnError::FileNotFound(dir.clone()));
        }
        info!(url = %url, dir = %dir.display(), "cloning repository");
        let target = dir.to_string_lossy();
        run_git(None, &["clone", "--quiet", url.as_str(), target.as_ref()])?;
    } else if update {
        info!(dir = %dir.display(), "bringing repository up to date");
        run_git(Some(dir), &["pull", "--ff-only", "--quiet"])?;
    }
    Ok(dir.clone())
}

fn checkout_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit(&['/', ':'][..]).next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

fn run_git(cwd: Option<&Path>, args: &[&str]) -> Result<(), ChurnError> {
    let mut command = Command::new("git");
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    let output = command
        .args(args)
        .output()
        .map_err(|e| ChurnError::Git(format!("failed to run git {}: {e}", args[0])))?;
    if !output.status.success() {
        return Err(ChurnError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}
