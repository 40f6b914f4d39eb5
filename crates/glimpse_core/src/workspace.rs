//! Workspace resolution and validation.
//!
//! A workspace is the git-backed directory holding the generated source for
//! one editing session of a project. The resolver maps a `(project, session)`
//! key to its directory deterministically and without I/O; validation checks,
//! fail-closed, that the directory is a usable repository.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Identifies one workspace: a project plus an optional editing session.
///
/// `session_id: None` denotes the project's default branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceKey {
    pub project_id: i64,
    pub session_id: Option<String>,
}

impl WorkspaceKey {
    /// Create a key, rejecting session ids that could escape the
    /// projects root when joined into a path.
    pub fn new(project_id: i64, session_id: Option<impl Into<String>>) -> CoreResult<Self> {
        let session_id = match session_id {
            Some(s) => {
                let s = s.into();
                if s.is_empty()
                    || s == "."
                    || s == ".."
                    || s.contains('/')
                    || s.contains('\\')
                    || s.contains('\0')
                {
                    return Err(CoreError::InvalidSessionId(s));
                }
                Some(s)
            }
            None => None,
        };

        Ok(Self {
            project_id,
            session_id,
        })
    }

    /// Key for a project's default branch.
    pub fn default_branch(project_id: i64) -> Self {
        Self {
            project_id,
            session_id: None,
        }
    }

    /// Lowercase `[a-z0-9-]` form of the session id, for container names.
    pub fn session_slug(&self) -> Option<String> {
        self.session_id.as_deref().map(slugify)
    }
}

impl std::fmt::Display for WorkspaceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.session_id {
            Some(s) => write!(f, "project {} session {}", self.project_id, s),
            None => write!(f, "project {} (default branch)", self.project_id),
        }
    }
}

fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Maps workspace keys to directories under a fixed projects root.
#[derive(Debug, Clone)]
pub struct WorkspaceResolver {
    projects_root: PathBuf,
}

impl WorkspaceResolver {
    pub fn new<P: AsRef<Path>>(projects_root: P) -> Self {
        Self {
            projects_root: projects_root.as_ref().to_path_buf(),
        }
    }

    pub fn projects_root(&self) -> &Path {
        &self.projects_root
    }

    /// Resolve the workspace directory for a key.
    ///
    /// Pure and deterministic: the same key always yields the same path. The
    /// default branch lives at the project directory itself, sessions under
    /// a `sessions/` subdirectory.
    pub fn resolve(&self, key: &WorkspaceKey) -> PathBuf {
        let project_dir = self
            .projects_root
            .join(format!("project-{}", key.project_id));
        match &key.session_id {
            Some(session) => project_dir.join("sessions").join(session),
            None => project_dir,
        }
    }

    /// Check that the workspace exists and is a usable git repository.
    ///
    /// Fails closed: missing directory, missing repository metadata, or any
    /// I/O error all yield `false`. Never creates or repairs anything.
    pub fn validate(&self, key: &WorkspaceKey) -> bool {
        let path = self.resolve(key);
        if !path.is_dir() {
            debug!("Workspace missing for {}: {}", key, path.display());
            return false;
        }

        let probe = RepoProbe::new(&path);
        if !probe.is_initialized() {
            debug!("Workspace for {} is not a git repository", key);
            return false;
        }

        match probe.current_branch() {
            Ok(_) => true,
            Err(e) => {
                debug!("Workspace for {} has no usable branch: {}", key, e);
                false
            }
        }
    }

    /// Name of the default branch for a project, read from the default
    /// workspace. `None` when the default workspace is itself unusable.
    pub fn default_branch(&self, project_id: i64) -> Option<String> {
        let key = WorkspaceKey::default_branch(project_id);
        let probe = RepoProbe::new(self.resolve(&key));
        probe.current_branch().ok()
    }
}

/// Read-only git inspection of one directory.
#[derive(Debug)]
pub struct RepoProbe {
    repo_path: PathBuf,
}

impl RepoProbe {
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }

    /// Check if git is available on the system.
    pub fn is_git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Check if the directory holds a repository.
    pub fn is_initialized(&self) -> bool {
        self.repo_path.join(".git").exists()
    }

    /// Get the current branch name.
    pub fn current_branch(&self) -> CoreResult<String> {
        let output = Command::new("git")
            .args(["branch", "--show-current"])
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| CoreError::Git(format!("Failed to get branch: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::Git(format!("git branch failed: {}", stderr)));
        }

        let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if branch.is_empty() {
            return Err(CoreError::Git("No branch found".to_string()));
        }

        Ok(branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo(path: &Path) {
        Command::new("git")
            .args(["init", "--initial-branch", "main"])
            .current_dir(path)
            .output()
            .unwrap();
        std::fs::write(path.join("README.md"), "seed").unwrap();
        Command::new("git")
            .args(["add", "."])
            .current_dir(path)
            .output()
            .unwrap();
        Command::new("git")
            .args([
                "-c",
                "user.email=test@test",
                "-c",
                "user.name=test",
                "commit",
                "-m",
                "seed",
            ])
            .current_dir(path)
            .output()
            .unwrap();
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let resolver = WorkspaceResolver::new("/srv/projects");
        let key = WorkspaceKey::new(7, Some("main")).unwrap();

        let a = resolver.resolve(&key);
        let b = resolver.resolve(&key);
        assert_eq!(a, b);
        assert_eq!(
            a,
            PathBuf::from("/srv/projects/project-7/sessions/main")
        );
    }

    #[test]
    fn test_resolve_default_branch_path() {
        let resolver = WorkspaceResolver::new("/srv/projects");
        let key = WorkspaceKey::default_branch(7);
        assert_eq!(resolver.resolve(&key), PathBuf::from("/srv/projects/project-7"));
    }

    #[test]
    fn test_session_id_traversal_rejected() {
        assert!(WorkspaceKey::new(1, Some("..")).is_err());
        assert!(WorkspaceKey::new(1, Some("a/b")).is_err());
        assert!(WorkspaceKey::new(1, Some("a\\b")).is_err());
        assert!(WorkspaceKey::new(1, Some("")).is_err());
        assert!(WorkspaceKey::new(1, Some("feature-login")).is_ok());
    }

    #[test]
    fn test_validate_missing_workspace() {
        let temp = TempDir::new().unwrap();
        let resolver = WorkspaceResolver::new(temp.path());
        let key = WorkspaceKey::new(1, Some("nope")).unwrap();
        assert!(!resolver.validate(&key));
    }

    #[test]
    fn test_validate_plain_directory_is_not_a_workspace() {
        let temp = TempDir::new().unwrap();
        let resolver = WorkspaceResolver::new(temp.path());
        let key = WorkspaceKey::default_branch(3);
        std::fs::create_dir_all(resolver.resolve(&key)).unwrap();
        assert!(!resolver.validate(&key));
    }

    #[test]
    fn test_validate_initialized_workspace() {
        if !RepoProbe::is_git_available() {
            println!("Git not available, skipping test");
            return;
        }

        let temp = TempDir::new().unwrap();
        let resolver = WorkspaceResolver::new(temp.path());
        let key = WorkspaceKey::default_branch(3);
        let path = resolver.resolve(&key);
        std::fs::create_dir_all(&path).unwrap();
        init_repo(&path);

        assert!(resolver.validate(&key));
        assert_eq!(resolver.default_branch(3).as_deref(), Some("main"));
    }

    #[test]
    fn test_session_slug() {
        let key = WorkspaceKey::new(1, Some("Fix Login_v2")).unwrap();
        assert_eq!(key.session_slug().as_deref(), Some("fix-login-v2"));
    }
}
