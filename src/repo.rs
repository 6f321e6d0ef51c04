//! Git operations used to publish package updates.
//!
//! The orchestrator only talks to the [`VersionControl`] trait so tests can
//! substitute a mock. [`GitClient`] is the `git2` implementation: it clones
//! over HTTPS with username/token credentials, creates and switches to a
//! working branch, stages and commits everything, and force pushes the
//! branch back to the remote.
//!
//! # Usage
//!
//! ```rust,ignore
//! let git = GitClient::new(remote_config);
//! git.clone_repo("dbt_jira", Path::new("tmp/jira/dbt_jira"))?;
//! git.create_branch(Path::new("tmp/jira/dbt_jira"), "consolidate-source")?;
//! // Make changes...
//! git.commit_all(Path::new("tmp/jira/dbt_jira"), "Consolidate dbt source")?;
//! git.push_branch(Path::new("tmp/jira/dbt_jira"), "consolidate-source")?;
//! ```
use git2::RemoteCallbacks;
use log::*;
use secrecy::ExposeSecret;
use std::path::Path;
use url::Url;

use crate::{
    config::RemoteConfig,
    error::{Result, UpdaterError},
};

/// Name of the remote created by cloning.
const DEFAULT_REMOTE: &str = "origin";

/// Version-control collaborator used by the orchestrator.
#[cfg_attr(test, mockall::automock)]
pub trait VersionControl {
    /// Clone `repo` from the configured owner into `dest`.
    fn clone_repo(&self, repo: &str, dest: &Path) -> Result<()>;
    /// Create `branch` from HEAD (replacing any existing local branch of the
    /// same name) and check it out.
    fn create_branch(&self, repo_path: &Path, branch: &str) -> Result<()>;
    /// Stage every addition, modification and deletion and commit it.
    fn commit_all(&self, repo_path: &Path, message: &str) -> Result<()>;
    /// Force push `branch` to the remote.
    fn push_branch(&self, repo_path: &Path, branch: &str) -> Result<()>;
}

/// Create Git authentication callbacks for username/token authentication.
///
/// The token is passed as plaintext, which is appropriate for HTTPS
/// connections where the transport layer provides encryption. It must not
/// be logged.
fn get_auth_callbacks<'r>(user: String, token: String) -> RemoteCallbacks<'r> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username, _allowed| {
        git2::Cred::userpass_plaintext(&user, &token)
    });
    callbacks
}

/// `git2`-backed [`VersionControl`].
pub struct GitClient {
    config: RemoteConfig,
}

impl GitClient {
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }

    /// HTTPS clone URL for `repo`; credentials are supplied through
    /// callbacks rather than embedded in the URL.
    pub fn repo_url(&self, repo: &str) -> Result<Url> {
        let url = format!(
            "{}://{}/{}/{}.git",
            self.config.scheme, self.config.host, self.config.owner, repo
        );
        Ok(Url::parse(&url)?)
    }

    /// Shallow clone depth for `git2`, `None` for a full clone.
    fn fetch_depth(&self) -> Result<Option<i32>> {
        match self.config.clone_depth {
            0 => Ok(None),
            depth => i32::try_from(depth).map(Some).map_err(|_| {
                UpdaterError::invalid_config(format!(
                    "clone depth {depth} exceeds {}",
                    i32::MAX
                ))
            }),
        }
    }

    fn callbacks<'r>(&self) -> RemoteCallbacks<'r> {
        get_auth_callbacks(
            self.config.username.clone(),
            self.config.token.expose_secret().to_string(),
        )
    }
}

impl VersionControl for GitClient {
    fn clone_repo(&self, repo: &str, dest: &Path) -> Result<()> {
        let url = self.repo_url(repo)?;
        info!("cloning {url} into {}", dest.display());

        let mut fetch_options = git2::FetchOptions::new();
        if let Some(depth) = self.fetch_depth()? {
            fetch_options.depth(depth);
        }
        fetch_options.remote_callbacks(self.callbacks());

        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_options).clone(url.as_str(), dest)?;

        Ok(())
    }

    fn create_branch(&self, repo_path: &Path, branch: &str) -> Result<()> {
        let repo = git2::Repository::open(repo_path)?;

        info!("creating branch: {branch}");
        let head = repo.head()?;
        let commit = head.peel_to_commit()?;
        repo.branch(branch, &commit, true)?;

        info!("switching to branch: {branch}");
        let ref_name = format!("refs/heads/{}", branch);
        let target_obj = repo.revparse_single(&ref_name)?;
        repo.checkout_tree(&target_obj, None)?;
        repo.set_head(&ref_name)?;

        Ok(())
    }

    fn commit_all(&self, repo_path: &Path, message: &str) -> Result<()> {
        let repo = git2::Repository::open(repo_path)?;

        debug!("adding changed files to index");
        let mut index = repo.index()?;
        index.add_all(["."], git2::IndexAddOption::DEFAULT, None)?;
        // stage deletions as well, like `git add --all`
        index.update_all(["."], None)?;
        index.write()?;

        debug!("committing changes with msg: {message}");
        let config = repo.config()?.snapshot()?;
        let user = config.get_str("user.name")?;
        let email = config.get_str("user.email")?;
        debug!("using committer: user: {user}, email: {email}");

        let oid = index.write_tree()?;
        let tree = repo.find_tree(oid)?;
        let parent_commit = repo.head()?.peel_to_commit()?;
        let committer = git2::Signature::now(user, email)?;
        repo.commit(
            Some("HEAD"),
            &committer,
            &committer,
            message,
            &tree,
            &[&parent_commit],
        )?;

        Ok(())
    }

    fn push_branch(&self, repo_path: &Path, branch: &str) -> Result<()> {
        let repo = git2::Repository::open(repo_path)?;

        info!("pushing branch {branch}");
        let mut push_opts = git2::PushOptions::default();
        push_opts.remote_callbacks(self.callbacks());

        let mut remote = repo.find_remote(DEFAULT_REMOTE)?;

        // + indicates "force" push
        let ref_spec = format!("+refs/heads/{branch}:refs/heads/{branch}");
        remote.push(&[ref_spec], Some(&mut push_opts))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::fs;
    use tempfile::TempDir;

    fn test_config() -> RemoteConfig {
        RemoteConfig {
            host: "github.com".into(),
            scheme: "https".into(),
            owner: "fivetran".into(),
            username: "octocat".into(),
            token: SecretString::from("secret-token".to_string()),
            clone_depth: 0,
        }
    }

    /// Initializes a repository with one commit and a committer identity.
    fn init_repo(path: &Path) -> git2::Repository {
        let repo = git2::Repository::init(path).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }
        fs::write(path.join("README.md"), "# package\n").unwrap();
        {
            let mut index = repo.index().unwrap();
            index.add_path(Path::new("README.md")).unwrap();
            index.write().unwrap();
            let tree_id = index.write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            let sig = git2::Signature::now("Test User", "test@example.com")
                .unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
                .unwrap();
        }
        repo
    }

    #[test]
    fn builds_clone_url_without_credentials() {
        let client = GitClient::new(test_config());
        let url = client.repo_url("dbt_jira").unwrap();
        assert_eq!(url.as_str(), "https://github.com/fivetran/dbt_jira.git");
        assert!(!url.as_str().contains("secret-token"));
    }

    #[test]
    fn clone_depth_must_fit_git_depth() {
        let client = GitClient::new(test_config());
        assert_eq!(client.fetch_depth().unwrap(), None);

        let client = GitClient::new(RemoteConfig {
            clone_depth: 1,
            ..test_config()
        });
        assert_eq!(client.fetch_depth().unwrap(), Some(1));

        let client = GitClient::new(RemoteConfig {
            clone_depth: u32::MAX,
            ..test_config()
        });
        let err = client.fetch_depth().unwrap_err();
        assert!(matches!(err, UpdaterError::InvalidConfig(_)));

        let tmp = TempDir::new().unwrap();
        assert!(client.clone_repo("dbt_jira", &tmp.path().join("dbt_jira")).is_err());
        assert!(!tmp.path().join("dbt_jira").exists());
    }

    #[test]
    fn creates_and_switches_to_branch() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(tmp.path());
        let client = GitClient::new(test_config());

        client
            .create_branch(tmp.path(), "consolidate-source/test")
            .unwrap();

        let head = repo.head().unwrap();
        assert_eq!(head.name(), Some("refs/heads/consolidate-source/test"));
    }

    #[test]
    fn commits_additions_modifications_and_deletions() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(tmp.path());
        let client = GitClient::new(test_config());
        client.create_branch(tmp.path(), "work").unwrap();

        fs::remove_file(tmp.path().join("README.md")).unwrap();
        fs::create_dir_all(tmp.path().join("models/staging")).unwrap();
        fs::write(tmp.path().join("models/staging/a.sql"), "select 1").unwrap();

        client.commit_all(tmp.path(), "Consolidate").unwrap();

        let commit = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(commit.message(), Some("Consolidate"));
        assert_eq!(commit.author().name(), Some("Test User"));

        let tree = commit.tree().unwrap();
        assert!(tree.get_path(Path::new("models/staging/a.sql")).is_ok());
        assert!(tree.get_path(Path::new("README.md")).is_err());
    }

    #[test]
    fn opening_a_missing_repository_is_a_git_error() {
        let tmp = TempDir::new().unwrap();
        let client = GitClient::new(test_config());

        let err = client.create_branch(tmp.path(), "work").unwrap_err();

        assert!(err.is_version_control());
    }
}
