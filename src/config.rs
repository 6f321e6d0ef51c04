//! Configuration loading for `package_list.yml`, `package_manager.yml` and
//! `credentials.yml`.
//!
//! Every file is plain YAML deserialized with `serde`; missing optional keys
//! fall back to their defaults.
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{
    error::{Result, UpdaterError},
    updates::{packages::VersionRequirement, version::BumpType},
};

/// Default package list consumed by `consolidate`.
pub const DEFAULT_PACKAGE_LIST_FILE: &str = "package_list.yml";
/// Default bulk update description consumed by `update`.
pub const DEFAULT_UPDATE_CONFIG_FILE: &str = "package_manager.yml";
/// Default credentials file.
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.yml";
/// Default owner of every package repository.
pub const DEFAULT_OWNER: &str = "fivetran";
/// Default git host.
pub const DEFAULT_HOST: &str = "github.com";
/// Directory holding the files copied in by `files-to-add`.
pub const DEFAULT_FILES_TO_ADD_DIR: &str = "files_to_add";
/// Environment variable consulted when `credentials.yml` has no token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

fn default_owner() -> String {
    DEFAULT_OWNER.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

/// Reads and deserializes a YAML file, reporting a missing file distinctly
/// from a malformed one.
pub fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(UpdaterError::MissingConfigFile(path.to_path_buf()));
    }

    debug!("loading configuration from {}", path.display());
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Packages to consolidate (`package_list.yml`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PackageList {
    /// Owner (user or organization) of every listed repository.
    pub owner: String,
    /// Git host serving the repositories.
    pub host: String,
    /// Transform package identifiers, with or without the `dbt_` prefix.
    pub repositories: Vec<String>,
}

impl Default for PackageList {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            host: default_host(),
            repositories: vec![],
        }
    }
}

impl PackageList {
    pub fn load(path: &Path) -> Result<Self> {
        load_yaml(path)
    }
}

/// One `find-and-replace` entry of `package_manager.yml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct FindAndReplace {
    #[serde(alias = "file_paths")]
    pub file_paths: Vec<PathBuf>,
    pub find: String,
    pub replace: String,
}

/// One `files-to-add-to` entry of `package_manager.yml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct AddToFile {
    #[serde(alias = "file_paths")]
    pub file_paths: Vec<PathBuf>,
    /// Prepend instead of append.
    #[serde(alias = "insert_at_top")]
    pub insert_at_top: bool,
    #[serde(alias = "new_line")]
    pub new_line: String,
}

/// Bulk update applied to every listed repository (`package_manager.yml`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct UpdateConfig {
    pub owner: String,
    pub host: String,
    pub repositories: Vec<String>,
    /// Working branch; derived per run when absent.
    pub branch_name: Option<String>,
    pub commit_message: Option<String>,
    /// Bump the package version in `dbt_project.yml` files.
    pub version_bump_type: Option<BumpType>,
    /// Requirement pinned for `fivetran/fivetran_utils` in `packages.yml`.
    pub fivetran_utils_version: Option<VersionRequirement>,
    /// Bump released by the upstream source packages. Minor and major
    /// bumps shift the `fivetran/*` ranges in `packages.yml`.
    pub source_bump_type: Option<BumpType>,
    pub files_to_remove: Vec<PathBuf>,
    pub files_to_add: Vec<PathBuf>,
    /// Local directory `files_to_add` paths are relative to.
    pub files_to_add_directory: PathBuf,
    pub find_and_replace: Vec<FindAndReplace>,
    pub files_to_add_to: Vec<AddToFile>,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            host: default_host(),
            repositories: vec![],
            branch_name: None,
            commit_message: None,
            version_bump_type: None,
            fivetran_utils_version: None,
            source_bump_type: None,
            files_to_remove: vec![],
            files_to_add: vec![],
            files_to_add_directory: PathBuf::from(DEFAULT_FILES_TO_ADD_DIR),
            find_and_replace: vec![],
            files_to_add_to: vec![],
        }
    }
}

impl UpdateConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_yaml(path)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCredentials {
    username: String,
    access_token: String,
}

/// Git credentials (`credentials.yml`).
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub token: SecretString,
}

impl Credentials {
    /// Loads `credentials.yml`, falling back to `GITHUB_TOKEN` when the file
    /// carries no token.
    pub fn load(path: &Path) -> Result<Self> {
        let raw: RawCredentials = load_yaml(path)?;
        Self::resolve(raw.username, raw.access_token, env::var(TOKEN_ENV_VAR).ok())
    }

    fn resolve(
        username: String,
        token: String,
        env_token: Option<String>,
    ) -> Result<Self> {
        let token = if token.is_empty() {
            env_token.unwrap_or_default()
        } else {
            token
        };

        if token.is_empty() {
            return Err(UpdaterError::invalid_config(format!(
                "no access token in credentials and {TOKEN_ENV_VAR} is not set"
            )));
        }

        if username.is_empty() {
            warn!("credentials have no username, authentication may fail");
        }

        Ok(Self {
            username,
            token: SecretString::from(token),
        })
    }
}

/// Everything the git client needs to reach a repository.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Remote host (e.g., "github.com").
    pub host: String,
    /// URL scheme (http or https).
    pub scheme: String,
    /// Repository owner.
    pub owner: String,
    /// User name sent with the access token.
    pub username: String,
    /// Access token for authentication.
    pub token: SecretString,
    /// Clone depth; 0 clones the full history.
    pub clone_depth: u32,
}

impl RemoteConfig {
    pub fn new(
        host: &str,
        owner: &str,
        credentials: &Credentials,
        clone_depth: u32,
    ) -> Self {
        Self {
            host: host.to_string(),
            scheme: "https".to_string(),
            owner: owner.to_string(),
            username: credentials.username.clone(),
            token: SecretString::from(
                credentials.token.expose_secret().to_string(),
            ),
            clone_depth,
        }
    }
}
