//! Daemon configuration.
//!
//! Configuration is a TOML file; `rpc` and `storage` are mandatory in the
//! root file. Additional files can be pulled in through `include` directives
//! (a file, or a directory whose `*.toml` entries are read in name order).
//! Included files may contribute extra `access.allow` rules and may override
//! the `rpc` and `storage` sections.

use confd_protocol::DEFAULT_SOCKET_PATH;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file '{0}': {1}")]
    Parse(PathBuf, String),

    #[error("configuration validation failed: {0}")]
    Validation(String),

    #[error("config file '{0}' included more than once")]
    IncludeCycle(PathBuf),
}

/// Fully loaded daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub rpc: RpcConfig,
    pub storage: StorageConfig,
    pub access: AccessConfig,
}

/// RPC listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Filesystem path of the listening socket.
    pub listen: PathBuf,
    /// Socket permission bits; only the lower nine are honored.
    pub umode: Option<u32>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            listen: PathBuf::from(DEFAULT_SOCKET_PATH),
            umode: None,
        }
    }
}

impl RpcConfig {
    /// Effective socket permission bits.
    pub fn socket_mode(&self) -> u32 {
        self.umode.map(|mode| mode & 0o777).unwrap_or(0o777)
    }
}

/// Backing store location. `dir` must already exist; the database file is
/// created inside it on first open.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub db: String,
}

impl StorageConfig {
    /// Full path of the backing database file.
    pub fn db_path(&self) -> PathBuf {
        self.dir.join(&self.db)
    }
}

/// Access control settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub allow: Vec<AllowEntry>,
}

/// One allow-list rule: who (user and/or group) may touch which key paths.
#[derive(Debug, Clone, Deserialize)]
pub struct AllowEntry {
    #[serde(default)]
    pub user: Option<IdentSpec>,
    #[serde(default)]
    pub group: Option<IdentSpec>,
    pub paths: Vec<String>,
}

/// A user or group reference: numeric id, or a name resolved at load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdentSpec {
    Id(u32),
    Name(String),
}

/// On-disk shape of a single config file. Sections are optional here;
/// presence requirements depend on whether the file is the root.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    rpc: Option<RpcConfig>,
    storage: Option<StorageConfig>,
    access: Option<AccessConfig>,
    include: Vec<IncludeDirective>,
}

#[derive(Debug, Deserialize)]
struct IncludeDirective {
    path: PathBuf,
}

impl Config {
    /// Loads and validates the configuration rooted at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut loader = Loader::default();
        loader.read(path.as_ref(), true)?;

        let config = Config {
            rpc: loader
                .rpc
                .ok_or_else(|| ConfigError::Validation("missing `rpc` section".into()))?,
            storage: loader
                .storage
                .ok_or_else(|| ConfigError::Validation("missing `storage` section".into()))?,
            access: loader.access,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.listen.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "invalid `rpc.listen` (expected socket path)".into(),
            ));
        }
        if !self.storage.dir.is_dir() {
            return Err(ConfigError::Validation(format!(
                "invalid storage directory '{}'",
                self.storage.dir.display()
            )));
        }
        if self.storage.db.is_empty() {
            return Err(ConfigError::Validation(
                "invalid `storage.db` (expected file name)".into(),
            ));
        }

        for (index, entry) in self.access.allow.iter().enumerate() {
            if entry.user.is_none() && entry.group.is_none() {
                return Err(ConfigError::Validation(format!(
                    "access.allow[{index}]: neither user nor group specified"
                )));
            }
            if entry.paths.is_empty() || entry.paths.iter().any(|p| p.is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "access.allow[{index}]: invalid `paths` (expected non-empty strings)"
                )));
            }
        }
        Ok(())
    }
}

/// Walks the root file and its includes, merging as it goes.
#[derive(Default)]
struct Loader {
    seen: HashSet<PathBuf>,
    rpc: Option<RpcConfig>,
    storage: Option<StorageConfig>,
    access: AccessConfig,
}

impl Loader {
    fn read(&mut self, path: &Path, is_root: bool) -> Result<(), ConfigError> {
        let canonical = path
            .canonicalize()
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        if !self.seen.insert(canonical.clone()) {
            return Err(ConfigError::IncludeCycle(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(&canonical)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let raw: RawConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;

        match raw.rpc {
            Some(rpc) => self.rpc = Some(rpc),
            None if is_root => {
                return Err(ConfigError::Validation("missing `rpc` section".into()))
            }
            None => {}
        }
        match raw.storage {
            Some(storage) => self.storage = Some(storage),
            None if is_root => {
                return Err(ConfigError::Validation("missing `storage` section".into()))
            }
            None => {}
        }
        if let Some(access) = raw.access {
            self.access.allow.extend(access.allow);
        }

        for directive in raw.include {
            self.include(&directive.path)?;
        }
        Ok(())
    }

    fn include(&mut self, path: &Path) -> Result<(), ConfigError> {
        if path.is_dir() {
            let mut files = Vec::new();
            let entries =
                std::fs::read_dir(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
            for entry in entries {
                let entry = entry.map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
                let entry_path = entry.path();
                if entry_path.is_file() && entry_path.extension().is_some_and(|e| e == "toml") {
                    files.push(entry_path);
                }
            }
            files.sort();
            for file in files {
                tracing::debug!(path = %file.display(), "including config file");
                self.read(&file, false)?;
            }
            Ok(())
        } else {
            tracing::debug!(path = %path.display(), "including config file");
            self.read(path, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn minimal(dir: &TempDir) -> String {
        format!(
            "[rpc]\nlisten = \"/tmp/test.sock\"\n\n[storage]\ndir = \"{}\"\ndb = \"config.db\"\n",
            dir.path().display()
        )
    }

    #[test]
    fn test_minimal_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "confd.toml", &minimal(&dir));

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.rpc.listen, PathBuf::from("/tmp/test.sock"));
        assert_eq!(config.rpc.socket_mode(), 0o777);
        assert_eq!(config.storage.db_path(), dir.path().join("config.db"));
        assert!(config.access.allow.is_empty());
    }

    #[test]
    fn test_umode_masked() {
        let dir = TempDir::new().unwrap();
        let content = format!(
            "[rpc]\nlisten = \"/tmp/test.sock\"\numode = 0o1770\n\n\
             [storage]\ndir = \"{}\"\ndb = \"config.db\"\n",
            dir.path().display()
        );
        let path = write_config(&dir, "confd.toml", &content);

        let config = Config::from_file(&path).unwrap();
        // Only the lower nine permission bits are honored.
        assert_eq!(config.rpc.socket_mode(), 0o770);
    }

    #[test]
    fn test_missing_rpc_section() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "confd.toml",
            &format!("[storage]\ndir = \"{}\"\ndb = \"x.db\"\n", dir.path().display()),
        );
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_storage_dir_must_exist() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "confd.toml",
            "[rpc]\nlisten = \"/tmp/test.sock\"\n[storage]\ndir = \"/nonexistent/confd\"\ndb = \"x.db\"\n",
        );
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_access_rules() {
        let dir = TempDir::new().unwrap();
        let content = format!(
            "{}\n[[access.allow]]\nuser = 1000\npaths = [\"net.*\"]\n\n\
             [[access.allow]]\ngroup = \"wheel\"\npaths = [\"sys.version\", \"sys.build.*\"]\n",
            minimal(&dir)
        );
        let path = write_config(&dir, "confd.toml", &content);

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.access.allow.len(), 2);
        assert!(matches!(
            config.access.allow[0].user,
            Some(IdentSpec::Id(1000))
        ));
        assert!(matches!(
            config.access.allow[1].group,
            Some(IdentSpec::Name(ref n)) if n == "wheel"
        ));
    }

    #[test]
    fn test_rule_without_identity_rejected() {
        let dir = TempDir::new().unwrap();
        let content = format!("{}\n[[access.allow]]\npaths = [\"a.*\"]\n", minimal(&dir));
        let path = write_config(&dir, "confd.toml", &content);
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_include_file_merges_rules() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "extra.toml",
            "[[access.allow]]\nuser = 7\npaths = [\"x.*\"]\n",
        );
        let content = format!(
            "{}\n[[access.allow]]\nuser = 1\npaths = [\"a\"]\n\n[[include]]\npath = \"{}\"\n",
            minimal(&dir),
            dir.path().join("extra.toml").display()
        );
        let path = write_config(&dir, "confd.toml", &content);

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.access.allow.len(), 2);
    }

    #[test]
    fn test_include_directory() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("conf.d");
        fs::create_dir(&sub).unwrap();
        fs::write(
            sub.join("10-a.toml"),
            "[[access.allow]]\nuser = 1\npaths = [\"a\"]\n",
        )
        .unwrap();
        fs::write(
            sub.join("20-b.toml"),
            "[[access.allow]]\nuser = 2\npaths = [\"b\"]\n",
        )
        .unwrap();
        fs::write(sub.join("ignored.conf"), "not toml").unwrap();

        let content = format!(
            "{}\n[[include]]\npath = \"{}\"\n",
            minimal(&dir),
            sub.display()
        );
        let path = write_config(&dir, "confd.toml", &content);

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.access.allow.len(), 2);
        assert!(matches!(
            config.access.allow[0].user,
            Some(IdentSpec::Id(1))
        ));
    }

    #[test]
    fn test_include_cycle_detected() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("confd.toml");
        let content = format!(
            "{}\n[[include]]\npath = \"{}\"\n",
            minimal(&dir),
            root.display()
        );
        fs::write(&root, content).unwrap();

        assert!(matches!(
            Config::from_file(&root),
            Err(ConfigError::IncludeCycle(_))
        ));
    }
}
