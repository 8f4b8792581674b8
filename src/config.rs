use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::views::DEFAULT_MAX_LIMIT;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/vidshare.toml";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_DATABASE_PATH: &str = "/var/lib/vidshare/vidshare.db";
pub const DEFAULT_MEDIA_ROOT: &str = "/var/lib/vidshare/media";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "/api/v1/media";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 512;

/// Config file as written on disk. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub json_logs: Option<bool>,
    #[serde(default)]
    pub media: MediaSection,
    #[serde(default)]
    pub pagination: PaginationSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaSection {
    pub backend: Option<MediaBackend>,
    pub root: Option<PathBuf>,
    pub public_base_url: Option<String>,
    pub remote_endpoint: Option<String>,
    pub max_upload_mb: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationSection {
    pub max_limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    #[default]
    Local,
    Remote,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaConfig {
    Local {
        root: PathBuf,
        public_base_url: String,
    },
    Remote {
        endpoint: String,
    },
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub media: MediaConfig,
    pub max_upload_bytes: usize,
    pub max_limit: u32,
    pub json_logs: bool,
}

pub fn read_file_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let cfg = toml::from_str(&content).with_context(|| format!("Parsing {}", path.display()))?;
    Ok(Some(cfg))
}

/// Resolves the effective configuration: CLI overrides, then the file, then
/// built-in defaults. A missing file is fine; a malformed one is not.
pub fn load_runtime_config_from(
    path: impl AsRef<Path>,
    overrides: Overrides,
) -> Result<RuntimeConfig> {
    let path = path.as_ref();
    let cfg = read_file_config(path)?.unwrap_or_default();

    let host = overrides
        .host
        .or(cfg.host)
        .filter(|host| !host.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = overrides.port.or(cfg.port).unwrap_or(DEFAULT_PORT);
    let database_path = overrides
        .database_path
        .or(cfg.database_path)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

    let media = match cfg.media.backend.unwrap_or_default() {
        MediaBackend::Local => MediaConfig::Local {
            root: cfg
                .media
                .root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_ROOT)),
            public_base_url: cfg
                .media
                .public_base_url
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
        },
        MediaBackend::Remote => MediaConfig::Remote {
            endpoint: cfg.media.remote_endpoint.ok_or_else(|| {
                anyhow!(
                    "media.remote_endpoint must be set in {} when media.backend = \"remote\"",
                    path.display()
                )
            })?,
        },
    };

    let max_upload_mb = cfg.media.max_upload_mb.unwrap_or(DEFAULT_MAX_UPLOAD_MB);
    if max_upload_mb == 0 {
        bail!("media.max_upload_mb must be positive in {}", path.display());
    }
    let max_limit = cfg.pagination.max_limit.unwrap_or(DEFAULT_MAX_LIMIT);
    if max_limit == 0 {
        bail!("pagination.max_limit must be positive in {}", path.display());
    }

    Ok(RuntimeConfig {
        host,
        port,
        database_path,
        media,
        max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
        max_limit,
        json_logs: overrides.json_logs || cfg.json_logs.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let runtime =
            load_runtime_config_from(dir.path().join("absent.toml"), Overrides::default())
                .unwrap();
        assert_eq!(runtime.host, DEFAULT_HOST);
        assert_eq!(runtime.port, DEFAULT_PORT);
        assert_eq!(runtime.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(runtime.max_limit, DEFAULT_MAX_LIMIT);
        assert_eq!(runtime.max_upload_bytes, DEFAULT_MAX_UPLOAD_MB * 1024 * 1024);
        assert!(!runtime.json_logs);
        assert_eq!(
            runtime.media,
            MediaConfig::Local {
                root: PathBuf::from(DEFAULT_MEDIA_ROOT),
                public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            }
        );
    }

    #[test]
    fn file_values_are_read() {
        let cfg = make_config(
            "port = 4242\ndatabase_path = \"/srv/db.sqlite\"\njson_logs = true\n\
             [media]\nroot = \"/srv/media\"\nmax_upload_mb = 8\n\
             [pagination]\nmax_limit = 25\n",
        );
        let runtime = load_runtime_config_from(cfg.path(), Overrides::default()).unwrap();
        assert_eq!(runtime.port, 4242);
        assert_eq!(runtime.database_path, PathBuf::from("/srv/db.sqlite"));
        assert!(runtime.json_logs);
        assert_eq!(runtime.max_limit, 25);
        assert_eq!(runtime.max_upload_bytes, 8 * 1024 * 1024);
        assert!(matches!(
            runtime.media,
            MediaConfig::Local { ref root, .. } if root == Path::new("/srv/media")
        ));
    }

    #[test]
    fn overrides_win_over_file() {
        let cfg = make_config("host = \"0.0.0.0\"\nport = 4242\n");
        let overrides = Overrides {
            host: Some("10.0.0.5".into()),
            port: Some(9000),
            database_path: Some(PathBuf::from("/tmp/x.db")),
            json_logs: true,
        };
        let runtime = load_runtime_config_from(cfg.path(), overrides).unwrap();
        assert_eq!(runtime.host, "10.0.0.5");
        assert_eq!(runtime.port, 9000);
        assert_eq!(runtime.database_path, PathBuf::from("/tmp/x.db"));
        assert!(runtime.json_logs);
    }

    #[test]
    fn remote_backend_requires_endpoint() {
        let cfg = make_config("[media]\nbackend = \"remote\"\n");
        assert!(load_runtime_config_from(cfg.path(), Overrides::default()).is_err());

        let cfg = make_config(
            "[media]\nbackend = \"remote\"\nremote_endpoint = \"https://objects.test/b\"\n",
        );
        let runtime = load_runtime_config_from(cfg.path(), Overrides::default()).unwrap();
        assert_eq!(
            runtime.media,
            MediaConfig::Remote {
                endpoint: "https://objects.test/b".into()
            }
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let cfg = make_config("port = \"not a number\"\n");
        assert!(load_runtime_config_from(cfg.path(), Overrides::default()).is_err());
        let cfg = make_config("unknown_key = 1\n");
        assert!(read_file_config(cfg.path()).is_err());
        let cfg = make_config("[pagination]\nmax_limit = 0\n");
        assert!(load_runtime_config_from(cfg.path(), Overrides::default()).is_err());
    }
}
