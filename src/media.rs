//! Media host: where video files and thumbnails live.
//!
//! Two backends exist. [`LocalMediaHost`] keeps objects in a directory and the
//! API streams them back under `/api/v1/media/{object}`. [`RemoteMediaHost`]
//! pushes objects to an HTTP object store that accepts `PUT` and `DELETE` on
//! `{endpoint}/{object}`.
//!
//! Every upload gets its own object: a short blake3 digest of the content, a
//! fresh random id, and the source extension. Identical files uploaded for two
//! videos never share an object, so deleting one video cannot orphan another.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

use crate::ids::EntityId;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedMedia {
    pub url: String,
    /// Playback length in seconds, when the host can tell.
    pub duration: Option<f64>,
}

pub trait MediaHost: Send + Sync {
    /// Stores the file at `local` and returns its public URL. The local file is
    /// left in place; staging cleanup belongs to the caller.
    fn upload(&self, local: &Path) -> Result<UploadedMedia>;

    fn delete(&self, url: &str) -> Result<()>;
}

/// Deletes `url`, logging instead of failing. Used after the primary database
/// write has committed, when a leftover object is the worst outcome.
pub fn delete_best_effort(host: &dyn MediaHost, url: &str) {
    if url.is_empty() {
        return;
    }
    match host.delete(url) {
        Ok(()) => tracing::debug!(url, "deleted media object"),
        Err(err) => tracing::warn!(url, error = format!("{err:#}"), "media deletion failed"),
    }
}

/// Last path segment of a media URL, if it is a safe object name.
pub fn object_name(url: &str) -> Option<&str> {
    let name = url.trim_end_matches('/').rsplit('/').next()?;
    is_safe_object_name(name).then_some(name)
}

pub fn is_safe_object_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
}

const DIGEST_PREFIX_LEN: usize = 16;

/// `{digest prefix}-{random id}.{ext}`, e.g. `ab12…-5f1c….mp4`.
fn unique_object_name(local: &Path) -> Result<String> {
    let mut file =
        File::open(local).with_context(|| format!("opening staged file {}", local.display()))?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("hashing staged file {}", local.display()))?;
    let hash = hasher.finalize().to_hex();
    let stem = format!("{}-{}", &hash.as_str()[..DIGEST_PREFIX_LEN], EntityId::generate());

    let ext = local
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()));
    Ok(match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    })
}

fn join_url(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

#[derive(Debug, Clone)]
pub struct LocalMediaHost {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaHost {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("creating media root {}", root.display()))?;
        Ok(Self {
            root,
            public_base_url: public_base_url.into(),
        })
    }

    /// Path of a stored object, or `None` for names that could escape the root.
    pub fn object_path(&self, name: &str) -> Option<PathBuf> {
        is_safe_object_name(name).then(|| self.root.join(name))
    }
}

impl MediaHost for LocalMediaHost {
    fn upload(&self, local: &Path) -> Result<UploadedMedia> {
        let name = unique_object_name(local)?;
        fs::copy(local, self.root.join(&name))
            .with_context(|| format!("copying {} into media root", local.display()))?;
        Ok(UploadedMedia {
            url: join_url(&self.public_base_url, &name),
            duration: None,
        })
    }

    fn delete(&self, url: &str) -> Result<()> {
        let name = object_name(url).ok_or_else(|| anyhow!("unrecognised media url {url}"))?;
        let path = self.root.join(name);
        fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct RemoteMediaHost {
    endpoint: String,
}

impl RemoteMediaHost {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            bail!("remote media endpoint must be an http(s) URL, got {endpoint}");
        }
        Ok(Self { endpoint })
    }

    fn object_url(&self, name: &str) -> String {
        join_url(&self.endpoint, name)
    }
}

impl MediaHost for RemoteMediaHost {
    fn upload(&self, local: &Path) -> Result<UploadedMedia> {
        let name = unique_object_name(local)?;
        let mut bytes = Vec::new();
        File::open(local)
            .and_then(|mut file| file.read_to_end(&mut bytes))
            .with_context(|| format!("reading staged file {}", local.display()))?;

        let url = self.object_url(&name);
        let content_type = mime_guess::from_path(local)
            .first_or_octet_stream()
            .to_string();
        ureq::put(&url)
            .set("Content-Type", &content_type)
            .send_bytes(&bytes)
            .with_context(|| format!("uploading {name} to media host"))?;

        Ok(UploadedMedia {
            url,
            duration: None,
        })
    }

    fn delete(&self, url: &str) -> Result<()> {
        let name = object_name(url).ok_or_else(|| anyhow!("unrecognised media url {url}"))?;
        ureq::delete(&self.object_url(name))
            .call()
            .with_context(|| format!("deleting {name} from media host"))?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, tempdir};

    fn staged(contents: &[u8], suffix: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn object_names_reject_traversal() {
        assert_eq!(object_name("/api/v1/media/abc.mp4"), Some("abc.mp4"));
        assert_eq!(object_name("https://cdn.test/x/y/clip.PNG"), Some("clip.PNG"));
        assert_eq!(object_name("/api/v1/media/.."), None);
        assert_eq!(object_name(""), None);
        assert!(!is_safe_object_name("a/b"));
        assert!(!is_safe_object_name(".hidden"));
    }

    #[test]
    fn identical_uploads_get_distinct_objects() {
        let dir = tempdir().unwrap();
        let host = LocalMediaHost::new(dir.path().join("media"), "/api/v1/media").unwrap();
        let first = host.upload(staged(b"frames", ".MP4").path()).unwrap();
        let second = host.upload(staged(b"frames", ".mp4").path()).unwrap();
        assert_ne!(first.url, second.url);
        assert!(first.url.starts_with("/api/v1/media/"));
        assert!(first.url.ends_with(".mp4"));

        let first_path = host.object_path(object_name(&first.url).unwrap()).unwrap();
        let second_path = host.object_path(object_name(&second.url).unwrap()).unwrap();
        assert_eq!(fs::read(&first_path).unwrap(), b"frames");

        host.delete(&first.url).unwrap();
        assert!(!first_path.exists());
        assert_eq!(fs::read(&second_path).unwrap(), b"frames");
    }

    #[test]
    fn local_delete_removes_object_and_reports_missing() {
        let dir = tempdir().unwrap();
        let host = LocalMediaHost::new(dir.path(), "/media").unwrap();
        let uploaded = host.upload(staged(b"thumb", ".png").path()).unwrap();
        host.delete(&uploaded.url).unwrap();
        assert!(host.delete(&uploaded.url).is_err());
    }

    #[test]
    fn best_effort_delete_swallows_failures() {
        let host = testing::RecordingHost {
            fail_deletes: true,
            ..Default::default()
        };
        delete_best_effort(&host, "https://media.test/1.bin");
        delete_best_effort(&host, "");
        assert_eq!(host.deletes.lock().len(), 1);
    }

    #[test]
    fn remote_host_requires_http_endpoint() {
        assert!(RemoteMediaHost::new("ftp://store").is_err());
        let host = RemoteMediaHost::new("https://objects.test/bucket/").unwrap();
        assert_eq!(
            host.object_url("a.mp4"),
            "https://objects.test/bucket/a.mp4"
        );
    }
}
