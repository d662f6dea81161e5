//! Package storage
//!
//! Package imports such as `#import "@preview/example:0.1.0"` resolve to a
//! directory holding the unpacked package. Directories are searched in this
//! order:
//!
//! 1. the configured package path
//! 2. `<data dir>/typst/packages`
//! 3. `<cache dir>/typst/packages`
//!
//! Each holds `<namespace>/<name>/<version>` trees. Packages in the
//! `preview` namespace that are found nowhere are downloaded from the
//! package registry into the cache directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{debug, info};
use typst::diag::{PackageError, PackageResult};
use typst::syntax::package::PackageSpec;

/// Registry serving `preview` packages
pub const DEFAULT_REGISTRY: &str = "https://packages.typst.org";

/// The only namespace that is downloaded on demand
const DOWNLOAD_NAMESPACE: &str = "preview";

/// Location of packages below the platform data and cache directories
const PACKAGE_SUBDIR: &str = "typst/packages";

/// Where packages are looked up and stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageStorage {
    /// Explicitly configured package directory
    package_path: Option<PathBuf>,
    /// Packages installed by the user
    data_dir: Option<PathBuf>,
    /// Downloaded packages
    cache_dir: Option<PathBuf>,
    /// Whether missing `preview` packages are downloaded
    download: bool,
    registry: String,
}

impl Default for PackageStorage {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PackageStorage {
    /// Storage using the platform directories, downloads enabled
    pub fn new(package_path: Option<PathBuf>) -> Self {
        Self {
            package_path,
            data_dir: dirs::data_dir().map(|dir| dir.join(PACKAGE_SUBDIR)),
            cache_dir: dirs::cache_dir().map(|dir| dir.join(PACKAGE_SUBDIR)),
            download: true,
            registry: DEFAULT_REGISTRY.to_string(),
        }
    }

    /// Storage searching only the given directories
    pub fn with_dirs(
        package_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
        cache_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            package_path,
            data_dir,
            cache_dir,
            ..Self::new(None)
        }
    }

    /// Enable or disable downloads of missing `preview` packages
    pub fn with_downloads(mut self, download: bool) -> Self {
        self.download = download;
        self
    }

    /// Download from another registry
    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into().trim_end_matches('/').to_string();
        self
    }

    /// The configured package path
    pub fn package_path(&self) -> Option<&Path> {
        self.package_path.as_deref()
    }

    /// The directory downloads are unpacked into
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Locate a package, downloading it when allowed
    pub fn prepare(&self, spec: &PackageSpec) -> PackageResult<PathBuf> {
        let subdir = Path::new(spec.namespace.as_str())
            .join(spec.name.as_str())
            .join(spec.version.to_string());

        for base in [&self.package_path, &self.data_dir, &self.cache_dir]
            .into_iter()
            .flatten()
        {
            let dir = base.join(&subdir);
            if dir.is_dir() {
                debug!(package = %spec, dir = %dir.display(), "package found");
                return Ok(dir);
            }
        }

        match &self.cache_dir {
            Some(cache) if self.download && spec.namespace.as_str() == DOWNLOAD_NAMESPACE => {
                let dir = cache.join(&subdir);
                self.download(spec, &dir)?;
                Ok(dir)
            }
            _ => Err(PackageError::NotFound(spec.clone())),
        }
    }

    /// Fetch a package archive and unpack it into `dir`
    fn download(&self, spec: &PackageSpec, dir: &Path) -> PackageResult<()> {
        let url = format!(
            "{}/{}/{}-{}.tar.gz",
            self.registry, DOWNLOAD_NAMESPACE, spec.name, spec.version
        );
        info!(package = %spec, %url, "downloading package");

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(network_failed)?;
        let response = client.get(&url).send().map_err(network_failed)?;
        check_status(spec, response.status())?;
        let data = response.bytes().map_err(network_failed)?;

        unpack(&data, dir)
    }
}

/// Map a registry response status to a package error
fn check_status(spec: &PackageSpec, status: StatusCode) -> PackageResult<()> {
    if status == StatusCode::NOT_FOUND {
        Err(PackageError::NotFound(spec.clone()))
    } else if !status.is_success() {
        Err(PackageError::NetworkFailed(Some(
            format!("registry responded with {status}").into(),
        )))
    } else {
        Ok(())
    }
}

fn network_failed(err: reqwest::Error) -> PackageError {
    PackageError::NetworkFailed(Some(err.to_string().into()))
}

/// Unpack a gzipped tarball, removing `dir` again when the archive is bad
fn unpack(data: &[u8], dir: &Path) -> PackageResult<()> {
    tar::Archive::new(GzDecoder::new(data))
        .unpack(dir)
        .map_err(|err| {
            fs::remove_dir_all(dir).ok();
            PackageError::MalformedArchive(Some(err.to_string().into()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn spec(text: &str) -> PackageSpec {
        text.parse().unwrap()
    }

    fn install(base: &Path, subdir: &str) -> PathBuf {
        let dir = base.join(subdir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn archive(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, text) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(text.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, text.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_lookup_order() {
        let path = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let storage = PackageStorage::with_dirs(
            Some(path.path().to_path_buf()),
            Some(data.path().to_path_buf()),
            Some(cache.path().to_path_buf()),
        )
        .with_downloads(false);

        let cached = install(cache.path(), "preview/chart/1.0.0");
        assert_eq!(storage.prepare(&spec("@preview/chart:1.0.0")).unwrap(), cached);

        let installed = install(data.path(), "preview/chart/1.0.0");
        assert_eq!(storage.prepare(&spec("@preview/chart:1.0.0")).unwrap(), installed);

        let local = install(path.path(), "preview/chart/1.0.0");
        assert_eq!(storage.prepare(&spec("@preview/chart:1.0.0")).unwrap(), local);
    }

    #[test]
    fn test_missing_package_is_not_found() {
        let cache = tempfile::tempdir().unwrap();
        let storage =
            PackageStorage::with_dirs(None, None, Some(cache.path().to_path_buf()));

        // Only `preview` is ever downloaded
        assert!(matches!(
            storage.prepare(&spec("@local/demo:0.1.0")),
            Err(PackageError::NotFound(_))
        ));

        let offline = storage.with_downloads(false);
        assert!(matches!(
            offline.prepare(&spec("@preview/demo:0.1.0")),
            Err(PackageError::NotFound(_))
        ));
        assert!(!cache.path().join("preview").exists());
    }

    #[test]
    fn test_status_mapping() {
        let demo = spec("@preview/demo:0.1.0");
        assert!(check_status(&demo, StatusCode::OK).is_ok());
        assert!(matches!(
            check_status(&demo, StatusCode::NOT_FOUND),
            Err(PackageError::NotFound(found)) if found == demo
        ));
        assert!(matches!(
            check_status(&demo, StatusCode::INTERNAL_SERVER_ERROR),
            Err(PackageError::NetworkFailed(Some(_)))
        ));
    }

    #[test]
    fn test_unpack_archive() {
        let cache = tempfile::tempdir().unwrap();
        let dir = cache.path().join("preview/demo/0.1.0");
        let data = archive(&[
            ("typst.toml", "[package]\nname = \"demo\"\n"),
            ("lib.typ", "#let hello = \"hi\""),
        ]);

        unpack(&data, &dir).unwrap();
        assert_eq!(
            fs::read_to_string(dir.join("lib.typ")).unwrap(),
            "#let hello = \"hi\""
        );
    }

    #[test]
    fn test_malformed_archive_is_removed() {
        let cache = tempfile::tempdir().unwrap();
        let dir = cache.path().join("preview/demo/0.1.0");
        fs::create_dir_all(&dir).unwrap();

        let result = unpack(b"definitely not gzip", &dir);
        assert!(matches!(result, Err(PackageError::MalformedArchive(Some(_)))));
        assert!(!dir.exists());
    }

    #[test]
    fn test_registry_is_normalized() {
        let storage = PackageStorage::default().with_registry("http://localhost:8080/");
        assert_eq!(storage.registry, "http://localhost:8080");
    }
}
