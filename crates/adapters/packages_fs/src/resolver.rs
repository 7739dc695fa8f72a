//! Filesystem implementation of [`PackageResolver`].

use std::io;
use std::path::{Path, PathBuf};

use homecore_app::ports::{PackageError, PackageResolver};
use homecore_domain::definition::{CodeUnit, PackageRef};

use crate::version;

/// Name of the script file inside a package version directory.
pub const SCRIPT_FILE: &str = "script.lua";

/// Resolves packages below a root directory.
#[derive(Debug, Clone)]
pub struct FsPackageResolver {
    root: PathBuf,
}

impl FsPackageResolver {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn latest_version(&self, package: &PackageRef) -> Result<String, PackageError> {
        let mut entries = match tokio::fs::read_dir(self.root.join(&package.id)).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PackageError::NotFound(package.clone()));
            }
            Err(err) => return Err(unreadable(package, err)),
        };

        let mut latest: Option<String> = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| unreadable(package, err))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|err| unreadable(package, err))?
                .is_dir();
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_dir {
                continue;
            }
            let has_script = tokio::fs::metadata(entry.path().join(SCRIPT_FILE))
                .await
                .is_ok_and(|metadata| metadata.is_file());
            if !has_script {
                continue;
            }
            if latest
                .as_deref()
                .is_none_or(|current| version::compare(&name, current).is_gt())
            {
                latest = Some(name);
            }
        }

        latest.ok_or_else(|| PackageError::NotFound(package.clone()))
    }
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

fn unreadable(package: &PackageRef, err: io::Error) -> PackageError {
    PackageError::Unreadable {
        package: package.clone(),
        source: Box::new(err),
    }
}

impl PackageResolver for FsPackageResolver {
    async fn resolve(&self, package: &PackageRef) -> Result<CodeUnit, PackageError> {
        let pinned = package.version.as_deref();
        if !is_plain_segment(&package.id) || pinned.is_some_and(|v| !is_plain_segment(v)) {
            return Err(PackageError::NotFound(package.clone()));
        }

        let version = match pinned {
            Some(version) => version.to_string(),
            None => self.latest_version(package).await?,
        };
        let path = self.root.join(&package.id).join(&version).join(SCRIPT_FILE);

        let source = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PackageError::NotFound(package.clone()));
            }
            Err(err) => return Err(unreadable(package, err)),
        };

        tracing::debug!(package = %package, %version, path = %path.display(), "package resolved");
        Ok(CodeUnit::new(
            PackageRef::new(package.id.clone()).with_version(version),
            source,
        ))
    }
}
