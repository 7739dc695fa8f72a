//! Package resolution port: turns package references into code units.

use std::future::Future;

use homecore_domain::definition::{CodeUnit, PackageRef};
use homecore_domain::error::BoxError;

/// Resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// No package (or no matching version) exists.
    #[error("package `{0}` not found")]
    NotFound(PackageRef),

    /// The package exists but could not be read.
    #[error("failed to read package `{package}`")]
    Unreadable {
        package: PackageRef,
        #[source]
        source: BoxError,
    },
}

/// Supplies the code of adapter and logic packages.
pub trait PackageResolver: Send + Sync {
    /// Resolve `package` to its code unit, picking the latest version when
    /// none is pinned.
    fn resolve(
        &self,
        package: &PackageRef,
    ) -> impl Future<Output = Result<CodeUnit, PackageError>> + Send;
}
