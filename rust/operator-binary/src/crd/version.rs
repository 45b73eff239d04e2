//! Well-known FoundationDB versions and the capabilities they are known to have.
//!
//! Capabilities are looked up by exact version string. A version that is not listed here is
//! a release newer than every listed one and has all capabilities.
//!
//! Releases before [`OLDEST_SUPPORTED`] are not supported and are not listed, so they are
//! treated like newer releases.

/// The version used when a cluster does not ask for a specific one.
pub const DEFAULT: &str = "6.2.20";

/// The first version whose images ship `fdbserver` in the main container.
pub const WITH_BINARIES_FROM_MAIN_CONTAINER: &str = "6.2.20";

/// A version whose binaries have to be copied in by the sidecar.
pub const WITHOUT_BINARIES_FROM_MAIN_CONTAINER: &str = "6.2.11";

/// The oldest release the operator can run.
pub const OLDEST_SUPPORTED: &str = "6.1.8";

/// Releases whose main container image does not bundle the server binaries.
const SIDECAR_BINARY_VERSIONS: &[&str] = &[
    "6.1.8", "6.1.9", "6.1.10", "6.1.11", "6.1.12", "6.1.13", "6.2.0", "6.2.1", "6.2.2", "6.2.3",
    "6.2.4", "6.2.5", "6.2.6", "6.2.7", "6.2.8", "6.2.9", "6.2.10", "6.2.11", "6.2.12", "6.2.13",
    "6.2.14", "6.2.15", "6.2.16", "6.2.17", "6.2.18", "6.2.19",
];

/// Whether the main container of `version` bundles the `fdbserver` binary.
pub fn binaries_from_main_container(version: &str) -> bool {
    !SIDECAR_BINARY_VERSIONS.contains(&version)
}
