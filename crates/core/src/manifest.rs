//! The asset manifest: paths guaranteed available offline.

use crate::Error;

/// Origin-relative paths fetched into the current bucket at install time.
pub const DEFAULT_ASSETS: &[&str] = &[
    "/ui",
    "/static/ui.html",
    "/static/ui.css",
    "/static/ui.js",
    "/static/ui1.js",
    "/static/manifest.json",
    "/static/icon-192.png",
    "/static/icon-512.png",
];

/// A fixed ordered list of essential asset paths.
///
/// The first entry is the application shell, the ultimate fallback for
/// failed navigations. The list is decided at startup and never mutated.
#[derive(Debug, Clone)]
pub struct AssetManifest {
    paths: Vec<String>,
}

impl AssetManifest {
    /// Build a manifest from origin-relative paths.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the list is empty or any path is
    /// not origin-relative (leading `/`).
    pub fn new(paths: Vec<String>) -> Result<Self, Error> {
        if paths.is_empty() {
            return Err(Error::InvalidInput("asset manifest cannot be empty".into()));
        }
        for path in &paths {
            if !path.starts_with('/') {
                return Err(Error::InvalidInput(format!(
                    "asset path must start with '/': {path}"
                )));
            }
        }
        Ok(Self { paths })
    }

    /// The shell path: the manifest's root entry.
    pub fn shell(&self) -> &str {
        &self.paths[0]
    }

    /// All asset paths, in install order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Whether the manifest lists the given path.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            paths: DEFAULT_ASSETS.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}
