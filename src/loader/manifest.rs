use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::namespace::Namespace;
use super::{LoadedModule, ModuleInfo, ModuleLoader};
use crate::error::LoadError;

/// On-disk shape of a namespace manifest.
///
/// ```json
/// {
///   "module": "pkg.models",
///   "source": "models.py",
///   "namespace": {
///     "Base": {"type": "class", "methods": {"run": {"signature": "(self)"}}},
///     "os": {"type": "module", "name": "os"}
///   }
/// }
/// ```
#[derive(Debug, Deserialize)]
struct Manifest {
    module: String,
    /// Source file, relative to the manifest's directory.
    #[serde(default)]
    source: Option<PathBuf>,
    #[serde(default)]
    doc: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    all: Option<Vec<String>>,
    #[serde(default)]
    namespace: Namespace,
}

/// Loads a serialized namespace from a `*.json` manifest.
///
/// A manifest without a readable source file still loads; the engine then runs
/// edge-free.
#[derive(Debug, Clone, Default)]
pub struct ManifestLoader;

impl ManifestLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleLoader for ManifestLoader {
    fn load(&self, name: &str) -> Result<LoadedModule, LoadError> {
        let path = PathBuf::from(name);
        let text = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let manifest: Manifest = serde_json::from_str(&text).map_err(|source| LoadError::Manifest {
            path: path.clone(),
            source,
        })?;

        let source_path = manifest
            .source
            .as_ref()
            .map(|s| path.parent().unwrap_or(Path::new(".")).join(s));
        let source = source_path.as_ref().and_then(|p| match std::fs::read_to_string(p) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("source {} for manifest {} unreadable: {}", p.display(), path.display(), e);
                None
            }
        });

        log::debug!(
            "manifest '{}' describes {} bindings",
            manifest.module,
            manifest.namespace.len()
        );

        Ok(LoadedModule {
            info: ModuleInfo {
                identity: manifest.module,
                origin: source_path.or(Some(path)),
                doc: manifest.doc,
                version: manifest.version,
                author: manifest.author,
                all: manifest.all,
            },
            namespace: manifest.namespace,
            source,
        })
    }
}
