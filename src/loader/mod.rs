pub mod discover;
pub mod manifest;
pub mod namespace;
pub mod source;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::LoadError;
use crate::symbols::signature::is_identifier;

pub use discover::ModuleEntry;
pub use manifest::ManifestLoader;
use namespace::Namespace;

/// Module-level facts shown alongside the analysis. None of these are symbols.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleInfo {
    /// Dotted module identity, e.g. `pkg.models`.
    pub identity: String,
    /// File the module was loaded from, when there is one.
    pub origin: Option<PathBuf>,
    pub doc: Option<String>,
    /// `__version__`
    pub version: Option<String>,
    /// `__author__`
    pub author: Option<String>,
    /// `__all__`
    pub all: Option<Vec<String>>,
}

/// The result of the load step: everything the engine consumes.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub info: ModuleInfo,
    pub namespace: Namespace,
    /// Module source text. `None` when the loader could not obtain it.
    pub source: Option<String>,
}

impl LoadedModule {
    /// Load a module directly from source text, as if it had been read from a file.
    ///
    /// # Errors
    /// [`LoadError::Syntax`] when the source does not parse.
    pub fn from_source(identity: &str, source: &str) -> Result<LoadedModule, LoadError> {
        source::scan(identity, source, None)
    }
}

/// Resolves a name to a loaded module.
pub trait ModuleLoader {
    /// # Errors
    /// Any [`LoadError`]; the caller keeps its previous state.
    fn load(&self, name: &str) -> Result<LoadedModule, LoadError>;

    /// Submodules of the package `name`. Loaders without a file layout report none.
    ///
    /// # Errors
    /// Any [`LoadError`] raised while locating the package.
    fn submodules(&self, _name: &str) -> Result<Vec<ModuleEntry>, LoadError> {
        Ok(Vec::new())
    }
}

/// Loads `.py` files by dotted module name over a list of search paths.
///
/// `*.json` arguments are delegated to [`ManifestLoader`]; a path ending in `.py` is
/// loaded directly.
#[derive(Debug, Clone, Default)]
pub struct PathLoader {
    search_paths: Vec<PathBuf>,
}

impl PathLoader {
    /// An empty search path list means the current directory.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn roots(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.search_paths.clone()
        }
    }

    /// Locate the file for `name` and derive the module identity.
    ///
    /// # Errors
    /// [`LoadError::InvalidName`] for malformed dotted names, [`LoadError::NotFound`]
    /// when no candidate exists.
    pub fn resolve(&self, name: &str) -> Result<(String, PathBuf), LoadError> {
        if name.ends_with(".py") {
            let direct = PathBuf::from(name);
            let mut searched = vec![direct.clone()];
            if direct.is_file() {
                return Ok((identity_from_path(&direct)?, direct));
            }
            for root in self.roots() {
                let candidate = root.join(name);
                if candidate.is_file() {
                    return Ok((identity_from_path(&candidate)?, candidate));
                }
                searched.push(candidate);
            }
            return Err(LoadError::NotFound {
                name: name.to_owned(),
                searched,
            });
        }

        let segments: Vec<&str> = name.split('.').collect();
        if segments.iter().any(|s| !is_identifier(s)) {
            return Err(LoadError::InvalidName(name.to_owned()));
        }
        let relative: PathBuf = segments.iter().collect();

        let mut searched = Vec::new();
        for root in self.roots() {
            let file = root.join(&relative).with_extension("py");
            if file.is_file() {
                return Ok((name.to_owned(), file));
            }
            searched.push(file);
            let package = root.join(&relative).join("__init__.py");
            if package.is_file() {
                return Ok((name.to_owned(), package));
            }
            searched.push(package);
        }
        Err(LoadError::NotFound {
            name: name.to_owned(),
            searched,
        })
    }
}

impl ModuleLoader for PathLoader {
    fn load(&self, name: &str) -> Result<LoadedModule, LoadError> {
        if name.ends_with(".json") {
            return ManifestLoader::new().load(name);
        }
        let (identity, path) = self.resolve(name)?;
        log::debug!("loading module '{}' from {}", identity, path.display());
        let text = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        source::scan(&identity, &text, Some(&path))
    }

    fn submodules(&self, name: &str) -> Result<Vec<ModuleEntry>, LoadError> {
        if name.ends_with(".json") {
            return Ok(Vec::new());
        }
        self.package_contents(name)
    }
}

/// `pkg/models.py` -> `models`; `pkg/__init__.py` -> `pkg`.
fn identity_from_path(path: &Path) -> Result<String, LoadError> {
    let invalid = || LoadError::InvalidName(path.display().to_string());
    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
    if stem != "__init__" {
        return Ok(stem.to_owned());
    }
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    canonical
        .parent()
        .and_then(Path::file_name)
        .and_then(|s| s.to_str())
        .map(str::to_owned)
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolves_module_and_package() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/__init__.py"), "X = 1\n").unwrap();
        fs::write(dir.path().join("pkg/models.py"), "class A:\n    pass\n").unwrap();

        let loader = PathLoader::new(vec![dir.path().to_path_buf()]);
        let (identity, path) = loader.resolve("pkg.models").unwrap();
        assert_eq!(identity, "pkg.models");
        assert!(path.ends_with("pkg/models.py"));

        let (identity, path) = loader.resolve("pkg").unwrap();
        assert_eq!(identity, "pkg");
        assert!(path.ends_with("pkg/__init__.py"));

        let loaded = loader.load("pkg.models").unwrap();
        assert!(loaded.namespace.contains_key("A"));
        assert!(loaded.source.is_some());
    }

    #[test]
    fn test_not_found_lists_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let loader = PathLoader::new(vec![dir.path().to_path_buf()]);
        match loader.resolve("nope.mod") {
            Err(LoadError::NotFound { name, searched }) => {
                assert_eq!(name, "nope.mod");
                assert_eq!(searched.len(), 2);
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_dotted_name() {
        let loader = PathLoader::default();
        assert!(matches!(loader.resolve("a..b"), Err(LoadError::InvalidName(_))));
        assert!(matches!(loader.resolve("1abc"), Err(LoadError::InvalidName(_))));
    }

    #[test]
    fn test_direct_py_path_identity() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tools.py");
        fs::write(&file, "def f():\n    pass\n").unwrap();
        let loader = PathLoader::default();
        let loaded = loader.load(file.to_str().unwrap()).unwrap();
        assert_eq!(loaded.info.identity, "tools");
        assert_eq!(loaded.info.origin.as_deref(), Some(file.as_path()));
    }

    #[test]
    fn test_syntax_error_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.py");
        fs::write(&file, "def broken(:\n").unwrap();
        let err = PathLoader::default().load(file.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LoadError::Syntax { .. }), "got {:?}", err);
    }
}
