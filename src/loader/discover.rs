use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::LoadError;
use crate::symbols::signature::is_identifier;

use super::PathLoader;

/// A module or package found on disk next to others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleEntry {
    /// Last dotted segment, e.g. `core`.
    pub name: String,
    /// Full dotted identity, e.g. `pkg.core`.
    pub identity: String,
    /// The argument that loads this entry through the same loader.
    pub load_name: String,
    pub is_package: bool,
    pub path: PathBuf,
}

/// Importable children of `dir`: `*.py` files (except `__init__.py`) and directories
/// holding an `__init__.py`, keyed by name. Names that are not identifiers are skipped.
fn scan_dir(dir: &Path) -> BTreeMap<String, (bool, PathBuf)> {
    let mut found = BTreeMap::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!("cannot list {}: {err}", dir.display());
            return found;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_dir() {
            let init = path.join("__init__.py");
            if init.is_file() && is_identifier(file_name) {
                found.insert(file_name.to_owned(), (true, init));
            }
        } else if let Some(stem) = file_name.strip_suffix(".py") {
            if stem != "__init__" && is_identifier(stem) {
                // A package directory shadows a module file of the same name.
                found.entry(stem.to_owned()).or_insert((false, path));
            }
        }
    }
    found
}

impl PathLoader {
    /// Submodules and subpackages of the package `name`, sorted by name.
    ///
    /// # Errors
    /// [`LoadError::NotAPackage`] when `name` resolves to a plain module file, or any
    /// resolution error from [`PathLoader::resolve`].
    pub fn package_contents(&self, name: &str) -> Result<Vec<ModuleEntry>, LoadError> {
        let (identity, path) = self.resolve(name)?;
        if path.file_name().and_then(|n| n.to_str()) != Some("__init__.py") {
            return Err(LoadError::NotAPackage(name.to_owned()));
        }
        let Some(dir) = path.parent() else {
            return Err(LoadError::NotAPackage(name.to_owned()));
        };
        // A package given as a path is drilled into by path as well.
        let by_path = name.ends_with(".py");

        let entries = scan_dir(dir)
            .into_iter()
            .map(|(child, (is_package, path))| ModuleEntry {
                identity: format!("{identity}.{child}"),
                load_name: if by_path {
                    path.display().to_string()
                } else {
                    format!("{name}.{child}")
                },
                name: child,
                is_package,
                path,
            })
            .collect::<Vec<_>>();
        log::debug!("package '{}' has {} submodules", identity, entries.len());
        Ok(entries)
    }

    /// Top-level modules and packages on the search paths. When a name exists on more
    /// than one path the first one wins, as it would on import.
    pub fn available_modules(&self) -> Vec<ModuleEntry> {
        let mut seen: BTreeMap<String, ModuleEntry> = BTreeMap::new();
        for root in self.roots() {
            for (name, (is_package, path)) in scan_dir(&root) {
                seen.entry(name.clone()).or_insert_with(|| ModuleEntry {
                    identity: name.clone(),
                    load_name: name.clone(),
                    name,
                    is_package,
                    path,
                });
            }
        }
        seen.into_values().collect()
    }
}
