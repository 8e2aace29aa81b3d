use crate::analysis::{Analysis, AnalysisOptions};
use crate::error::LoadError;
use crate::loader::ModuleLoader;
use crate::query::{SubmoduleSummary, submodule_summaries};

/// The currently loaded module and the loader used to switch it.
///
/// Switching builds the new analysis completely before replacing the old one, so a
/// failed load leaves the previous analysis in place.
pub struct Session<L: ModuleLoader> {
    loader: L,
    options: AnalysisOptions,
    current: Option<Analysis>,
}

impl<L: ModuleLoader> Session<L> {
    pub fn new(loader: L, options: AnalysisOptions) -> Self {
        Self {
            loader,
            options,
            current: None,
        }
    }

    /// Load `name` and make it the current module.
    ///
    /// # Errors
    /// The loader's [`LoadError`]; the session is unchanged.
    pub fn load(&mut self, name: &str) -> Result<&Analysis, LoadError> {
        let loaded = self.loader.load(name)?;
        let analysis = Analysis::build(loaded, &self.options);
        Ok(self.current.insert(analysis))
    }

    pub fn current(&self) -> Option<&Analysis> {
        self.current.as_ref()
    }

    /// Counts for every submodule of `package`. The current module is not touched.
    ///
    /// # Errors
    /// The loader's [`LoadError`] when `package` is missing or not a package.
    pub fn submodules(&self, package: &str) -> Result<Vec<SubmoduleSummary>, LoadError> {
        submodule_summaries(&self.loader, package, &self.options)
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}
