//! Library resolution and the process-wide library cache.

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use indexmap::IndexMap;
use keel_core::Platform;
use log::{debug, info, warn};

use crate::error::LoadError;
use crate::library::Library;
use crate::locate::{default_locator, Locator};
use crate::module::{ModuleLoader, SystemLoader};
use crate::resource::ResourceDomain;
use crate::spec::LibrarySpec;

/// How a [`LibraryManager`] finds and opens libraries.
#[derive(Clone)]
pub struct LoaderConfig {
    /// Host description passed to the locator and used for slot gating.
    pub platform: Platform,
    /// Directory located paths are relative to.
    pub base_dir: PathBuf,
    /// Generic name to relative path.
    pub locator: Locator,
    /// Fallback source for files missing on disk.
    pub resources: Option<Arc<dyn ResourceDomain>>,
    /// Opens located files.
    pub module_loader: Arc<dyn ModuleLoader>,
}

impl LoaderConfig {
    /// Same config for another host description.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Same config rooted at `base_dir`.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Same config with a custom locator.
    pub fn with_locator(
        mut self,
        locator: impl Fn(&Platform, &str) -> PathBuf + Send + Sync + 'static,
    ) -> Self {
        self.locator = Arc::new(locator);
        self
    }

    /// Same config with an embedded-resource fallback.
    pub fn with_resources(mut self, resources: impl ResourceDomain + 'static) -> Self {
        self.resources = Some(Arc::new(resources));
        self
    }

    /// Same config with another module loader.
    pub fn with_module_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.module_loader = Arc::new(loader);
        self
    }

    /// Where the locator puts `name`, joined onto the base directory.
    pub fn locate(&self, name: &str) -> PathBuf {
        self.base_dir.join((self.locator)(&self.platform, name))
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            base_dir: PathBuf::from("."),
            locator: Arc::new(default_locator),
            resources: None,
            module_loader: Arc::new(SystemLoader),
        }
    }
}

impl fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("platform", &self.platform)
            .field("base_dir", &self.base_dir)
            .field("resources", &self.resources.is_some())
            .finish_non_exhaustive()
    }
}

static GLOBAL: OnceLock<LibraryManager> = OnceLock::new();

/// Resolves [`LibrarySpec`]s and caches the results by generic name.
///
/// The cache lock is held for a whole resolution, dependencies included,
/// so concurrent requests never load the same library twice.
pub struct LibraryManager {
    config: LoaderConfig,
    loaded: Mutex<IndexMap<String, Arc<Library>>>,
}

impl LibraryManager {
    /// A manager with an empty cache.
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            loaded: Mutex::new(IndexMap::new()),
        }
    }

    /// The process-wide manager.
    ///
    /// Uses the configuration given to [`init_global`](Self::init_global),
    /// or [`LoaderConfig::default`] if nothing was installed before the
    /// first call.
    pub fn global() -> &'static LibraryManager {
        GLOBAL.get_or_init(|| LibraryManager::new(LoaderConfig::default()))
    }

    /// Installs the process-wide manager with `config`.
    ///
    /// Fails, handing `config` back, once the global manager exists,
    /// whether from an earlier call or from [`global`](Self::global).
    pub fn init_global(config: LoaderConfig) -> Result<&'static LibraryManager, LoaderConfig> {
        let mut config = Some(config);
        let manager = GLOBAL.get_or_init(|| {
            let config = config.take().unwrap_or_default();
            info!("installing global library manager rooted at {}", config.base_dir.display());
            LibraryManager::new(config)
        });
        match config {
            None => Ok(manager),
            Some(rejected) => Err(rejected),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load `spec`, its dependencies first. A cached library is returned
    /// as is.
    pub fn load(&self, spec: &LibrarySpec) -> Result<Arc<Library>, LoadError> {
        let mut loaded = self.lock();
        self.load_locked(&mut loaded, spec)
    }

    /// The cached library for `name`, if loaded.
    pub fn get(&self, name: &str) -> Option<Arc<Library>> {
        self.lock().get(name).cloned()
    }

    /// Names of cached libraries in load order.
    pub fn loaded_names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Drop every cached library, most recently loaded first. A module
    /// unloads once no other reference to its [`Library`] remains.
    pub fn unload_all(&self) {
        let mut loaded = self.lock();
        while let Some((name, _library)) = loaded.pop() {
            debug!("releasing library {name}");
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Arc<Library>>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_locked(
        &self,
        loaded: &mut IndexMap<String, Arc<Library>>,
        spec: &LibrarySpec,
    ) -> Result<Arc<Library>, LoadError> {
        if let Some(library) = loaded.get(&spec.name) {
            return Ok(Arc::clone(library));
        }
        for dependency in &spec.dependencies {
            self.load_locked(loaded, dependency)
                .map_err(|e| LoadError::DependencyFailed {
                    name: spec.name.clone(),
                    source: Box::new(e),
                })?;
        }

        let mut candidates = Vec::new();
        let mut last_error = None;
        for candidate in spec.candidates() {
            let relative = (self.config.locator)(&self.config.platform, candidate);
            let path = self.config.base_dir.join(&relative);
            debug!("library {}: trying {}", spec.name, path.display());
            if !path.exists() {
                if let Some(resources) = &self.config.resources {
                    self.extract(resources.as_ref(), &relative, &path);
                }
            }
            candidates.push(path.clone());
            if !path.exists() {
                continue;
            }
            match self.config.module_loader.open(&path) {
                Ok(module) => {
                    info!("loaded library {} from {}", spec.name, path.display());
                    let library = Arc::new(Library::new(
                        spec.name.clone(),
                        path,
                        self.config.platform,
                        module,
                    ));
                    loaded.insert(spec.name.clone(), Arc::clone(&library));
                    return Ok(library);
                }
                Err(e) => {
                    debug!("library {}: {} failed to open: {e}", spec.name, path.display());
                    last_error = Some(e.to_string());
                }
            }
        }
        Err(LoadError::LibraryNotFound {
            name: spec.name.clone(),
            candidates,
            last_error,
        })
    }

    /// Copy an embedded payload to `path`. A failed copy removes whatever
    /// was written.
    fn extract(&self, resources: &dyn ResourceDomain, relative: &Path, path: &Path) {
        if !resources.exists(relative) {
            return;
        }
        if let Err(e) = copy_resource(resources, relative, path) {
            warn!("extracting {} failed: {e}", path.display());
            if path.exists() {
                let _ = fs::remove_file(path);
            }
        }
    }
}

fn copy_resource(resources: &dyn ResourceDomain, relative: &Path, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut source = resources.open(relative)?;
    let mut target = File::create(path)?;
    io::copy(&mut source, &mut target)?;
    target.sync_all()
}

impl fmt::Debug for LibraryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryManager")
            .field("config", &self.config)
            .field("loaded", &self.loaded_names())
            .finish()
    }
}
