//! The LUT store: resolution and caching of every LUT backend.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use clut_core::{BoundedCache, Fingerprint, ParamDescriptor, ParamValueMap, StoreConfig, values_to_json};
use clut_lut::{HaldClut, ImageLoader, PngLoader, SharedProcessor, decode_clf, read_clf};
use clut_math::{ColorManagement, StandardProfiles};
use tracing::{debug, trace, warn};

use crate::ctl::{CtlHeader, CtlLut, CtlScript, ScriptEngine, Shaper};
use crate::disk_cache::DiskCache;
use crate::extlut::ExternalLut;
use crate::subprocess::{CommandRunner, ProcessRunner};
use crate::{StoreError, StoreResult};

/// Profile assumed for files without a profile suffix.
pub const DEFAULT_PROFILE: &str = "sRGB";

/// Menu entry for a LUT file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClutName {
    /// Display name.
    pub name: String,
    /// Sort key, -1 when unspecified.
    pub order: i32,
}

impl ClutName {
    fn unordered(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: -1,
        }
    }
}

/// Parts of a LUT filename, see [`ClutStore::split_clut_filename`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitName {
    /// Base name with extension and profile suffix removed.
    pub name: String,
    /// Extension without the dot.
    pub extension: String,
    /// Working profile the LUT expects, empty for profile-agnostic formats.
    pub profile: String,
}

/// LUT file formats, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LutFormat {
    Clf,
    Manifest,
    Script,
    Image,
}

impl LutFormat {
    pub(crate) fn of(path: &Path) -> Self {
        match file_extension(path).as_str() {
            "clf" | "clfz" => LutFormat::Clf,
            "json" => LutFormat::Manifest,
            "ctl" => LutFormat::Script,
            _ => LutFormat::Image,
        }
    }
}

/// Lowercase extension of `path`, empty if none.
fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

struct Caches {
    hald: BoundedCache<PathBuf, (Arc<HaldClut>, Fingerprint)>,
    clf: BoundedCache<PathBuf, (SharedProcessor, Fingerprint)>,
    ctl: BoundedCache<PathBuf, CtlScript>,
    external: BoundedCache<String, SharedProcessor>,
}

impl Caches {
    fn new(size: usize) -> Self {
        Self {
            hald: BoundedCache::new(size),
            clf: BoundedCache::new(size),
            ctl: BoundedCache::new(size * 4),
            external: BoundedCache::new(size * 4),
        }
    }

    fn clear(&mut self) {
        self.hald.clear();
        self.clf.clear();
        self.ctl.clear();
        self.external.clear();
    }
}

/// Resolves LUT filenames to loaded tables, processors and scripts.
///
/// One store is shared (behind an [`Arc`]) by every
/// [`ClutApplication`](crate::ClutApplication). All caches sit behind a
/// single mutex held for each whole lookup, so concurrent requests for the
/// same file load it once.
pub struct ClutStore {
    config: StoreConfig,
    cms: Arc<dyn ColorManagement>,
    loader: Arc<dyn ImageLoader>,
    runner: Arc<dyn CommandRunner>,
    engine: Option<Arc<dyn ScriptEngine>>,
    disk_cache: DiskCache,
    shaper: OnceLock<Shaper>,
    caches: Mutex<Caches>,
}

impl std::fmt::Debug for ClutStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClutStore")
            .field("config", &self.config)
            .field("runner", &self.runner)
            .field("script_engine", &self.engine.is_some())
            .field("disk_cache", &self.disk_cache)
            .finish()
    }
}

impl ClutStore {
    /// Store with the built-in profiles, PNG loader and process runner.
    ///
    /// CTL scripts stay unavailable until an engine is registered with
    /// [`with_script_engine`](Self::with_script_engine).
    pub fn new(config: StoreConfig) -> Self {
        let disk_cache = DiskCache::new(&config.disk_cache_dir, config.disk_cache_max_entries);
        let caches = Mutex::new(Caches::new(config.clut_cache_size));
        Self {
            config,
            cms: Arc::new(StandardProfiles::new()),
            loader: Arc::new(PngLoader),
            runner: Arc::new(ProcessRunner),
            engine: None,
            disk_cache,
            shaper: OnceLock::new(),
            caches,
        }
    }

    /// Replaces the color-management service.
    pub fn with_color_management(mut self, cms: Arc<dyn ColorManagement>) -> Self {
        self.cms = cms;
        self
    }

    /// Replaces the Hald image loader.
    pub fn with_image_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Replaces the runner used for external LUT commands.
    pub fn with_command_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Enables CTL scripts.
    pub fn with_script_engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Settings.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Color-management service.
    pub fn color_management(&self) -> &dyn ColorManagement {
        self.cms.as_ref()
    }

    /// Persistent cache of generated LUTs.
    pub fn disk_cache(&self) -> &DiskCache {
        &self.disk_cache
    }

    /// Shaper used by the CTL fast path, built on first use.
    pub fn shaper(&self) -> &Shaper {
        self.shaper.get_or_init(Shaper::new)
    }

    fn caches(&self) -> MutexGuard<'_, Caches> {
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Joins relative filenames to the LUT directory.
    pub fn resolve_path(&self, filename: impl AsRef<Path>) -> PathBuf {
        let filename = filename.as_ref();
        if filename.is_absolute() {
            filename.to_path_buf()
        } else {
            self.config.luts_dir.join(filename)
        }
    }

    // ------------------------------------------------------------------
    // Hald tables
    // ------------------------------------------------------------------

    /// Loads a Hald table, or `None` if the file is not one.
    pub fn hald_clut(&self, filename: impl AsRef<Path>) -> Option<Arc<HaldClut>> {
        let path = self.resolve_path(filename);
        if LutFormat::of(&path) != LutFormat::Image {
            return None;
        }
        self.try_hald_clut(&path)
            .map_err(|e| debug!(path = %path.display(), error = %e, "not a Hald CLUT"))
            .ok()
    }

    /// Loads a Hald table, reporting why it failed.
    pub fn try_hald_clut(&self, path: &Path) -> StoreResult<Arc<HaldClut>> {
        let fingerprint = Fingerprint::of_file(path)?;
        let mut caches = self.caches();
        if let Some((clut, fp)) = caches.hald.get(&path.to_path_buf()) {
            if *fp == fingerprint {
                return Ok(Arc::clone(clut));
            }
            debug!(path = %path.display(), "Hald CLUT changed on disk");
        }

        trace!(path = %path.display(), "Hald cache miss");
        let split = self.split_clut_filename(path);
        let clut = Arc::new(HaldClut::load(self.loader.as_ref(), path, &split.profile)?);
        caches.hald.set(path.to_path_buf(), (Arc::clone(&clut), fingerprint));
        Ok(clut)
    }

    // ------------------------------------------------------------------
    // CLF
    // ------------------------------------------------------------------

    /// Loads a `.clf`/`.clfz` transform, or `None` on any failure.
    pub fn clf_processor(&self, filename: impl AsRef<Path>) -> Option<SharedProcessor> {
        let path = self.resolve_path(filename);
        if LutFormat::of(&path) != LutFormat::Clf {
            return None;
        }
        self.try_clf_processor(&path)
            .map_err(|e| warn!(path = %path.display(), error = %e, "cannot load CLF"))
            .ok()
    }

    /// Loads a CLF transform, reporting why it failed.
    pub fn try_clf_processor(&self, path: &Path) -> StoreResult<SharedProcessor> {
        let fingerprint = Fingerprint::of_file(path)?;
        let mut caches = self.caches();
        if let Some((proc, fp)) = caches.clf.get(&path.to_path_buf()) {
            if *fp == fingerprint {
                return Ok(Arc::clone(proc));
            }
        }

        trace!(path = %path.display(), "CLF cache miss");
        let proc: SharedProcessor = Arc::new(read_clf(path)?);
        caches.clf.set(path.to_path_buf(), (Arc::clone(&proc), fingerprint));
        Ok(proc)
    }

    // ------------------------------------------------------------------
    // External manifests
    // ------------------------------------------------------------------

    /// Parses a `.json` manifest, or `None` if it is not a valid one.
    ///
    /// The command is not run until values are bound with
    /// [`ExternalLut::set_param_values`].
    pub fn external_lut(&self, filename: impl AsRef<Path>) -> Option<ExternalLut> {
        let path = self.resolve_path(filename);
        if LutFormat::of(&path) != LutFormat::Manifest {
            return None;
        }
        ExternalLut::from_manifest(&path)
            .map_err(|e| warn!(path = %path.display(), error = %e, "cannot load LUT manifest"))
            .ok()
    }

    /// Processor of `lut` for `values`: from memory, then from the disk
    /// cache, then by running the manifest's command.
    pub fn external_processor(&self, lut: &ExternalLut, values: &ParamValueMap) -> StoreResult<SharedProcessor> {
        let params_json = values_to_json(lut.param_descriptors(), values)?;
        let fingerprint = Fingerprint::of_file(lut.path())?;
        let key = format!("{}\n{}\n{}", lut.path().display(), fingerprint, params_json);

        let mut caches = self.caches();
        if let Some(proc) = caches.external.get(&key) {
            return Ok(Arc::clone(proc));
        }

        if let Some(cached) = self.disk_cache.lookup(&key) {
            match read_clf(&cached) {
                Ok(list) => {
                    debug!(path = %lut.path().display(), entry = %cached.display(), "disk cache hit");
                    let proc: SharedProcessor = Arc::new(list);
                    caches.external.set(key, Arc::clone(&proc));
                    return Ok(proc);
                }
                Err(e) => {
                    warn!(entry = %cached.display(), error = %e, "dropping unreadable cache entry");
                    self.disk_cache.remove(&key);
                }
            }
        }

        debug!(path = %lut.path().display(), "computing 3D LUT");
        let data = lut.generate(self.runner.as_ref(), &params_json, self.config.command_timeout())?;
        let proc: SharedProcessor = Arc::new(decode_clf(&data)?);

        match self.disk_cache.store(&key, &data) {
            Ok(_) => {
                if let Err(e) = self.disk_cache.trim() {
                    warn!(dir = %self.disk_cache.dir().display(), error = %e, "cannot trim disk cache");
                }
            }
            Err(e) => warn!(dir = %self.disk_cache.dir().display(), error = %e, "cannot write disk cache"),
        }

        caches.external.set(key, Arc::clone(&proc));
        Ok(proc)
    }

    // ------------------------------------------------------------------
    // CTL
    // ------------------------------------------------------------------

    /// Compiles (or fetches) a CTL script and creates `num_threads` call
    /// handles, or `None` on any failure.
    pub fn ctl_lut(&self, filename: impl AsRef<Path>, num_threads: usize) -> Option<CtlLut> {
        let path = self.resolve_path(filename);
        if LutFormat::of(&path) != LutFormat::Script {
            return None;
        }
        self.try_ctl_lut(&path, num_threads)
            .map_err(|e| warn!(path = %path.display(), error = %e, "cannot load CTL script"))
            .ok()
    }

    /// Compiles a CTL script, reporting why it failed.
    pub fn try_ctl_lut(&self, path: &Path, num_threads: usize) -> StoreResult<CtlLut> {
        let script = self.ctl_script(path)?;
        Ok(script.instantiate(num_threads)?)
    }

    fn ctl_script(&self, path: &Path) -> StoreResult<CtlScript> {
        let engine = self.engine.as_ref().ok_or_else(|| StoreError::Unsupported(path.to_path_buf()))?;
        let source = fs::read_to_string(path)?;
        let fingerprint = Fingerprint::of_bytes(source.as_bytes());

        let mut caches = self.caches();
        if let Some(script) = caches.ctl.get(&path.to_path_buf()) {
            if *script.fingerprint() == fingerprint {
                return Ok(script.clone());
            }
        }

        trace!(path = %path.display(), "CTL cache miss");
        let mut module_paths = Vec::with_capacity(self.config.ctl_module_paths.len() + 1);
        if let Some(dir) = path.parent() {
            module_paths.push(dir.to_path_buf());
        }
        module_paths.extend(self.config.ctl_module_paths.iter().cloned());

        let script = CtlScript::compile(engine.as_ref(), path, &source, fingerprint, &module_paths)?;
        caches.ctl.set(path.to_path_buf(), script.clone());
        Ok(script)
    }

    // ------------------------------------------------------------------
    // Housekeeping and metadata
    // ------------------------------------------------------------------

    /// Empties every in-memory cache. The disk cache is left alone.
    pub fn clear_cache(&self) {
        self.caches().clear();
    }

    /// Parameters of a script or manifest; empty for other LUTs.
    pub fn param_descriptors(&self, filename: impl AsRef<Path>) -> Vec<ParamDescriptor> {
        let path = self.resolve_path(filename);
        match LutFormat::of(&path) {
            LutFormat::Manifest => self
                .external_lut(&path)
                .map(|lut| lut.param_descriptors().to_vec())
                .unwrap_or_default(),
            LutFormat::Script => self
                .ctl_script(&path)
                .map(|s| s.params().to_vec())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Default values of [`param_descriptors`](Self::param_descriptors).
    pub fn default_param_values(&self, filename: impl AsRef<Path>) -> ParamValueMap {
        clut_core::default_values(&self.param_descriptors(filename))
    }

    /// Name to show for a LUT in menus.
    pub fn display_name(&self, filename: impl AsRef<Path>) -> ClutName {
        let path = self.resolve_path(filename);
        match LutFormat::of(&path) {
            LutFormat::Script => {
                if let Ok(source) = fs::read_to_string(&path) {
                    if let (Some(name), order) = CtlHeader::display_label(&source) {
                        return ClutName {
                            name,
                            order: order.unwrap_or(-1),
                        };
                    }
                }
            }
            LutFormat::Manifest => {
                return ClutName::unordered(
                    ExternalLut::from_manifest(&path)
                        .map(|lut| lut.label().to_string())
                        .unwrap_or_default(),
                );
            }
            _ => {}
        }
        ClutName::unordered(self.split_clut_filename(&path).name)
    }

    /// Splits a LUT filename into name, extension and profile.
    ///
    /// The profile is the longest working profile name the base name ends
    /// with (which is stripped from the name), else [`DEFAULT_PROFILE`].
    /// CLF, manifest and script files skip the suffix search and keep
    /// the default.
    pub fn split_clut_filename(&self, filename: impl AsRef<Path>) -> SplitName {
        let base = filename
            .as_ref()
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (mut name, extension) = match base.rfind('.') {
            Some(pos) => (base[..pos].to_string(), base[pos + 1..].to_string()),
            None => (base, String::new()),
        };

        let ext = extension.to_lowercase();
        let skip_suffix = ext.starts_with("clf") || ext == "json" || ext.starts_with("ctl");

        let mut profile = DEFAULT_PROFILE.to_string();
        if !skip_suffix && !name.is_empty() {
            let found = self
                .cms
                .working_profiles()
                .into_iter()
                .filter(|p| !p.is_empty() && name.ends_with(p.as_str()))
                .max_by_key(|p| p.len());
            if let Some(p) = found {
                name.truncate(name.len() - p.len());
                profile = p;
            }
        }
        SplitName {
            name,
            extension,
            profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ClutStore {
        ClutStore::new(StoreConfig {
            luts_dir: PathBuf::from("/luts"),
            ..StoreConfig::default()
        })
    }

    #[test]
    fn test_split_profile_suffix() {
        let s = store();
        let split = s.split_clut_filename("/luts/FilmACESp1.png");
        assert_eq!(split.name, "Film");
        assert_eq!(split.extension, "png");
        assert_eq!(split.profile, "ACESp1");

        let split = s.split_clut_filename("Portrait Adobe RGB.tif");
        assert_eq!(split.name, "Portrait ");
        assert_eq!(split.profile, "Adobe RGB");
    }

    #[test]
    fn test_split_defaults() {
        let s = store();
        let split = s.split_clut_filename("warm.png");
        assert_eq!((split.name.as_str(), split.profile.as_str()), ("warm", "sRGB"));

        let split = s.split_clut_filename("noext");
        assert_eq!(split.extension, "");
        assert_eq!(split.profile, "sRGB");

        for f in ["lookACESp0.clf", "lookACESp0.CLFZ", "genProPhoto.json", "scriptACESp1.ctl"] {
            assert_eq!(s.split_clut_filename(f).profile, "sRGB", "{f}");
        }
        assert_eq!(s.split_clut_filename("lookACESp0.clf").name, "lookACESp0");
        assert_eq!(s.split_clut_filename("scriptACESp1.ctl").name, "scriptACESp1");
    }

    #[test]
    fn test_resolve_path() {
        let s = store();
        assert_eq!(s.resolve_path("a/b.png"), PathBuf::from("/luts/a/b.png"));
        assert_eq!(s.resolve_path("/abs/c.png"), PathBuf::from("/abs/c.png"));
    }

    #[test]
    fn test_format_dispatch() {
        assert_eq!(LutFormat::of(Path::new("x.CLF")), LutFormat::Clf);
        assert_eq!(LutFormat::of(Path::new("x.clfz")), LutFormat::Clf);
        assert_eq!(LutFormat::of(Path::new("x.json")), LutFormat::Manifest);
        assert_eq!(LutFormat::of(Path::new("x.ctl")), LutFormat::Script);
        assert_eq!(LutFormat::of(Path::new("x.png")), LutFormat::Image);
    }

    #[test]
    fn test_missing_files() {
        let s = store();
        assert!(s.hald_clut("missing.png").is_none());
        assert!(s.clf_processor("missing.clf").is_none());
        assert!(s.external_lut("missing.json").is_none());
        assert!(s.ctl_lut("missing.ctl", 1).is_none());
        assert!(s.param_descriptors("missing.json").is_empty());
        assert_eq!(s.display_name("missing.ctl").name, "missing");
        assert_eq!(s.display_name("missing.json").name, "");
    }
}
