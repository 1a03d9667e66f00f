//! Applying a resolved LUT to image scanlines.
//!
//! Pixel values are linear RGB in the working profile, on a `[0, 65535]`
//! scale. Depending on the backend a scanline goes through:
//!
//! | Backend | Steps |
//! |---------|-------|
//! | Hald table | working to LUT profile, sRGB gamma, trilinear lookup with strength blend, inverse gamma, back to working |
//! | CLF / manifest | normalize and convert to ACES AP0, processor, back to working, strength blend |
//! | CTL script | normalize and convert to the script colorspace, script (or its tabulated LUT), back to working, strength blend |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clut_core::{Grid2D, ParamDescriptor, ParamValueMap};
use clut_lut::{HaldClut, Kernel, Lut3D, SharedProcessor};
use clut_math::Mat3;
use clut_math::simd::{blend_planar, transform_planar};
use clut_math::transfer::{gamma_srgb_clipped, igamma_srgb};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::ClutStore;
use crate::ctl::CtlLut;
use crate::extlut::ExternalLut;

/// Working profile of CLF transforms and generated LUTs.
pub const CLF_PROFILE: &str = "ACESp0";

/// Rendering quality, trading CTL accuracy for speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    /// Fast preview.
    Low,
    /// Preview.
    Medium,
    /// Near-final.
    High,
    /// Final output; scripts use their own LUT setting.
    #[default]
    Highest,
}

impl Quality {
    /// Fast-path LUT resolution for a script declaring `declared` (0 for none).
    ///
    /// Preview qualities cap the resolution, or impose one when the script
    /// declares none. [`Quality::Highest`] keeps the declared value.
    pub fn lut_dim(self, declared: usize) -> usize {
        let cap = match self {
            Quality::Low => 24,
            Quality::Medium => 32,
            Quality::High => 64,
            Quality::Highest => return declared,
        };
        if declared == 0 { cap } else { declared.min(cap) }
    }
}

/// The LUT behind a [`ClutApplication`].
#[derive(Debug)]
pub enum Backend {
    /// Hald table.
    Table(Arc<HaldClut>),
    /// CLF transform.
    ExternalProcessor(SharedProcessor),
    /// CTL script, with its tabulated form when the fast path is active.
    CompiledScript {
        /// Script handles.
        lut: CtlLut,
        /// Tabulated script in shaper space.
        table: Option<Lut3D>,
    },
    /// External generator; evaluates nothing until values are bound.
    ExternalManifest(ExternalLut),
}

/// A LUT bound to a working profile and strength, ready to apply.
#[derive(Debug)]
pub struct ClutApplication {
    store: Arc<ClutStore>,
    filename: PathBuf,
    working_profile: String,
    strength: f32,
    num_threads: usize,
    backend: Option<Backend>,
    kernel: Kernel,
    convert: bool,
    conv: Mat3,
    iconv: Mat3,
}

impl ClutApplication {
    /// Resolves `filename` through `store`, trying a Hald table, a CLF
    /// transform, a manifest and a CTL script in that order.
    ///
    /// `num_threads` is the number of worker ids [`apply`](Self::apply)
    /// will see; 0 uses the rayon pool size.
    pub fn new(
        store: Arc<ClutStore>,
        filename: impl AsRef<Path>,
        working_profile: &str,
        strength: f32,
        num_threads: usize,
    ) -> Self {
        let num_threads = if num_threads == 0 {
            rayon::current_num_threads()
        } else {
            num_threads
        };
        let mut app = Self {
            store,
            filename: filename.as_ref().to_path_buf(),
            working_profile: working_profile.to_string(),
            strength: strength.clamp(0.0, 1.0),
            num_threads,
            backend: None,
            kernel: Kernel::detect(),
            convert: false,
            conv: Mat3::IDENTITY,
            iconv: Mat3::IDENTITY,
        };
        app.init();
        app
    }

    fn init(&mut self) {
        let store = Arc::clone(&self.store);
        let file = self.filename.as_path();

        let resolved = if let Some(clut) = store.hald_clut(file) {
            let profile = clut.profile().to_string();
            Some((Backend::Table(clut), profile))
        } else if let Some(proc) = store.clf_processor(file) {
            Some((Backend::ExternalProcessor(proc), CLF_PROFILE.to_string()))
        } else if let Some(lut) = store.external_lut(file) {
            Some((Backend::ExternalManifest(lut), CLF_PROFILE.to_string()))
        } else if let Some(lut) = store.ctl_lut(file, self.num_threads) {
            let profile = lut.colorspace().to_string();
            Some((Backend::CompiledScript { lut, table: None }, profile))
        } else {
            None
        };

        let Some((backend, profile)) = resolved else {
            debug!(path = %self.filename.display(), "no usable LUT");
            return;
        };

        let ready = match backend {
            Backend::Table(_) => self.init_table_matrices(&profile),
            _ => self.init_matrices(&profile),
        };
        if ready {
            self.backend = Some(backend);
        } else {
            warn!(
                path = %self.filename.display(),
                working = %self.working_profile,
                lut = %profile,
                "unknown color profile"
            );
        }
    }

    fn profile_matrices(&self, profile: &str) -> Option<(Mat3, Mat3)> {
        let cms = self.store.color_management();
        Some((cms.working_space_matrix(profile)?, cms.working_space_inverse_matrix(profile)?))
    }

    /// Conversions between the working and table profile, skipped when they
    /// are the same.
    fn init_table_matrices(&mut self, lut_profile: &str) -> bool {
        self.convert = lut_profile != self.working_profile;
        if !self.convert {
            return true;
        }
        let (Some((work, iwork)), Some((lut, ilut))) =
            (self.profile_matrices(&self.working_profile), self.profile_matrices(lut_profile))
        else {
            return false;
        };
        self.conv = ilut * work;
        self.iconv = iwork * lut;
        true
    }

    /// Conversions for normalized backends; `iconv` also restores the
    /// 65535 scale. An empty profile means the working profile.
    fn init_matrices(&mut self, lut_profile: &str) -> bool {
        self.convert = true;
        if lut_profile.is_empty() {
            self.conv = Mat3::IDENTITY;
            self.iconv = Mat3::IDENTITY * 65535.0;
            return true;
        }
        let (Some((work, iwork)), Some((lut, ilut))) =
            (self.profile_matrices(&self.working_profile), self.profile_matrices(lut_profile))
        else {
            return false;
        };
        self.conv = ilut * work;
        self.iconv = (iwork * lut) * 65535.0;
        true
    }

    /// Selects the Hald lookup kernel.
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// True if a LUT was resolved.
    pub fn ok(&self) -> bool {
        self.backend.is_some()
    }

    /// The active backend.
    pub fn backend(&self) -> Option<&Backend> {
        self.backend.as_ref()
    }

    /// LUT filename as given.
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Working profile of the image.
    pub fn working_profile(&self) -> &str {
        &self.working_profile
    }

    /// Blend factor in `[0, 1]`.
    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Number of worker ids.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Parameters of the LUT; empty for tables and CLF transforms.
    pub fn param_descriptors(&self) -> Vec<ParamDescriptor> {
        match &self.backend {
            Some(Backend::CompiledScript { lut, .. }) => lut.params().to_vec(),
            Some(Backend::ExternalManifest(lut)) => lut.param_descriptors().to_vec(),
            _ => Vec::new(),
        }
    }

    /// Binds parameter values.
    ///
    /// Scripts bind the values (and rebuild their fast-path table for
    /// `quality`); manifests compute or fetch the matching LUT. Backends
    /// without parameters accept only an empty map.
    pub fn set_param_values(&mut self, values: &ParamValueMap, quality: Quality) -> bool {
        let store = &self.store;
        match &mut self.backend {
            Some(Backend::CompiledScript { lut, table }) => {
                let config = store.config();
                if let Err(e) = lut.bind(values, config.verbose) {
                    warn!(path = %self.filename.display(), error = %e, "cannot set CTL parameters");
                    return false;
                }
                let dim = if config.ctl_fast_preview {
                    quality.lut_dim(lut.lut_dim())
                } else {
                    lut.lut_dim()
                };
                *table = None;
                if dim > 0 {
                    match lut.build_lut(dim, store.shaper()) {
                        Ok(t) => *table = Some(t),
                        Err(e) => {
                            warn!(path = %self.filename.display(), error = %e, "cannot tabulate CTL script");
                            return false;
                        }
                    }
                }
                true
            }
            Some(Backend::ExternalManifest(lut)) => lut.set_param_values(store, values),
            _ => values.is_empty(),
        }
    }

    /// Transforms one scanline in place.
    ///
    /// `thread_id` picks the script handle for CTL backends. Evaluation
    /// errors are logged and leave the scanline untouched.
    ///
    /// # Panics
    ///
    /// Panics if the planes differ in length.
    pub fn apply(&self, thread_id: usize, r: &mut [f32], g: &mut [f32], b: &mut [f32]) {
        assert!(r.len() == g.len() && g.len() == b.len());
        let Some(backend) = &self.backend else {
            return;
        };

        let res = match backend {
            Backend::Table(clut) => {
                self.apply_table(clut, r, g, b);
                Ok(())
            }
            Backend::ExternalProcessor(proc) => self.apply_processor(proc, r, g, b),
            Backend::ExternalManifest(lut) => match lut.processor() {
                Some(proc) => self.apply_processor(proc, r, g, b),
                None => Ok(()),
            },
            Backend::CompiledScript { lut, table } => self.apply_script(thread_id, lut, table.as_ref(), r, g, b),
        };

        if let Err(e) = res {
            if self.store.config().verbose {
                warn!(path = %self.filename.display(), error = %e, "LUT evaluation failed");
            }
        }
    }

    /// Transforms a single pixel.
    pub fn apply_single(&self, r: f32, g: f32, b: f32) -> [f32; 3] {
        let (mut r, mut g, mut b) = ([r], [g], [b]);
        self.apply(0, &mut r, &mut g, &mut b);
        [r[0], g[0], b[0]]
    }

    /// Transforms whole planes, rows in parallel on the rayon pool.
    ///
    /// # Panics
    ///
    /// Panics if the planes differ in size.
    pub fn apply_planes(&self, r: &mut Grid2D<'_, f32>, g: &mut Grid2D<'_, f32>, b: &mut Grid2D<'_, f32>) {
        assert!(r.width() == g.width() && g.width() == b.width());
        assert!(r.height() == g.height() && g.height() == b.height());
        if !self.ok() {
            return;
        }

        let rows: Vec<_> = r.rows_mut().zip(g.rows_mut()).zip(b.rows_mut()).collect();
        rows.into_par_iter().for_each(|((r, g), b)| {
            let thread_id = rayon::current_thread_index().unwrap_or(0);
            self.apply(thread_id, r, g, b);
        });
    }

    fn apply_table(&self, clut: &HaldClut, r: &mut [f32], g: &mut [f32], b: &mut [f32]) {
        let (mut cr, mut cg, mut cb) = (r.to_vec(), g.to_vec(), b.to_vec());
        if self.convert {
            transform_planar(&self.conv, &mut cr, &mut cg, &mut cb);
        }
        for v in cr.iter_mut().chain(cg.iter_mut()).chain(cb.iter_mut()) {
            *v = gamma_srgb_clipped(*v);
        }

        let mut out = vec![0.0f32; r.len() * 4];
        clut.get_rgb(self.kernel, self.strength, &cr, &cg, &cb, &mut out);

        for (j, px) in out.chunks_exact(4).enumerate() {
            cr[j] = igamma_srgb(px[0]);
            cg[j] = igamma_srgb(px[1]);
            cb[j] = igamma_srgb(px[2]);
        }
        if self.convert {
            transform_planar(&self.iconv, &mut cr, &mut cg, &mut cb);
        }

        r.copy_from_slice(&cr);
        g.copy_from_slice(&cg);
        b.copy_from_slice(&cb);
    }

    /// Normalized copies of the planes in the LUT profile.
    fn to_lut_space(&self, r: &[f32], g: &[f32], b: &[f32]) -> [Vec<f32>; 3] {
        let norm = |p: &[f32]| p.iter().map(|v| v / 65535.0).collect::<Vec<_>>();
        let [mut pr, mut pg, mut pb] = [norm(r), norm(g), norm(b)];
        transform_planar(&self.conv, &mut pr, &mut pg, &mut pb);
        [pr, pg, pb]
    }

    /// Converts back to the working profile, blends and stores.
    fn from_lut_space(&self, planes: [Vec<f32>; 3], r: &mut [f32], g: &mut [f32], b: &mut [f32]) {
        let [mut pr, mut pg, mut pb] = planes;
        transform_planar(&self.iconv, &mut pr, &mut pg, &mut pb);
        if self.strength < 1.0 {
            blend_planar(self.strength, &mut pr, r);
            blend_planar(self.strength, &mut pg, g);
            blend_planar(self.strength, &mut pb, b);
        }
        r.copy_from_slice(&pr);
        g.copy_from_slice(&pg);
        b.copy_from_slice(&pb);
    }

    fn apply_processor(
        &self,
        proc: &SharedProcessor,
        r: &mut [f32],
        g: &mut [f32],
        b: &mut [f32],
    ) -> crate::StoreResult<()> {
        let [pr, pg, pb] = self.to_lut_space(r, g, b);
        let mut packed: Vec<f32> = (0..pr.len()).flat_map(|i| [pr[i], pg[i], pb[i]]).collect();
        proc.apply_packed(&mut packed)?;

        let mut planes = [pr, pg, pb];
        for (i, px) in packed.chunks_exact(3).enumerate() {
            for c in 0..3 {
                planes[c][i] = px[c];
            }
        }
        self.from_lut_space(planes, r, g, b);
        Ok(())
    }

    fn apply_script(
        &self,
        thread_id: usize,
        lut: &CtlLut,
        table: Option<&Lut3D>,
        r: &mut [f32],
        g: &mut [f32],
        b: &mut [f32],
    ) -> crate::StoreResult<()> {
        let [mut pr, mut pg, mut pb] = self.to_lut_space(r, g, b);
        match table {
            Some(table) => {
                let shaper = self.store.shaper();
                for i in 0..pr.len() {
                    let [or, og, ob] = table.apply([
                        shaper.eval(pr[i], false),
                        shaper.eval(pg[i], false),
                        shaper.eval(pb[i], false),
                    ]);
                    pr[i] = or;
                    pg[i] = og;
                    pb[i] = ob;
                }
            }
            None => lut.eval(thread_id, &mut pr, &mut pg, &mut pb)?,
        }
        self.from_lut_space([pr, pg, pb], r, g, b);
        Ok(())
    }
}
