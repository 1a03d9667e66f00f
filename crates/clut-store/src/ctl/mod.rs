//! Parametric CTL scripts.
//!
//! A CLUT script defines
//!
//! ```text
//! void ART_main(varying float r, varying float g, varying float b,
//!               output varying float rout, output varying float gout, output varying float bout,
//!               float gain, bool enable, int mode, float curve[256])
//! ```
//!
//! The first three inputs and the three outputs carry the pixels; every
//! further input is a uniform parameter described by an `@ART-param`
//! directive (see [`header`]). Parameters may be `bool`, `int`, `float` or
//! `float[n]`, the latter sampled from a curve parameter.
//!
//! Scripts are compiled once per content fingerprint and shared through the
//! store; each [`CtlLut`] holds one call handle per worker thread.

mod engine;
pub mod header;
mod shaper;

pub use engine::*;
pub use header::CtlHeader;
pub use shaper::Shaper;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use clut_core::{
    Curve, CurveKind, Fingerprint, ParamDescriptor, ParamKind, ParamValueMap, value_or_default,
};
use clut_lut::Lut3D;
use serde_json::Value;
use tracing::warn;

use crate::{ScriptError, StoreResult};

/// A compiled and validated script, as held by the store's cache.
#[derive(Clone)]
pub struct CtlScript {
    script: Arc<dyn CompiledScript>,
    fingerprint: Fingerprint,
    params: Vec<ParamDescriptor>,
    colorspace: String,
    lut_dim: usize,
}

impl std::fmt::Debug for CtlScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtlScript")
            .field("fingerprint", &self.fingerprint)
            .field("params", &self.params.len())
            .field("colorspace", &self.colorspace)
            .field("lut_dim", &self.lut_dim)
            .finish()
    }
}

fn signature_error(msg: impl Into<String>) -> ScriptError {
    ScriptError::Signature(msg.into())
}

/// Checks the pixel arguments of `ART_main`.
fn validate_signature(call: &dyn FunctionCall) -> Result<(), ScriptError> {
    let inputs = call.inputs();
    if inputs.len() < 3 {
        return Err(signature_error(format!(
            "{MAIN_FUNCTION} needs at least 3 inputs, found {}",
            inputs.len()
        )));
    }
    if let Some(a) = inputs[..3].iter().find(|a| !a.is_varying_float()) {
        return Err(signature_error(format!("input {} must be a varying float", a.name)));
    }

    let outputs = call.outputs();
    if outputs.len() != 3 {
        return Err(signature_error(format!(
            "{MAIN_FUNCTION} needs exactly 3 outputs, found {}",
            outputs.len()
        )));
    }
    if let Some(a) = outputs.iter().find(|a| !a.is_varying_float()) {
        return Err(signature_error(format!("output {} must be a varying float", a.name)));
    }
    Ok(())
}

/// Builds the parameter descriptors from the uniform inputs and the
/// `@ART-param` declarations, ordered by declaration line.
fn script_params(call: &dyn FunctionCall, header: &CtlHeader) -> Result<Vec<ParamDescriptor>, ScriptError> {
    let mut params = Vec::new();
    for a in &call.inputs()[3..] {
        if a.varying {
            return Err(signature_error(format!("parameter {} is varying", a.name)));
        }
        let kind = match a.ty {
            ArgType::Bool => ParamKind::Bool,
            ArgType::Int => ParamKind::Int,
            ArgType::Float => ParamKind::Float,
            ArgType::FloatArray(_) => ParamKind::Curve(CurveKind::Diagonal),
            ArgType::Other(ref t) => {
                return Err(signature_error(format!(
                    "parameter {} has unsupported type {t}",
                    a.name
                )));
            }
        };
        let mut desc = ParamDescriptor::new(a.name.as_str(), kind);
        if let Some(d) = &a.default {
            if !kind.is_curve() {
                desc.value_default = d.to_f64s();
            }
        }
        params.push(desc);
    }

    let mut pending: HashMap<String, usize> = params
        .iter()
        .enumerate()
        .map(|(i, p)| (p.name.clone(), i))
        .collect();
    let mut lines = vec![0usize; params.len()];

    for (line, decl) in &header.params {
        let name = decl
            .get(0)
            .and_then(Value::as_str)
            .ok_or_else(|| signature_error(format!("line {line}: parameter definition without a name")))?;
        let pos = pending
            .remove(name)
            .ok_or_else(|| signature_error(format!("line {line}: {name} is not a parameter of {MAIN_FUNCTION}")))?;
        params[pos]
            .fill_from_json(decl)
            .map_err(|e| signature_error(format!("line {line}: bad parameter definition: {e}")))?;
        lines[pos] = *line;
    }

    if !pending.is_empty() {
        let missing: BTreeSet<_> = pending.into_keys().collect();
        let missing: Vec<_> = missing.into_iter().collect();
        return Err(signature_error(format!(
            "missing parameter definitions: {}",
            missing.join(", ")
        )));
    }

    let mut ordered: Vec<_> = lines.into_iter().zip(params).collect();
    ordered.sort_by_key(|(line, _)| *line);
    Ok(ordered.into_iter().map(|(_, p)| p).collect())
}

impl CtlScript {
    /// Compiles `source` (the content of `path`) and validates it.
    pub fn compile(
        engine: &dyn ScriptEngine,
        path: &Path,
        source: &str,
        fingerprint: Fingerprint,
        module_paths: &[PathBuf],
    ) -> Result<Self, ScriptError> {
        let header = CtlHeader::parse(source)?;
        let script = engine.compile(path, module_paths)?;
        let call = script.new_call(MAIN_FUNCTION)?;
        validate_signature(call.as_ref())?;
        let params = script_params(call.as_ref(), &header)?;

        Ok(Self {
            script,
            fingerprint,
            params,
            colorspace: header.colorspace,
            lut_dim: header.lut_dim,
        })
    }

    /// Fingerprint of the compiled source.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Parameter descriptors, in declaration order.
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// Creates a [`CtlLut`] with `num_threads` call handles (at least one).
    pub fn instantiate(&self, num_threads: usize) -> Result<CtlLut, ScriptError> {
        let calls = (0..num_threads.max(1))
            .map(|_| self.script.new_call(MAIN_FUNCTION).map(Mutex::new))
            .collect::<Result<_, _>>()?;
        Ok(CtlLut {
            calls,
            params: self.params.clone(),
            colorspace: self.colorspace.clone(),
            lut_dim: self.lut_dim,
            max_samples: self.script.max_samples().max(1),
        })
    }
}

/// Per-pipeline handles to a script's `ART_main`.
pub struct CtlLut {
    calls: Vec<Mutex<Box<dyn FunctionCall>>>,
    params: Vec<ParamDescriptor>,
    colorspace: String,
    lut_dim: usize,
    max_samples: usize,
}

impl std::fmt::Debug for CtlLut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtlLut")
            .field("calls", &self.calls.len())
            .field("colorspace", &self.colorspace)
            .field("lut_dim", &self.lut_dim)
            .field("max_samples", &self.max_samples)
            .finish()
    }
}

impl CtlLut {
    /// Parameter descriptors.
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// Profile the script works in, empty for the working profile.
    pub fn colorspace(&self) -> &str {
        &self.colorspace
    }

    /// LUT resolution requested by the script, 0 for none.
    pub fn lut_dim(&self) -> usize {
        self.lut_dim
    }

    /// Samples per engine call.
    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Number of call handles.
    pub fn num_calls(&self) -> usize {
        self.calls.len()
    }

    // Worker ids past the handle count share a handle through its lock.
    fn call(&self, thread_id: usize) -> MutexGuard<'_, Box<dyn FunctionCall>> {
        self.calls[thread_id % self.calls.len()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds parameter values on every handle.
    ///
    /// Missing values fall back to the default. Names in `values` that are
    /// not parameters are reported when `verbose` is set.
    pub fn bind(&self, values: &ParamValueMap, verbose: bool) -> Result<(), ScriptError> {
        for desc in &self.params {
            let (vv, found) = value_or_default(desc, values);
            if !found {
                warn!(param = %desc.name, "no value given, using the default");
            }

            for call in &self.calls {
                let mut call = call.lock().unwrap_or_else(PoisonError::into_inner);
                let (index, arg) = call
                    .inputs()
                    .iter()
                    .enumerate()
                    .find(|(_, a)| a.name == desc.name)
                    .map(|(i, a)| (i, a.ty.clone()))
                    .ok_or_else(|| ScriptError::Call(format!("no parameter {}", desc.name)))?;
                let value = arg_value(desc, &arg, vv)?;
                call.set_uniform(index, value)?;
            }
        }

        if verbose {
            for name in values.keys() {
                if !self.params.iter().any(|p| &p.name == name) {
                    warn!(param = %name, "ignoring unknown parameter");
                }
            }
        }
        Ok(())
    }

    /// Runs the script in place over planar samples, in chunks of
    /// [`max_samples`](Self::max_samples).
    pub fn eval(&self, thread_id: usize, r: &mut [f32], g: &mut [f32], b: &mut [f32]) -> Result<(), ScriptError> {
        let n = r.len();
        if g.len() != n || b.len() != n {
            return Err(ScriptError::Call("plane lengths differ".into()));
        }
        let chunk = self.max_samples.min(n.max(1));
        let mut out = [vec![0.0f32; chunk], vec![0.0f32; chunk], vec![0.0f32; chunk]];
        let mut call = self.call(thread_id);

        let mut x = 0;
        while x < n {
            let end = (x + chunk).min(n);
            let m = end - x;
            let [o0, o1, o2] = &mut out;
            call.call(
                [&r[x..end], &g[x..end], &b[x..end]],
                [&mut o0[..m], &mut o1[..m], &mut o2[..m]],
            )?;
            r[x..end].copy_from_slice(&o0[..m]);
            g[x..end].copy_from_slice(&o1[..m]);
            b[x..end].copy_from_slice(&o2[..m]);
            x = end;
        }
        Ok(())
    }

    /// Tabulates the script on a `dim`³ lattice in shaper space.
    pub fn build_lut(&self, dim: usize, shaper: &Shaper) -> StoreResult<Lut3D> {
        let dim = dim.max(2);
        let step = (dim - 1) as f32;
        let axis: Vec<f32> = (0..dim).map(|i| shaper.eval(i as f32 / step, true)).collect();

        let total = dim * dim * dim;
        let mut planes = [
            Vec::with_capacity(total),
            Vec::with_capacity(total),
            Vec::with_capacity(total),
        ];
        for &r in &axis {
            for &g in &axis {
                for &b in &axis {
                    planes[0].push(r);
                    planes[1].push(g);
                    planes[2].push(b);
                }
            }
        }

        let [pr, pg, pb] = &mut planes;
        self.eval(0, pr, pg, pb)?;

        let flat: Vec<f32> = (0..total)
            .flat_map(|i| [pr[i], pg[i], pb[i]])
            .collect();
        Ok(Lut3D::from_blue_fastest(&flat, dim)?)
    }
}

/// Converts a parameter value to the argument type of the script.
fn arg_value(desc: &ParamDescriptor, ty: &ArgType, vv: &[f64]) -> Result<ArgValue, ScriptError> {
    let v = vv.first().copied().unwrap_or(0.0);
    let mismatch = || ScriptError::Call(format!("parameter {} cannot be bound as {ty}", desc.name));
    Ok(match (desc.kind, ty) {
        (ParamKind::Bool, ArgType::Bool) => ArgValue::Bool(v != 0.0),
        (ParamKind::Float, ArgType::Float) => ArgValue::Float(v as f32),
        (ParamKind::Int | ParamKind::Choice, ArgType::Int) => ArgValue::Int(v as i32),
        (ParamKind::Curve(kind), ArgType::FloatArray(n)) => {
            let curve = match kind {
                CurveKind::Diagonal => Curve::diagonal(vv),
                CurveKind::Flat => Curve::flat(vv, false),
                CurveKind::PeriodicFlat => Curve::flat(vv, true),
            };
            ArgValue::FloatArray(curve.sample(*n).into_iter().map(|x| x as f32).collect())
        }
        _ => return Err(mismatch()),
    })
}
