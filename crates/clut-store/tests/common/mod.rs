//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clut_core::StoreConfig;
use clut_lut::{Rgb16Image, write_png16};
use clut_store::ctl::{ArgInfo, ArgType, ArgValue, CompiledScript, FunctionCall, ScriptEngine};
use clut_store::{CommandOutput, CommandRunner, ScriptError, SubprocessError};

/// Store settings rooted in `dir`.
pub fn config(dir: &Path) -> StoreConfig {
    StoreConfig {
        luts_dir: dir.to_path_buf(),
        disk_cache_dir: dir.join("cache"),
        ..StoreConfig::default()
    }
}

/// Writes an identity Hald image of `level`.
pub fn write_identity_hald(path: &Path, level: u32) {
    write_png16(path, &Rgb16Image::identity_hald(level)).unwrap();
}

/// Writes a Hald image mapping every color to its complement.
pub fn write_negative_hald(path: &Path, level: u32) {
    let mut img = Rgb16Image::identity_hald(level);
    img.data.iter_mut().for_each(|v| *v = 65535 - *v);
    write_png16(path, &img).unwrap();
}

/// CLF document scaling every channel by `gain`.
pub fn gain_clf(gain: f64) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ProcessList id="gain" compCLFversion="3.0">
  <Matrix inBitDepth="32f" outBitDepth="32f">
    <Array dim="3 3">{gain} 0 0 0 {gain} 0 0 0 {gain}</Array>
  </Matrix>
</ProcessList>
"#
    )
}

/// Per-channel comparison, relative to the expected value (absolute below 1).
pub fn assert_close(actual: [f32; 3], expected: [f32; 3], rel: f32) {
    for c in 0..3 {
        approx::assert_abs_diff_eq!(actual[c], expected[c], epsilon = rel * expected[c].abs().max(1.0));
    }
}

// ============================================================================
// Command runner
// ============================================================================

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub workdir: PathBuf,
    pub argv: Vec<String>,
    pub params_json: String,
}

/// Runner that writes a gain CLF, reading the gain from the `gain`
/// parameter (1 when absent).
#[derive(Debug, Default)]
pub struct FakeRunner {
    pub invocations: Mutex<Vec<Invocation>>,
    pub fail: bool,
}

impl FakeRunner {
    pub fn count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    pub fn last(&self) -> Invocation {
        self.invocations.lock().unwrap().last().cloned().unwrap()
    }
}

impl CommandRunner for FakeRunner {
    fn exec_sync(
        &self,
        workdir: &Path,
        argv: &[String],
        _timeout: Option<Duration>,
    ) -> Result<CommandOutput, SubprocessError> {
        let n = argv.len();
        let params_json = fs::read_to_string(&argv[n - 2]).unwrap();
        self.invocations.lock().unwrap().push(Invocation {
            workdir: workdir.to_path_buf(),
            argv: argv.to_vec(),
            params_json: params_json.clone(),
        });
        if self.fail {
            return Err(SubprocessError::ExitStatus {
                program: argv[0].clone(),
                status: "exit status: 1".into(),
                stderr: "generator crashed".into(),
            });
        }

        let params: serde_json::Value = serde_json::from_str(&params_json).unwrap();
        let gain = params.get("gain").and_then(|v| v.as_f64()).unwrap_or(1.0);
        fs::write(&argv[n - 1], gain_clf(gain)).unwrap();
        Ok(CommandOutput {
            stdout: "ok".into(),
            stderr: String::new(),
        })
    }
}

// ============================================================================
// Script engine
// ============================================================================

/// Engine whose every script has the same `ART_main` signature and scales
/// its input by the `gain` uniform (1 when unbound). A true `fail` uniform
/// makes evaluation fail.
pub struct FakeEngine {
    pub inputs: Vec<ArgInfo>,
    pub outputs: Vec<ArgInfo>,
    pub max_samples: usize,
    pub compiles: AtomicUsize,
    pub module_paths: Mutex<Vec<PathBuf>>,
    pub samples: Arc<AtomicUsize>,
    pub bound: Arc<Mutex<Vec<(String, ArgValue)>>>,
}

impl FakeEngine {
    /// `ART_main(r, g, b, out r, out g, out b, <uniforms>)`.
    pub fn new(uniforms: Vec<ArgInfo>) -> Self {
        let mut inputs = vec![
            ArgInfo::varying_float("r"),
            ArgInfo::varying_float("g"),
            ArgInfo::varying_float("b"),
        ];
        inputs.extend(uniforms);
        Self {
            inputs,
            outputs: vec![
                ArgInfo::varying_float("rout"),
                ArgInfo::varying_float("gout"),
                ArgInfo::varying_float("bout"),
            ],
            max_samples: 7,
            compiles: AtomicUsize::new(0),
            module_paths: Mutex::new(Vec::new()),
            samples: Arc::new(AtomicUsize::new(0)),
            bound: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Engine for `float gain = 1.0`.
    pub fn gain() -> Self {
        Self::new(vec![ArgInfo::uniform(
            "gain",
            ArgType::Float,
            Some(ArgValue::Float(1.0)),
        )])
    }

    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }

    pub fn bound(&self, name: &str) -> Option<ArgValue> {
        self.bound
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

impl ScriptEngine for FakeEngine {
    fn compile(&self, path: &Path, module_paths: &[PathBuf]) -> Result<Arc<dyn CompiledScript>, ScriptError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        *self.module_paths.lock().unwrap() = module_paths.to_vec();
        let source = fs::read_to_string(path).map_err(|e| ScriptError::Compile(e.to_string()))?;
        if source.contains("syntax error") {
            return Err(ScriptError::Compile("syntax error".into()));
        }
        Ok(Arc::new(FakeScript {
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            max_samples: self.max_samples,
            samples: Arc::clone(&self.samples),
            bound: Arc::clone(&self.bound),
        }))
    }
}

struct FakeScript {
    inputs: Vec<ArgInfo>,
    outputs: Vec<ArgInfo>,
    max_samples: usize,
    samples: Arc<AtomicUsize>,
    bound: Arc<Mutex<Vec<(String, ArgValue)>>>,
}

impl CompiledScript for FakeScript {
    fn new_call(&self, function: &str) -> Result<Box<dyn FunctionCall>, ScriptError> {
        if function != "ART_main" {
            return Err(ScriptError::Call(format!("no function {function}")));
        }
        Ok(Box::new(FakeCall {
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            max_samples: self.max_samples,
            uniforms: HashMap::new(),
            samples: Arc::clone(&self.samples),
            bound: Arc::clone(&self.bound),
        }))
    }

    fn max_samples(&self) -> usize {
        self.max_samples
    }
}

struct FakeCall {
    inputs: Vec<ArgInfo>,
    outputs: Vec<ArgInfo>,
    max_samples: usize,
    uniforms: HashMap<String, ArgValue>,
    samples: Arc<AtomicUsize>,
    bound: Arc<Mutex<Vec<(String, ArgValue)>>>,
}

impl FunctionCall for FakeCall {
    fn inputs(&self) -> &[ArgInfo] {
        &self.inputs
    }

    fn outputs(&self) -> &[ArgInfo] {
        &self.outputs
    }

    fn set_uniform(&mut self, index: usize, value: ArgValue) -> Result<(), ScriptError> {
        let name = self.inputs[index].name.clone();
        self.bound.lock().unwrap().push((name.clone(), value.clone()));
        self.uniforms.insert(name, value);
        Ok(())
    }

    fn call(&mut self, input: [&[f32]; 3], output: [&mut [f32]; 3]) -> Result<(), ScriptError> {
        let n = input[0].len();
        if n > self.max_samples {
            return Err(ScriptError::Call(format!("{n} samples exceed the limit")));
        }
        if self.uniforms.get("fail") == Some(&ArgValue::Bool(true)) {
            return Err(ScriptError::Call("requested failure".into()));
        }
        let gain = match self.uniforms.get("gain") {
            Some(ArgValue::Float(g)) => *g,
            _ => 1.0,
        };
        for (inp, out) in input.iter().zip(output) {
            for (o, i) in out.iter_mut().zip(inp.iter()) {
                *o = i * gain;
            }
        }
        self.samples.fetch_add(n, Ordering::SeqCst);
        Ok(())
    }
}
