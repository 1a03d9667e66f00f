//! Interface to a CTL interpreter.
//!
//! The store compiles scripts and evaluates `ART_main` through these traits
//! only. No interpreter ships with the crate; a host registers one with
//! [`ClutStore::with_script_engine`](crate::ClutStore::with_script_engine).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ScriptError;

/// Name of the entry point every CLUT script must define.
pub const MAIN_FUNCTION: &str = "ART_main";

/// Type of a function argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    /// `bool`
    Bool,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `float[n]`
    FloatArray(usize),
    /// Any other type, by name.
    Other(String),
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::Bool => f.write_str("bool"),
            ArgType::Int => f.write_str("int"),
            ArgType::Float => f.write_str("float"),
            ArgType::FloatArray(n) => write!(f, "float[{n}]"),
            ArgType::Other(name) => f.write_str(name),
        }
    }
}

/// A uniform argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// `bool`
    Bool(bool),
    /// `int`
    Int(i32),
    /// `float`
    Float(f32),
    /// `float[n]`
    FloatArray(Vec<f32>),
}

impl ArgValue {
    /// Flattens the value to the parameter value-map representation.
    pub fn to_f64s(&self) -> Vec<f64> {
        match self {
            ArgValue::Bool(b) => vec![f64::from(u8::from(*b))],
            ArgValue::Int(i) => vec![f64::from(*i)],
            ArgValue::Float(x) => vec![f64::from(*x)],
            ArgValue::FloatArray(v) => v.iter().map(|x| f64::from(*x)).collect(),
        }
    }
}

/// Declaration of one function argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgInfo {
    /// Argument name.
    pub name: String,
    /// Declared type.
    pub ty: ArgType,
    /// Per-sample (`varying`) rather than uniform.
    pub varying: bool,
    /// Default from the signature, if declared.
    pub default: Option<ArgValue>,
}

impl ArgInfo {
    /// Varying float argument.
    pub fn varying_float(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ArgType::Float,
            varying: true,
            default: None,
        }
    }

    /// Uniform argument of type `ty`.
    pub fn uniform(name: impl Into<String>, ty: ArgType, default: Option<ArgValue>) -> Self {
        Self {
            name: name.into(),
            ty,
            varying: false,
            default,
        }
    }

    pub(crate) fn is_varying_float(&self) -> bool {
        self.varying && self.ty == ArgType::Float
    }
}

/// A CTL interpreter.
pub trait ScriptEngine: Send + Sync {
    /// Compiles the script at `path`, resolving imports from `module_paths`.
    fn compile(&self, path: &Path, module_paths: &[PathBuf]) -> Result<Arc<dyn CompiledScript>, ScriptError>;
}

/// A compiled script.
pub trait CompiledScript: Send + Sync {
    /// Creates a call handle for `function`.
    ///
    /// Handles are not shared between threads; callers create one per worker.
    fn new_call(&self, function: &str) -> Result<Box<dyn FunctionCall>, ScriptError>;

    /// Maximum number of samples per [`FunctionCall::call`].
    fn max_samples(&self) -> usize;
}

/// A bound invocation of one script function.
pub trait FunctionCall: Send {
    /// Input arguments in declaration order.
    fn inputs(&self) -> &[ArgInfo];

    /// Output arguments in declaration order.
    fn outputs(&self) -> &[ArgInfo];

    /// Binds uniform input `index`.
    fn set_uniform(&mut self, index: usize, value: ArgValue) -> Result<(), ScriptError>;

    /// Evaluates the function over `input[c].len()` samples.
    ///
    /// The three varying inputs and outputs are planar and equally long,
    /// at most [`CompiledScript::max_samples`].
    fn call(&mut self, input: [&[f32]; 3], output: [&mut [f32]; 3]) -> Result<(), ScriptError>;
}
