//! User-adjustable LUT parameters.
//!
//! A parameter is declared with a positional JSON array
//! `[name, label, ...]` whose tail depends on the parameter kind:
//!
//! | Kind | Layout |
//! |------|--------|
//! | bool | `[name, label, default?, group?, tooltip?]` |
//! | float | `[name, label, min, max, default?, step?, group?, tooltip?]` |
//! | int | `[name, label, min, max, default?, group?, tooltip?]` |
//! | choice | `[name, label, [options...], default?, group?, tooltip?]` |
//! | curve | `[name, label, 0\|1\|2, default?, bottom_gradient?, left_gradient?, group?, tooltip?]` |
//!
//! For curves the 3rd element selects diagonal (0), flat (1) or periodic
//! flat (2). The default is `0` (identity) or a curve definition whose
//! first element may be a type name such as `"Spline"`. Gradients are `0`
//! or arrays of `[pos, r, g, b]` stops, and a string in a gradient slot
//! starts the group/tooltip tail instead.
//!
//! Parsed values are exchanged as a [`ParamValueMap`]: scalar parameters
//! carry one number, curves their full definition vector.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::curve::{DiagonalCurveType, FlatCurveType};
use crate::{Error, Result};

/// Values of LUT parameters by name.
pub type ParamValueMap = BTreeMap<String, Vec<f64>>;

/// Variant of a curve parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveKind {
    /// Monotone input/output curve.
    Diagonal,
    /// Curve around a neutral 0.5 level.
    Flat,
    /// Flat curve wrapping around at the ends (e.g. a hue curve).
    PeriodicFlat,
}

/// Semantic kind of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// On/off switch.
    Bool,
    /// Integer slider.
    Int,
    /// Floating point slider.
    Float,
    /// Index into a list of labelled options.
    Choice,
    /// Curve sampled into a float array.
    Curve(CurveKind),
}

impl ParamKind {
    /// Kinds tried, in order, when a declaration does not state its kind.
    pub const PROBE_ORDER: [ParamKind; 4] = [
        ParamKind::Int,
        ParamKind::Float,
        ParamKind::Bool,
        ParamKind::Curve(CurveKind::Diagonal),
    ];

    /// True for the three curve kinds.
    pub fn is_curve(&self) -> bool {
        matches!(self, ParamKind::Curve(_))
    }
}

/// Schema of one user-adjustable LUT parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    /// Stable key used in value maps.
    pub name: String,
    /// Parameter kind.
    pub kind: ParamKind,
    /// Slider minimum.
    pub value_min: f64,
    /// Slider maximum.
    pub value_max: f64,
    /// One value for scalar kinds, a curve definition for curves.
    pub value_default: Vec<f64>,
    /// Option labels; non-empty only for [`ParamKind::Choice`].
    pub choices: Vec<String>,
    /// GUI label.
    pub gui_name: String,
    /// Collapsible GUI group, empty for none.
    pub gui_group: String,
    /// Slider step.
    pub gui_step: f64,
    /// GUI tooltip.
    pub gui_tooltip: String,
    /// Gradient drawn below a curve editor.
    pub gui_bottom_gradient: Vec<[f32; 4]>,
    /// Gradient drawn left of a curve editor.
    pub gui_left_gradient: Vec<[f32; 4]>,
}

impl ParamDescriptor {
    /// Creates a descriptor with a zero default and no GUI metadata.
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            value_min: 0.0,
            value_max: 1.0,
            value_default: vec![0.0],
            choices: Vec::new(),
            gui_name: String::new(),
            gui_group: String::new(),
            gui_step: 1.0,
            gui_tooltip: String::new(),
            gui_bottom_gradient: Vec::new(),
            gui_left_gradient: Vec::new(),
        }
    }

    /// Parses a declaration array as `kind`.
    pub fn parse(root: &Value, kind: ParamKind) -> Result<Self> {
        let mut desc = Self::new("", kind);
        desc.fill_from_json(root)?;
        Ok(desc)
    }

    /// Parses a declaration whose kind is unknown, trying
    /// [`ParamKind::PROBE_ORDER`] and keeping the first success.
    pub fn parse_any(root: &Value) -> Result<Self> {
        ParamKind::PROBE_ORDER
            .iter()
            .find_map(|kind| Self::parse(root, *kind).ok())
            .ok_or_else(|| Error::Param(format!("no parameter kind matches {root}")))
    }

    /// Updates this descriptor from a declaration array.
    ///
    /// Parsing dispatches on the current kind, which may be refined
    /// (int to choice, curve to its variant). The default value is only
    /// replaced when the declaration provides one. On error the descriptor
    /// is left unchanged.
    pub fn fill_from_json(&mut self, root: &Value) -> Result<()> {
        let mut next = self.clone();
        next.fill_inner(root)?;
        *self = next;
        Ok(())
    }

    fn fill_inner(&mut self, root: &Value) -> Result<()> {
        let arr = root
            .as_array()
            .ok_or_else(|| perr("declaration is not an array"))?;
        let sz = arr.len();
        if sz < 2 {
            return Err(perr("declaration needs at least a name and a label"));
        }
        self.name = string_at(arr, 0)?.to_string();
        self.gui_name = string_at(arr, 1)?.to_string();
        self.gui_group.clear();
        self.gui_tooltip.clear();
        self.gui_step = 1.0;
        self.choices.clear();

        match self.kind {
            ParamKind::Bool => self.fill_bool(arr),
            ParamKind::Float => self.fill_float(arr),
            ParamKind::Int | ParamKind::Choice => self.fill_int(arr),
            ParamKind::Curve(_) => self.fill_curve(arr),
        }
        .map_err(|e| match e {
            Error::Param(msg) => Error::Param(format!("`{}`: {msg}", self.name)),
            other => other,
        })
    }

    fn set_group_tooltip(&mut self, arr: &[Value], i: usize) -> Result<()> {
        self.gui_group = string_at(arr, i)?.to_string();
        if i + 1 < arr.len() {
            self.gui_tooltip = string_at(arr, i + 1)?.to_string();
        }
        Ok(())
    }

    fn fill_bool(&mut self, arr: &[Value]) -> Result<()> {
        let sz = arr.len();
        if sz > 5 {
            return Err(perr("bool declaration has more than 5 elements"));
        }
        if sz >= 3 {
            let v = arr[2]
                .as_bool()
                .ok_or_else(|| perr("bool default is not a boolean"))?;
            self.value_default = vec![f64::from(u8::from(v))];
        }
        if sz >= 4 {
            self.set_group_tooltip(arr, 3)?;
        }
        Ok(())
    }

    fn fill_float(&mut self, arr: &[Value]) -> Result<()> {
        let sz = arr.len();
        if !(4..=8).contains(&sz) {
            return Err(perr("float declaration must have 4 to 8 elements"));
        }
        self.value_min = number_at(arr, 2)?;
        self.value_max = number_at(arr, 3)?;
        if sz >= 5 {
            self.value_default = vec![number_at(arr, 4)?];
            self.gui_step = if sz >= 6 {
                number_at(arr, 5)?
            } else {
                (self.value_max - self.value_min) / 100.0
            };
            if sz >= 7 {
                self.set_group_tooltip(arr, 6)?;
            }
        }
        Ok(())
    }

    fn fill_int(&mut self, arr: &[Value]) -> Result<()> {
        let sz = arr.len();
        if !(3..=7).contains(&sz) {
            return Err(perr("int declaration must have 3 to 7 elements"));
        }

        if let Some(options) = arr[2].as_array() {
            self.choices = options
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| perr("choice options must be strings"))?;
            self.kind = ParamKind::Choice;
            self.value_min = 0.0;
            self.value_max = self.choices.len().saturating_sub(1) as f64;
            if sz >= 4 {
                self.value_default = vec![int_at(arr, 3)?];
                if sz >= 5 {
                    self.set_group_tooltip(arr, 4)?;
                }
            }
            return Ok(());
        }

        if sz < 4 {
            return Err(perr("int declaration needs min and max"));
        }
        self.kind = ParamKind::Int;
        self.value_min = int_at(arr, 2)?;
        self.value_max = int_at(arr, 3)?;
        if sz >= 5 {
            self.value_default = vec![int_at(arr, 4)?];
            if sz >= 6 {
                self.set_group_tooltip(arr, 5)?;
            }
        }
        Ok(())
    }

    fn fill_curve(&mut self, arr: &[Value]) -> Result<()> {
        let sz = arr.len();
        if sz == 2 {
            return Ok(());
        }
        if sz > 8 {
            return Err(perr("curve declaration has more than 8 elements"));
        }

        self.kind = match int_at(arr, 2)? as i64 {
            0 => ParamKind::Curve(CurveKind::Diagonal),
            1 => ParamKind::Curve(CurveKind::Flat),
            2 => ParamKind::Curve(CurveKind::PeriodicFlat),
            other => return Err(perr(format!("unknown curve variant {other}"))),
        };

        if sz >= 4 {
            self.value_default = parse_curve_default(&arr[3])?;
        }
        if sz >= 5 {
            if self.set_group_tooltip(arr, 4).is_ok() {
                return Ok(());
            }
            self.gui_bottom_gradient = parse_gradient(&arr[4])?;
            if sz >= 6 {
                if self.set_group_tooltip(arr, 5).is_ok() {
                    return Ok(());
                }
                self.gui_left_gradient = parse_gradient(&arr[5])?;
                if sz >= 7 {
                    self.set_group_tooltip(arr, 6)?;
                }
            }
        }
        Ok(())
    }
}

fn perr(msg: impl Into<String>) -> Error {
    Error::Param(msg.into())
}

fn string_at(arr: &[Value], i: usize) -> Result<&str> {
    arr[i]
        .as_str()
        .ok_or_else(|| perr(format!("element {i} is not a string")))
}

fn number_at(arr: &[Value], i: usize) -> Result<f64> {
    arr[i]
        .as_f64()
        .ok_or_else(|| perr(format!("element {i} is not a number")))
}

fn int_at(arr: &[Value], i: usize) -> Result<f64> {
    let v = number_at(arr, i)?;
    if v.fract() != 0.0 {
        return Err(perr(format!("element {i} is not an integer")));
    }
    Ok(v)
}

fn parse_curve_default(v: &Value) -> Result<Vec<f64>> {
    if v.as_f64() == Some(0.0) {
        return Ok(vec![0.0]);
    }
    let items = v
        .as_array()
        .ok_or_else(|| perr("curve default must be 0 or an array"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(name) if i == 0 => curve_type_id(name)
                .ok_or_else(|| perr(format!("unknown curve type `{name}`"))),
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| perr("curve point is not representable")),
            _ => Err(perr("curve definition must contain numbers")),
        })
        .collect()
}

fn curve_type_id(name: &str) -> Option<f64> {
    let id = match name {
        "Linear" => DiagonalCurveType::Linear as i32,
        "Spline" => DiagonalCurveType::Spline as i32,
        "CatmullRom" => DiagonalCurveType::CatmullRom as i32,
        "NURBS" => DiagonalCurveType::Nurbs as i32,
        "Parametric" => DiagonalCurveType::Parametric as i32,
        "ControlPoints" => FlatCurveType::MinMaxCPoints as i32,
        _ => return None,
    };
    Some(f64::from(id))
}

fn parse_gradient(v: &Value) -> Result<Vec<[f32; 4]>> {
    if v.as_f64() == Some(0.0) {
        return Ok(Vec::new());
    }
    let stops = v
        .as_array()
        .ok_or_else(|| perr("gradient must be 0 or an array"))?;
    stops
        .iter()
        .map(|stop| {
            let s = stop
                .as_array()
                .filter(|s| s.len() == 4)
                .ok_or_else(|| perr("gradient stop must have 4 elements"))?;
            let mut out = [0.0f32; 4];
            for (c, e) in s.iter().enumerate() {
                out[c] = e
                    .as_f64()
                    .ok_or_else(|| perr("gradient stop must contain numbers"))?
                    as f32;
            }
            Ok(out)
        })
        .collect()
}

// ============================================================================
// Value maps
// ============================================================================

/// Value map holding every descriptor's default.
pub fn default_values(params: &[ParamDescriptor]) -> ParamValueMap {
    params
        .iter()
        .map(|p| (p.name.clone(), p.value_default.clone()))
        .collect()
}

/// Looks up `desc` in `values`, falling back to its default.
///
/// The second element is false when the fallback was used.
pub fn value_or_default<'a>(desc: &'a ParamDescriptor, values: &'a ParamValueMap) -> (&'a [f64], bool) {
    match values.get(&desc.name) {
        Some(v) if !v.is_empty() => (v, true),
        _ => (&desc.value_default, false),
    }
}

/// Serializes `values` to a compact JSON object keyed by parameter name.
///
/// Booleans become JSON booleans, ints and choices integers, curves arrays.
/// Missing entries take the descriptor's default.
pub fn values_to_json(params: &[ParamDescriptor], values: &ParamValueMap) -> Result<String> {
    let mut root = Map::new();
    for p in params {
        let (vv, _) = value_or_default(p, values);
        let Some(&v) = vv.first() else {
            return Err(Error::Value {
                name: p.name.clone(),
                reason: "no value and no default".into(),
            });
        };
        let val = match p.kind {
            ParamKind::Bool => Value::Bool(v != 0.0),
            ParamKind::Int | ParamKind::Choice => Value::from(v.round() as i64),
            ParamKind::Float => float_value(&p.name, v)?,
            ParamKind::Curve(_) => Value::Array(
                vv.iter()
                    .map(|x| float_value(&p.name, *x))
                    .collect::<Result<_>>()?,
            ),
        };
        root.insert(p.name.clone(), val);
    }
    Ok(serde_json::to_string(&Value::Object(root))?)
}

fn float_value(name: &str, v: f64) -> Result<Value> {
    Number::from_f64(v).map(Value::Number).ok_or_else(|| Error::Value {
        name: name.to_string(),
        reason: format!("{v} is not a finite number"),
    })
}

/// Parses a JSON object produced by [`values_to_json`].
///
/// Names not matching a descriptor are ignored.
pub fn values_from_json(params: &[ParamDescriptor], json: &str) -> Result<ParamValueMap> {
    let root: Value = serde_json::from_str(json)?;
    let obj = root
        .as_object()
        .ok_or_else(|| Error::Config("parameter values must be a JSON object".into()))?;

    let mut out = ParamValueMap::new();
    for p in params {
        let Some(v) = obj.get(&p.name) else {
            continue;
        };
        let bad = |reason: &str| Error::Value {
            name: p.name.clone(),
            reason: reason.to_string(),
        };
        let vv = match (p.kind, v) {
            (ParamKind::Bool, Value::Bool(b)) => vec![f64::from(u8::from(*b))],
            (ParamKind::Curve(_), Value::Array(items)) => items
                .iter()
                .map(|x| x.as_f64().ok_or_else(|| bad("curve values must be numbers")))
                .collect::<Result<_>>()?,
            (ParamKind::Int | ParamKind::Choice | ParamKind::Float, Value::Number(n)) => {
                vec![n.as_f64().ok_or_else(|| bad("number out of range"))?]
            }
            _ => return Err(bad("value has the wrong JSON type")),
        };
        out.insert(p.name.clone(), vv);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool() {
        let d = ParamDescriptor::parse(&json!(["on", "Enabled", true, "Main", "tip"]), ParamKind::Bool).unwrap();
        assert_eq!(d.value_default, vec![1.0]);
        assert_eq!(d.gui_group, "Main");
        assert_eq!(d.gui_tooltip, "tip");

        let d = ParamDescriptor::parse(&json!(["on", "Enabled"]), ParamKind::Bool).unwrap();
        assert_eq!(d.value_default, vec![0.0]);

        assert!(ParamDescriptor::parse(&json!(["on", "Enabled", 1]), ParamKind::Bool).is_err());
        assert!(ParamDescriptor::parse(&json!(["on", "Enabled", true, "g", "t", "x"]), ParamKind::Bool).is_err());
    }

    #[test]
    fn test_float_step() {
        let d = ParamDescriptor::parse(&json!(["gain", "Gain", -1.0, 3.0]), ParamKind::Float).unwrap();
        assert_eq!(d.gui_step, 1.0);
        assert_eq!(d.value_default, vec![0.0]);

        let d = ParamDescriptor::parse(&json!(["gain", "Gain", -1.0, 3.0, 1.0, 0.5, "grp"]), ParamKind::Float).unwrap();
        assert_eq!(d.gui_step, 0.5);
        assert_eq!(d.gui_group, "grp");

        assert!(ParamDescriptor::parse(&json!(["gain", "Gain", "x", 3.0]), ParamKind::Float).is_err());
        assert!(ParamDescriptor::parse(&json!(["gain", "Gain", 0.0]), ParamKind::Float).is_err());
    }

    #[test]
    fn test_int_and_choice() {
        let d = ParamDescriptor::parse(&json!(["n", "Count", 1, 10, 4]), ParamKind::Int).unwrap();
        assert_eq!(d.kind, ParamKind::Int);
        assert_eq!((d.value_min, d.value_max), (1.0, 10.0));
        assert_eq!(d.value_default, vec![4.0]);
        assert!(ParamDescriptor::parse(&json!(["n", "Count", 1, 10.5]), ParamKind::Int).is_err());

        let d = ParamDescriptor::parse(&json!(["mode", "Mode", ["a", "b", "c"], 2, "grp"]), ParamKind::Int).unwrap();
        assert_eq!(d.kind, ParamKind::Choice);
        assert_eq!(d.choices, vec!["a", "b", "c"]);
        assert_eq!(d.value_default, vec![2.0]);
        assert_eq!(d.value_max, 2.0);

        assert!(ParamDescriptor::parse(&json!(["mode", "Mode", ["a", 1]]), ParamKind::Int).is_err());
        assert!(ParamDescriptor::parse(&json!(["n", "Count", 3]), ParamKind::Int).is_err());
    }

    #[test]
    fn test_curve() {
        let d = ParamDescriptor::parse(
            &json!(["c", "Curve", 0, ["Spline", 0.0, 0.0, 0.5, 0.6, 1.0, 1.0]]),
            ParamKind::Curve(CurveKind::Diagonal),
        )
        .unwrap();
        assert_eq!(d.kind, ParamKind::Curve(CurveKind::Diagonal));
        assert_eq!(d.value_default[0], DiagonalCurveType::Spline as i32 as f64);
        assert_eq!(d.value_default.len(), 7);

        let d = ParamDescriptor::parse(
            &json!(["h", "Hue", 2, 0, [[0.0, 1.0, 0.0, 0.0], [1.0, 0.0, 0.0, 1.0]], 0, "grp", "tip"]),
            ParamKind::Curve(CurveKind::Diagonal),
        )
        .unwrap();
        assert_eq!(d.kind, ParamKind::Curve(CurveKind::PeriodicFlat));
        assert_eq!(d.gui_bottom_gradient.len(), 2);
        assert!(d.gui_left_gradient.is_empty());
        assert_eq!(d.gui_group, "grp");
        assert_eq!(d.gui_tooltip, "tip");

        let d = ParamDescriptor::parse(&json!(["f", "Flat", 1, 0, "grp"]), ParamKind::Curve(CurveKind::Diagonal)).unwrap();
        assert_eq!(d.kind, ParamKind::Curve(CurveKind::Flat));
        assert_eq!(d.gui_group, "grp");

        assert!(ParamDescriptor::parse(&json!(["c", "C", 3]), ParamKind::Curve(CurveKind::Diagonal)).is_err());
        assert!(ParamDescriptor::parse(&json!(["c", "C", 0, ["Bogus", 1.0]]), ParamKind::Curve(CurveKind::Diagonal)).is_err());
        assert!(ParamDescriptor::parse(&json!(["c", "C", 0, 0, [[1.0, 2.0]]]), ParamKind::Curve(CurveKind::Diagonal)).is_err());
    }

    #[test]
    fn test_parse_any_order() {
        assert_eq!(ParamDescriptor::parse_any(&json!(["a", "A", 0, 5, 2])).unwrap().kind, ParamKind::Int);
        assert_eq!(ParamDescriptor::parse_any(&json!(["a", "A", 0, 1, 0.5])).unwrap().kind, ParamKind::Float);
        assert_eq!(ParamDescriptor::parse_any(&json!(["a", "A", false])).unwrap().kind, ParamKind::Bool);
        assert_eq!(
            ParamDescriptor::parse_any(&json!(["a", "A", 1, 0, "grp"])).unwrap().kind,
            ParamKind::Curve(CurveKind::Flat)
        );
        assert!(ParamDescriptor::parse_any(&json!(["a"])).is_err());
        assert!(ParamDescriptor::parse_any(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_failed_fill_leaves_descriptor() {
        let mut d = ParamDescriptor::new("x", ParamKind::Float);
        d.value_default = vec![0.25];
        assert!(d.fill_from_json(&json!(["x", "X", 0.0, "bad"])).is_err());
        assert_eq!(d.value_default, vec![0.25]);
        assert!(d.gui_name.is_empty());

        d.fill_from_json(&json!(["x", "X", 0.0, 1.0])).unwrap();
        assert_eq!(d.value_default, vec![0.25]);
        assert_eq!(d.gui_name, "X");
    }

    #[test]
    fn test_values_json_roundtrip() {
        let params = vec![
            ParamDescriptor::parse(&json!(["b", "B", true]), ParamKind::Bool).unwrap(),
            ParamDescriptor::parse(&json!(["i", "I", -5, 5, 3]), ParamKind::Int).unwrap(),
            ParamDescriptor::parse(&json!(["c", "C", ["x", "y"], 1]), ParamKind::Int).unwrap(),
            ParamDescriptor::parse(&json!(["f", "F", 0.0, 2.0, 1.25]), ParamKind::Float).unwrap(),
            ParamDescriptor::parse(&json!(["k", "K", 0, ["Linear", 0.0, 0.0, 1.0, 0.8]]), ParamKind::Curve(CurveKind::Diagonal)).unwrap(),
        ];
        let defaults = default_values(&params);
        let json = values_to_json(&params, &defaults).unwrap();
        assert!(json.contains("\"b\":true"));
        assert!(json.contains("\"i\":3"));
        let back = values_from_json(&params, &json).unwrap();
        assert_eq!(back, defaults);
    }

    #[test]
    fn test_values_json_missing_uses_default() {
        let params = vec![
            ParamDescriptor::parse(&json!(["gain", "Gain", 0.0, 4.0, 1.5]), ParamKind::Float).unwrap(),
            ParamDescriptor::parse(&json!(["invert", "Invert", true]), ParamKind::Bool).unwrap(),
        ];
        let mut values = ParamValueMap::new();
        values.insert("gain".into(), vec![2.0]);
        assert_eq!(values_to_json(&params, &values).unwrap(), r#"{"gain":2.0,"invert":true}"#);

        // An empty entry counts as missing.
        values.insert("invert".into(), Vec::new());
        assert_eq!(values_to_json(&params, &values).unwrap(), r#"{"gain":2.0,"invert":true}"#);

        let mut bare = ParamDescriptor::new("x", ParamKind::Float);
        bare.value_default.clear();
        assert!(values_to_json(&[bare], &ParamValueMap::new()).is_err());
    }
}
