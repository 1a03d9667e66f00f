//! Academy Common LUT Format (CLF) reader.
//!
//! CLF is an XML format describing a chain of color operations. External
//! LUT generators emit it, and the engine applies it to normalized RGB.
//!
//! # Supported Process Nodes
//!
//! - `Matrix` - 3x3 or 3x4 (with offset column)
//! - `LUT1D` - per-channel curves, 1 or 3 columns
//! - `LUT3D` - cube with trilinear or tetrahedral interpolation
//! - `Range` - scale/offset with optional clamping
//! - `ASC_CDL` - slope/offset/power/saturation
//! - `Log` - log10/log2 and the parametric lin/log styles
//! - `Exponent` - basic and monitor-curve styles
//!
//! Values stored at integer bit depths are normalized while parsing, so every
//! node of a [`ProcessList`] operates on `[0, 1]`-scaled data.
//!
//! # Compression
//!
//! [`read_clf`] recognizes gzip-compressed files (`.clfz`) by their magic
//! bytes and decompresses them on the fly.
//!
//! # Example
//!
//! ```rust
//! use clut_lut::clf::parse_clf;
//!
//! let xml = r#"<ProcessList id="gain" compCLFversion="3">
//!   <Matrix inBitDepth="32f" outBitDepth="32f">
//!     <Array dim="3 3">2 0 0 0 2 0 0 0 2</Array>
//!   </Matrix>
//! </ProcessList>"#;
//! let list = parse_clf(xml.as_bytes()).unwrap();
//! assert_eq!(list.apply([0.1, 0.2, 0.3]), [0.2, 0.4, 0.6]);
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use clut_math::Mat3;
use flate2::bufread::GzDecoder;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::{Interpolation, Lut1D, Lut3D, LutError, LutResult};

/// Bit depth of node input or output values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    /// 8-bit integer (0-255)
    Uint8,
    /// 10-bit integer (0-1023)
    Uint10,
    /// 12-bit integer (0-4095)
    Uint12,
    /// 16-bit integer (0-65535)
    Uint16,
    /// 16-bit half float
    Float16,
    /// 32-bit float
    #[default]
    Float32,
}

impl BitDepth {
    /// Value representing 1.0 at this depth.
    #[inline]
    pub fn scale(&self) -> f32 {
        match self {
            BitDepth::Uint8 => 255.0,
            BitDepth::Uint10 => 1023.0,
            BitDepth::Uint12 => 4095.0,
            BitDepth::Uint16 => 65535.0,
            BitDepth::Float16 | BitDepth::Float32 => 1.0,
        }
    }

    /// Parses a CLF depth token such as `"10i"` or `"32f"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "8i" => Some(BitDepth::Uint8),
            "10i" => Some(BitDepth::Uint10),
            "12i" => Some(BitDepth::Uint12),
            "16i" => Some(BitDepth::Uint16),
            "16f" => Some(BitDepth::Float16),
            "32f" => Some(BitDepth::Float32),
            _ => None,
        }
    }
}

/// Linear remapping of `[min_in, max_in]` onto `[min_out, max_out]`.
///
/// When only the minimum (or only the maximum) pair is given the node
/// offsets the input and clamps on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeParams {
    /// Input minimum.
    pub min_in: Option<f32>,
    /// Input maximum.
    pub max_in: Option<f32>,
    /// Output minimum.
    pub min_out: Option<f32>,
    /// Output maximum.
    pub max_out: Option<f32>,
    /// Clamp to the output bounds (`style="Clamp"`, the default).
    pub clamp: bool,
}

impl RangeParams {
    fn apply_value(&self, v: f32) -> f32 {
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(lo_in), Some(hi_in), Some(lo_out), Some(hi_out)) => {
                let span = hi_in - lo_in;
                let out = if span.abs() < 1e-10 {
                    lo_out
                } else {
                    (v - lo_in) * (hi_out - lo_out) / span + lo_out
                };
                if self.clamp { out.clamp(lo_out.min(hi_out), lo_out.max(hi_out)) } else { out }
            }
            (Some(lo_in), _, Some(lo_out), _) => {
                let out = v - lo_in + lo_out;
                if self.clamp { out.max(lo_out) } else { out }
            }
            (_, Some(hi_in), _, Some(hi_out)) => {
                let out = v - hi_in + hi_out;
                if self.clamp { out.min(hi_out) } else { out }
            }
            _ => v,
        }
    }

    /// Applies the range to an RGB triple.
    pub fn apply(&self, rgb: &mut [f32; 3]) {
        for v in rgb.iter_mut() {
            *v = self.apply_value(*v);
        }
    }
}

/// Direction and clamping of an ASC CDL node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CdlStyle {
    /// v1.2 forward, clamped.
    #[default]
    Fwd,
    /// v1.2 inverse, clamped.
    Rev,
    /// Forward without clamping.
    FwdNoClamp,
    /// Inverse without clamping.
    RevNoClamp,
}

/// ASC CDL parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CdlParams {
    /// Style attribute.
    pub style: CdlStyle,
    /// Per-channel slope.
    pub slope: [f32; 3],
    /// Per-channel offset.
    pub offset: [f32; 3],
    /// Per-channel power.
    pub power: [f32; 3],
    /// Saturation (Rec.709 luma weights).
    pub saturation: f32,
}

impl Default for CdlParams {
    fn default() -> Self {
        Self {
            style: CdlStyle::Fwd,
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 1.0,
        }
    }
}

const REC709_LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

fn saturate(rgb: &mut [f32; 3], sat: f32) {
    let luma = REC709_LUMA[0] * rgb[0] + REC709_LUMA[1] * rgb[1] + REC709_LUMA[2] * rgb[2];
    for v in rgb.iter_mut() {
        *v = luma + (*v - luma) * sat;
    }
}

impl CdlParams {
    /// Applies the CDL to an RGB triple.
    pub fn apply(&self, rgb: &mut [f32; 3]) {
        let clamp = matches!(self.style, CdlStyle::Fwd | CdlStyle::Rev);
        let clip = |v: f32| if clamp { v.clamp(0.0, 1.0) } else { v };
        match self.style {
            CdlStyle::Fwd | CdlStyle::FwdNoClamp => {
                for i in 0..3 {
                    let v = rgb[i] * self.slope[i] + self.offset[i];
                    rgb[i] = if v > 0.0 { clip(v).powf(self.power[i]) } else { clip(v) };
                }
                saturate(rgb, self.saturation);
                rgb.iter_mut().for_each(|v| *v = clip(*v));
            }
            CdlStyle::Rev | CdlStyle::RevNoClamp => {
                rgb.iter_mut().for_each(|v| *v = clip(*v));
                if self.saturation.abs() > 1e-10 {
                    saturate(rgb, 1.0 / self.saturation);
                }
                for i in 0..3 {
                    let v = clip(rgb[i]);
                    let v = if v > 0.0 { v.powf(1.0 / self.power[i]) } else { v };
                    rgb[i] = clip((v - self.offset[i]) / self.slope[i]);
                }
            }
        }
    }
}

/// Style of a `Log` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    /// `log10(x)`
    Log10,
    /// `log2(x)`
    Log2,
    /// `10^x`
    AntiLog10,
    /// `2^x`
    AntiLog2,
    /// Parametric linear to log.
    LinToLog,
    /// Parametric log to linear.
    LogToLin,
    /// Parametric linear to log with a linear toe below `linSideBreak`.
    CameraLinToLog,
    /// Inverse of [`LogStyle::CameraLinToLog`].
    CameraLogToLin,
}

impl LogStyle {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "log10" => LogStyle::Log10,
            "log2" => LogStyle::Log2,
            "antiLog10" => LogStyle::AntiLog10,
            "antiLog2" => LogStyle::AntiLog2,
            "linToLog" => LogStyle::LinToLog,
            "logToLin" => LogStyle::LogToLin,
            "cameraLinToLog" => LogStyle::CameraLinToLog,
            "cameraLogToLin" => LogStyle::CameraLogToLin,
            _ => return None,
        })
    }
}

/// Per-channel parameters of a parametric log curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogChannel {
    /// Logarithm base.
    pub base: f32,
    /// `logSideSlope`
    pub log_slope: f32,
    /// `logSideOffset`
    pub log_offset: f32,
    /// `linSideSlope`
    pub lin_slope: f32,
    /// `linSideOffset`
    pub lin_offset: f32,
    /// `linSideBreak`, required by the camera styles.
    pub lin_break: Option<f32>,
    /// `linearSlope`, derived from continuity when absent.
    pub linear_slope: Option<f32>,
}

impl Default for LogChannel {
    fn default() -> Self {
        Self {
            base: 2.0,
            log_slope: 1.0,
            log_offset: 0.0,
            lin_slope: 1.0,
            lin_offset: 0.0,
            lin_break: None,
            linear_slope: None,
        }
    }
}

const MIN_LOG_INPUT: f32 = 1.175_494_4e-38;

impl LogChannel {
    fn lin_to_log(&self, x: f32) -> f32 {
        self.log_slope * (self.lin_slope * x + self.lin_offset).max(MIN_LOG_INPUT).log(self.base) + self.log_offset
    }

    fn log_to_lin(&self, y: f32) -> f32 {
        (self.base.powf((y - self.log_offset) / self.log_slope) - self.lin_offset) / self.lin_slope
    }

    /// Slope and offset of the linear toe below the break point.
    fn toe(&self, lin_break: f32) -> (f32, f32) {
        let slope = self.linear_slope.unwrap_or_else(|| {
            self.log_slope * self.lin_slope / ((self.lin_slope * lin_break + self.lin_offset) * self.base.ln())
        });
        (slope, self.lin_to_log(lin_break) - slope * lin_break)
    }
}

/// `Log` node parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LogParams {
    /// Curve style.
    pub style: LogStyle,
    /// R, G, B parameters.
    pub channels: [LogChannel; 3],
}

impl LogParams {
    /// Applies the curve to an RGB triple.
    pub fn apply(&self, rgb: &mut [f32; 3]) {
        for (v, ch) in rgb.iter_mut().zip(&self.channels) {
            *v = match self.style {
                LogStyle::Log10 => v.max(MIN_LOG_INPUT).log10(),
                LogStyle::Log2 => v.max(MIN_LOG_INPUT).log2(),
                LogStyle::AntiLog10 => 10f32.powf(*v),
                LogStyle::AntiLog2 => 2f32.powf(*v),
                LogStyle::LinToLog => ch.lin_to_log(*v),
                LogStyle::LogToLin => ch.log_to_lin(*v),
                LogStyle::CameraLinToLog => {
                    let brk = ch.lin_break.unwrap_or(0.0);
                    if *v <= brk {
                        let (slope, offset) = ch.toe(brk);
                        slope * *v + offset
                    } else {
                        ch.lin_to_log(*v)
                    }
                }
                LogStyle::CameraLogToLin => {
                    let brk = ch.lin_break.unwrap_or(0.0);
                    let (slope, offset) = ch.toe(brk);
                    if *v <= slope * brk + offset {
                        (*v - offset) / slope
                    } else {
                        ch.log_to_lin(*v)
                    }
                }
            };
        }
    }
}

/// Style of an `Exponent` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExponentStyle {
    /// `max(x, 0)^g`
    BasicFwd,
    /// `max(x, 0)^(1/g)`
    BasicRev,
    /// Sign-symmetric basic power.
    BasicMirrorFwd,
    /// Sign-symmetric inverse power.
    BasicMirrorRev,
    /// Basic power, negatives passed through.
    BasicPassThruFwd,
    /// Inverse power, negatives passed through.
    BasicPassThruRev,
    /// Monitor curve with a linear segment near black.
    MonCurveFwd,
    /// Inverse monitor curve.
    MonCurveRev,
    /// Sign-symmetric monitor curve.
    MonCurveMirrorFwd,
    /// Sign-symmetric inverse monitor curve.
    MonCurveMirrorRev,
}

impl ExponentStyle {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "basicFwd" => ExponentStyle::BasicFwd,
            "basicRev" => ExponentStyle::BasicRev,
            "basicMirrorFwd" => ExponentStyle::BasicMirrorFwd,
            "basicMirrorRev" => ExponentStyle::BasicMirrorRev,
            "basicPassThruFwd" => ExponentStyle::BasicPassThruFwd,
            "basicPassThruRev" => ExponentStyle::BasicPassThruRev,
            "monCurveFwd" => ExponentStyle::MonCurveFwd,
            "monCurveRev" => ExponentStyle::MonCurveRev,
            "monCurveMirrorFwd" => ExponentStyle::MonCurveMirrorFwd,
            "monCurveMirrorRev" => ExponentStyle::MonCurveMirrorRev,
            _ => return None,
        })
    }
}

/// `Exponent` node parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentParams {
    /// Curve style.
    pub style: ExponentStyle,
    /// Per-channel exponent.
    pub exponent: [f32; 3],
    /// Per-channel offset (monitor curves only).
    pub offset: [f32; 3],
}

fn mon_curve_fwd(x: f32, g: f32, off: f32) -> f32 {
    let brk = off / (g - 1.0);
    if x >= brk {
        ((x + off) / (1.0 + off)).powf(g)
    } else {
        let slope = ((g - 1.0) / off) * (g * off / ((g - 1.0) * (1.0 + off))).powf(g);
        x * slope
    }
}

fn mon_curve_rev(y: f32, g: f32, off: f32) -> f32 {
    let brk = (g * off / ((g - 1.0) * (1.0 + off))).powf(g);
    if y >= brk {
        (1.0 + off) * y.powf(1.0 / g) - off
    } else {
        let slope = ((g - 1.0) / off) * (g * off / ((g - 1.0) * (1.0 + off))).powf(g);
        y / slope
    }
}

fn mirrored(v: f32, f: impl Fn(f32) -> f32) -> f32 {
    if v < 0.0 { -f(-v) } else { f(v) }
}

impl ExponentParams {
    /// Applies the curve to an RGB triple.
    pub fn apply(&self, rgb: &mut [f32; 3]) {
        for i in 0..3 {
            let (g, off, v) = (self.exponent[i], self.offset[i], rgb[i]);
            rgb[i] = match self.style {
                ExponentStyle::BasicFwd => v.max(0.0).powf(g),
                ExponentStyle::BasicRev => v.max(0.0).powf(1.0 / g),
                ExponentStyle::BasicMirrorFwd => mirrored(v, |x| x.powf(g)),
                ExponentStyle::BasicMirrorRev => mirrored(v, |x| x.powf(1.0 / g)),
                ExponentStyle::BasicPassThruFwd => if v < 0.0 { v } else { v.powf(g) },
                ExponentStyle::BasicPassThruRev => if v < 0.0 { v } else { v.powf(1.0 / g) },
                ExponentStyle::MonCurveFwd => mon_curve_fwd(v, g, off),
                ExponentStyle::MonCurveRev => mon_curve_rev(v, g, off),
                ExponentStyle::MonCurveMirrorFwd => mirrored(v, |x| mon_curve_fwd(x, g, off)),
                ExponentStyle::MonCurveMirrorRev => mirrored(v, |x| mon_curve_rev(x, g, off)),
            };
        }
    }
}

/// One operation of a [`ProcessList`], normalized to `[0, 1]` scaling.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessNode {
    /// `out = m * in + offset`
    Matrix {
        /// 3x3 part
        m: Mat3,
        /// Offset column
        offset: [f32; 3],
    },
    /// Per-channel curves.
    Lut1D(Lut1D),
    /// RGB cube.
    Lut3D(Lut3D),
    /// Scale/offset/clamp.
    Range(RangeParams),
    /// ASC CDL.
    Cdl(CdlParams),
    /// Logarithmic curve.
    Log(LogParams),
    /// Power curve.
    Exponent(ExponentParams),
}

impl ProcessNode {
    /// Applies the node to an RGB triple.
    pub fn apply(&self, rgb: &mut [f32; 3]) {
        match self {
            ProcessNode::Matrix { m, offset } => {
                let out = m.transform(*rgb);
                *rgb = [out[0] + offset[0], out[1] + offset[1], out[2] + offset[2]];
            }
            ProcessNode::Lut1D(lut) => *rgb = lut.apply(*rgb),
            ProcessNode::Lut3D(lut) => *rgb = lut.apply(*rgb),
            ProcessNode::Range(p) => p.apply(rgb),
            ProcessNode::Cdl(p) => p.apply(rgb),
            ProcessNode::Log(p) => p.apply(rgb),
            ProcessNode::Exponent(p) => p.apply(rgb),
        }
    }
}

/// A parsed CLF document: an ordered chain of [`ProcessNode`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessList {
    /// `id` attribute.
    pub id: String,
    /// `name` attribute.
    pub name: String,
    /// Description elements, in document order.
    pub descriptions: Vec<String>,
    /// Input descriptor.
    pub input_descriptor: Option<String>,
    /// Output descriptor.
    pub output_descriptor: Option<String>,
    /// Operations, applied in order.
    pub nodes: Vec<ProcessNode>,
}

impl ProcessList {
    /// Runs every node on one RGB triple.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut v = rgb;
        for node in &self.nodes {
            node.apply(&mut v);
        }
        v
    }
}

/// Reads a `.clf` file, or a gzip-compressed `.clfz` file.
pub fn read_clf(path: &Path) -> LutResult<ProcessList> {
    let mut reader = BufReader::new(File::open(path)?);
    let gzipped = reader.fill_buf()?.starts_with(&[0x1f, 0x8b]);
    if gzipped {
        parse_clf(BufReader::new(GzDecoder::new(reader)))
    } else {
        parse_clf(reader)
    }
}

/// Parses CLF from an in-memory buffer, gunzipping it if needed.
pub fn decode_clf(bytes: &[u8]) -> LutResult<ProcessList> {
    if bytes.starts_with(&[0x1f, 0x8b]) {
        parse_clf(BufReader::new(GzDecoder::new(bytes)))
    } else {
        parse_clf(bytes)
    }
}

/// Parses CLF XML from a reader.
pub fn parse_clf<R: BufRead>(reader: R) -> LutResult<ProcessList> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut parser = ClfParser::default();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let (name, attrs) = element(e);
                parser.start(&name, attrs)?;
            }
            Event::Empty(ref e) => {
                let (name, attrs) = element(e);
                parser.start(&name, attrs)?;
                parser.end(&name)?;
            }
            Event::Text(ref e) => parser.text.push_str(&String::from_utf8_lossy(e)),
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                parser.end(&name)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    parser
        .list
        .ok_or_else(|| LutError::Parse("no ProcessList element".into()))
}

type Attrs = HashMap<String, String>;

fn element(e: &BytesStart) -> (String, Attrs) {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let attrs = e
        .attributes()
        .flatten()
        .map(|a| {
            (
                String::from_utf8_lossy(a.key.local_name().as_ref()).into_owned(),
                String::from_utf8_lossy(&a.value).into_owned(),
            )
        })
        .collect();
    (name, attrs)
}

const PROCESS_NODES: [&str; 7] = ["Matrix", "LUT1D", "LUT3D", "Range", "ASC_CDL", "Log", "Exponent"];
const METADATA: [&str; 4] = ["Description", "InputDescriptor", "OutputDescriptor", "Info"];

/// Node under construction.
#[derive(Debug, Default)]
struct NodeBuilder {
    kind: String,
    attrs: Attrs,
    in_scale: f32,
    out_scale: f32,
    array: Vec<f32>,
    dim: Vec<usize>,
    values: HashMap<String, String>,
    channel_params: Vec<Attrs>,
}

#[derive(Debug, Default)]
struct ClfParser {
    list: Option<ProcessList>,
    node: Option<NodeBuilder>,
    // Open elements below ProcessList.
    depth: usize,
    text: String,
}

impl ClfParser {
    fn start(&mut self, name: &str, attrs: Attrs) -> LutResult<()> {
        self.text.clear();

        if name == "ProcessList" {
            self.list = Some(ProcessList {
                id: attrs.get("id").cloned().unwrap_or_default(),
                name: attrs.get("name").cloned().unwrap_or_default(),
                ..Default::default()
            });
            self.depth = 0;
            return Ok(());
        }
        if self.list.is_none() {
            return Err(LutError::Parse(format!("<{name}> outside of ProcessList")));
        }
        self.depth += 1;

        if self.depth == 1 {
            if PROCESS_NODES.contains(&name) {
                let depth = |key: &str| -> LutResult<f32> {
                    match attrs.get(key) {
                        None => Ok(1.0),
                        Some(s) => BitDepth::parse(s)
                            .map(|d| d.scale())
                            .ok_or_else(|| LutError::Parse(format!("bad {key} '{s}' on <{name}>"))),
                    }
                };
                self.node = Some(NodeBuilder {
                    kind: name.to_string(),
                    in_scale: depth("inBitDepth")?,
                    out_scale: depth("outBitDepth")?,
                    attrs,
                    ..Default::default()
                });
            } else if !METADATA.contains(&name) {
                return Err(LutError::UnsupportedFormat(format!("CLF process node <{name}>")));
            }
            return Ok(());
        }

        if let Some(node) = self.node.as_mut() {
            match name {
                "Array" => {
                    node.dim = attrs
                        .get("dim")
                        .map(|d| d.split_whitespace().filter_map(|s| s.parse().ok()).collect())
                        .unwrap_or_default();
                }
                "LogParams" | "ExponentParams" => node.channel_params.push(attrs),
                _ => {}
            }
        }
        Ok(())
    }

    fn end(&mut self, name: &str) -> LutResult<()> {
        let text = std::mem::take(&mut self.text);
        if name == "ProcessList" {
            return Ok(());
        }
        let Some(list) = self.list.as_mut() else {
            return Ok(());
        };
        self.depth = self.depth.saturating_sub(1);

        if self.depth == 0 {
            match name {
                "Description" => list.descriptions.push(text),
                "InputDescriptor" => list.input_descriptor = Some(text),
                "OutputDescriptor" => list.output_descriptor = Some(text),
                _ => {
                    if let Some(node) = self.node.take() {
                        list.nodes.push(node.build()?);
                    }
                }
            }
            return Ok(());
        }

        if let Some(node) = self.node.as_mut() {
            if name == "Array" {
                node.array = parse_numbers(&text)?;
            } else if !text.is_empty() {
                node.values.insert(name.to_string(), text);
            }
        }
        Ok(())
    }
}

fn parse_numbers(text: &str) -> LutResult<Vec<f32>> {
    text.split_whitespace()
        .map(|s| s.parse::<f32>().map_err(|_| LutError::Parse(format!("bad number '{s}'"))))
        .collect()
}

fn parse_triple(text: &str) -> LutResult<[f32; 3]> {
    let v = parse_numbers(text)?;
    match v.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        [a] => Ok([*a; 3]),
        _ => Err(LutError::Parse(format!("expected 3 numbers, got '{text}'"))),
    }
}

fn attr_f32(attrs: &Attrs, key: &str) -> LutResult<Option<f32>> {
    attrs
        .get(key)
        .map(|s| s.trim().parse::<f32>().map_err(|_| LutError::Parse(format!("bad {key} '{s}'"))))
        .transpose()
}

/// Index of the channels a `LogParams`/`ExponentParams` element targets.
fn channels(attrs: &Attrs) -> LutResult<Vec<usize>> {
    match attrs.get("channel").map(String::as_str) {
        None => Ok(vec![0, 1, 2]),
        Some("R") => Ok(vec![0]),
        Some("G") => Ok(vec![1]),
        Some("B") => Ok(vec![2]),
        Some(other) => Err(LutError::Parse(format!("bad channel '{other}'"))),
    }
}

impl NodeBuilder {
    fn value(&self, key: &str) -> LutResult<Option<f32>> {
        self.values
            .get(key)
            .map(|s| s.trim().parse::<f32>().map_err(|_| LutError::Parse(format!("bad {key} '{s}'"))))
            .transpose()
    }

    fn style(&self) -> Option<&str> {
        self.attrs.get("style").map(String::as_str)
    }

    fn build(self) -> LutResult<ProcessNode> {
        match self.kind.as_str() {
            "Matrix" => self.build_matrix(),
            "LUT1D" => self.build_lut1d(),
            "LUT3D" => self.build_lut3d(),
            "Range" => self.build_range(),
            "ASC_CDL" => self.build_cdl(),
            "Log" => self.build_log(),
            "Exponent" => self.build_exponent(),
            other => Err(LutError::UnsupportedFormat(format!("CLF process node <{other}>"))),
        }
    }

    fn build_matrix(self) -> LutResult<ProcessNode> {
        let rows = self.dim.first().copied();
        let cols = self.dim.get(1).copied();
        let cols = match (rows, cols, self.array.len()) {
            (Some(3), Some(c @ (3 | 4)), n) if n == 3 * c => c,
            (None, None, 9) => 3,
            (None, None, 12) => 4,
            _ => {
                return Err(LutError::InvalidSize(format!(
                    "matrix dim {:?} with {} values",
                    self.dim,
                    self.array.len()
                )));
            }
        };
        let k = self.in_scale / self.out_scale;
        let a = &self.array;
        let row = |i: usize| [a[i * cols] * k, a[i * cols + 1] * k, a[i * cols + 2] * k];
        let offset = if cols == 4 {
            [a[3] / self.out_scale, a[7] / self.out_scale, a[11] / self.out_scale]
        } else {
            [0.0; 3]
        };
        Ok(ProcessNode::Matrix {
            m: Mat3::from_rows([row(0), row(1), row(2)]),
            offset,
        })
    }

    fn build_lut1d(self) -> LutResult<ProcessNode> {
        if self.attrs.get("halfDomain").is_some_and(|v| v == "true") {
            return Err(LutError::UnsupportedFormat("half-domain LUT1D".into()));
        }
        let components = self.dim.get(1).copied().unwrap_or(1);
        let mut lut = match components {
            1 => Lut1D::from_data(self.array)?,
            3 => Lut1D::from_interleaved(&self.array)?,
            n => return Err(LutError::InvalidSize(format!("LUT1D with {n} components"))),
        };
        if let Some(&entries) = self.dim.first() {
            if entries != lut.size() {
                return Err(LutError::InvalidSize(format!(
                    "LUT1D declares {} entries, has {}",
                    entries,
                    lut.size()
                )));
            }
        }
        lut.scale(1.0 / self.out_scale);
        Ok(ProcessNode::Lut1D(lut))
    }

    fn build_lut3d(self) -> LutResult<ProcessNode> {
        let size = match self.dim.as_slice() {
            [a, b, c, 3] if a == b && b == c => *a,
            _ => return Err(LutError::InvalidSize(format!("LUT3D dim {:?}", self.dim))),
        };
        let interp = match self.attrs.get("interpolation").map(String::as_str) {
            Some("tetrahedral") => Interpolation::Tetrahedral,
            _ => Interpolation::Linear,
        };
        let scaled: Vec<f32> = self.array.iter().map(|v| v / self.out_scale).collect();
        Ok(ProcessNode::Lut3D(Lut3D::from_blue_fastest(&scaled, size)?.with_interpolation(interp)))
    }

    fn build_range(self) -> LutResult<ProcessNode> {
        let (si, so) = (self.in_scale, self.out_scale);
        let params = RangeParams {
            min_in: self.value("minInValue")?.map(|v| v / si),
            max_in: self.value("maxInValue")?.map(|v| v / si),
            min_out: self.value("minOutValue")?.map(|v| v / so),
            max_out: self.value("maxOutValue")?.map(|v| v / so),
            clamp: self.style() != Some("noClamp"),
        };
        if params.min_in.is_some() != params.min_out.is_some()
            || params.max_in.is_some() != params.max_out.is_some()
        {
            return Err(LutError::Parse("Range needs matching in/out bounds".into()));
        }
        Ok(ProcessNode::Range(params))
    }

    fn build_cdl(self) -> LutResult<ProcessNode> {
        let style = match self.style() {
            None | Some("Fwd") => CdlStyle::Fwd,
            Some("Rev") => CdlStyle::Rev,
            Some("FwdNoClamp") => CdlStyle::FwdNoClamp,
            Some("RevNoClamp") => CdlStyle::RevNoClamp,
            Some(other) => return Err(LutError::Parse(format!("bad ASC_CDL style '{other}'"))),
        };
        let triple = |key: &str, default: [f32; 3]| -> LutResult<[f32; 3]> {
            self.values.get(key).map_or(Ok(default), |s| parse_triple(s))
        };
        Ok(ProcessNode::Cdl(CdlParams {
            style,
            slope: triple("Slope", [1.0; 3])?,
            offset: triple("Offset", [0.0; 3])?,
            power: triple("Power", [1.0; 3])?,
            saturation: self.value("Saturation")?.unwrap_or(1.0),
        }))
    }

    fn build_log(self) -> LutResult<ProcessNode> {
        let style = self
            .style()
            .and_then(LogStyle::parse)
            .ok_or_else(|| LutError::Parse(format!("bad Log style {:?}", self.style())))?;
        let mut ch = [LogChannel::default(); 3];
        if let Some(base) = attr_f32(&self.attrs, "base")? {
            ch.iter_mut().for_each(|c| c.base = base);
        }
        for attrs in &self.channel_params {
            for i in channels(attrs)? {
                let c = &mut ch[i];
                c.base = attr_f32(attrs, "base")?.unwrap_or(c.base);
                c.log_slope = attr_f32(attrs, "logSideSlope")?.unwrap_or(c.log_slope);
                c.log_offset = attr_f32(attrs, "logSideOffset")?.unwrap_or(c.log_offset);
                c.lin_slope = attr_f32(attrs, "linSideSlope")?.unwrap_or(c.lin_slope);
                c.lin_offset = attr_f32(attrs, "linSideOffset")?.unwrap_or(c.lin_offset);
                c.lin_break = attr_f32(attrs, "linSideBreak")?.or(c.lin_break);
                c.linear_slope = attr_f32(attrs, "linearSlope")?.or(c.linear_slope);
            }
        }
        if matches!(style, LogStyle::CameraLinToLog | LogStyle::CameraLogToLin)
            && ch.iter().any(|c| c.lin_break.is_none())
        {
            return Err(LutError::Parse("camera log style requires linSideBreak".into()));
        }
        Ok(ProcessNode::Log(LogParams { style, channels: ch }))
    }

    fn build_exponent(self) -> LutResult<ProcessNode> {
        let style = self
            .style()
            .and_then(ExponentStyle::parse)
            .ok_or_else(|| LutError::Parse(format!("bad Exponent style {:?}", self.style())))?;
        let mut params = ExponentParams {
            style,
            exponent: [1.0; 3],
            offset: [0.0; 3],
        };
        for attrs in &self.channel_params {
            for i in channels(attrs)? {
                params.exponent[i] = attr_f32(attrs, "exponent")?.unwrap_or(params.exponent[i]);
                params.offset[i] = attr_f32(attrs, "offset")?.unwrap_or(params.offset[i]);
            }
        }
        let mon_curve = matches!(
            style,
            ExponentStyle::MonCurveFwd
                | ExponentStyle::MonCurveRev
                | ExponentStyle::MonCurveMirrorFwd
                | ExponentStyle::MonCurveMirrorRev
        );
        if mon_curve && (0..3).any(|i| params.exponent[i] <= 1.0 || params.offset[i] <= 0.0) {
            return Err(LutError::Parse("monCurve needs exponent > 1 and offset > 0".into()));
        }
        Ok(ProcessNode::Exponent(params))
    }
}
