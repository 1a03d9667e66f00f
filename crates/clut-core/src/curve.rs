//! Evaluation of curve-typed parameter values.
//!
//! A curve value is the flat vector stored in a [`ParamValueMap`](crate::ParamValueMap):
//!
//! - diagonal: `[type, x0, y0, x1, y1, ...]`, or for parametric curves
//!   `[type, highlights, lights, darks, shadows, split1?, split2?, split3?]`
//!   with slider amounts in `[-100, 100]`
//! - flat: `[type, x0, y0, left0, right0, x1, ...]`
//!
//! A lone `[0]` (or anything shorter than one point) is the identity for
//! diagonal curves and the neutral constant `0.5` for flat curves.
//!
//! ```rust
//! use clut_core::Curve;
//!
//! let c = Curve::diagonal(&[0.0, 0.0, 0.0, 1.0, 0.5]);
//! assert!((c.value(0.5) - 0.25).abs() < 1e-3);
//! assert_eq!(Curve::flat(&[0.0], false).value(0.3), 0.5);
//! ```

/// Diagonal curve type ids, as stored in the first element of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DiagonalCurveType {
    /// Identity.
    Empty = -1,
    /// Piecewise linear.
    Linear = 0,
    /// Natural cubic spline.
    Spline = 1,
    /// Zone sliders.
    Parametric = 2,
    /// Quadratic B-spline over the control polygon.
    Nurbs = 3,
    /// Catmull-Rom spline.
    CatmullRom = 4,
}

impl DiagonalCurveType {
    /// Maps a stored id back to a type.
    pub fn from_id(id: f64) -> Option<Self> {
        Some(match id as i32 {
            -1 => Self::Empty,
            0 => Self::Linear,
            1 => Self::Spline,
            2 => Self::Parametric,
            3 => Self::Nurbs,
            4 => Self::CatmullRom,
            _ => return None,
        })
    }
}

/// Flat curve type ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FlatCurveType {
    /// Constant 0.5.
    Empty = -1,
    /// Piecewise linear.
    Linear = 0,
    /// Smooth curve with an extremum at every control point.
    MinMaxCPoints = 1,
}

impl FlatCurveType {
    /// Maps a stored id back to a type.
    pub fn from_id(id: f64) -> Option<Self> {
        Some(match id as i32 {
            -1 => Self::Empty,
            0 => Self::Linear,
            1 => Self::MinMaxCPoints,
            _ => return None,
        })
    }
}

const TABLE_SIZE: usize = 4096;

/// A curve ready for evaluation on `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    /// `y = x`.
    Identity,
    /// `y = c`.
    Constant(f64),
    /// Densely sampled curve, linearly interpolated.
    Table(Vec<f64>),
}

impl Curve {
    /// Builds a diagonal curve from its stored value.
    pub fn diagonal(v: &[f64]) -> Self {
        let Some(kind) = v.first().and_then(|id| DiagonalCurveType::from_id(*id)) else {
            return Curve::Identity;
        };
        if kind == DiagonalCurveType::Parametric {
            return parametric(&v[1..]);
        }
        let pts = points(&v[1..], 2);
        if pts.len() < 2 || kind == DiagonalCurveType::Empty {
            return Curve::Identity;
        }
        match kind {
            DiagonalCurveType::Spline if pts.len() > 2 => tabulate(|x| natural_spline(&pts, x)),
            DiagonalCurveType::CatmullRom if pts.len() > 2 => tabulate(|x| catmull_rom(&pts, x)),
            DiagonalCurveType::Nurbs if pts.len() > 2 => {
                let poly = quadratic_bspline(&pts);
                tabulate(|x| piecewise_linear(&poly, x))
            }
            _ => tabulate(|x| piecewise_linear(&pts, x)),
        }
    }

    /// Builds a flat curve from its stored value.
    pub fn flat(v: &[f64], periodic: bool) -> Self {
        let Some(kind) = v.first().and_then(|id| FlatCurveType::from_id(*id)) else {
            return Curve::Constant(0.5);
        };
        let mut pts = points(&v[1..], 4);
        if pts.is_empty() || kind == FlatCurveType::Empty {
            return Curve::Constant(0.5);
        }
        if periodic {
            let first = pts[0];
            let last = pts[pts.len() - 1];
            pts.insert(0, (last.0 - 1.0, last.1));
            pts.push((first.0 + 1.0, first.1));
        }
        match kind {
            FlatCurveType::MinMaxCPoints => tabulate(|x| smooth_extrema(&pts, x)),
            _ => tabulate(|x| piecewise_linear(&pts, x)),
        }
    }

    /// Evaluates the curve; input and output are clamped to `[0, 1]`.
    pub fn value(&self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        match self {
            Curve::Identity => x,
            Curve::Constant(c) => *c,
            Curve::Table(t) => {
                let pos = x * (t.len() - 1) as f64;
                let i = (pos as usize).min(t.len() - 2);
                let f = pos - i as f64;
                t[i] + f * (t[i + 1] - t[i])
            }
        }
    }

    /// Samples the curve at `n` evenly spaced points `j / (n - 1)`.
    pub fn sample(&self, n: usize) -> Vec<f64> {
        match n {
            0 => Vec::new(),
            1 => vec![self.value(0.0)],
            _ => (0..n).map(|j| self.value(j as f64 / (n - 1) as f64)).collect(),
        }
    }
}

fn tabulate(f: impl Fn(f64) -> f64) -> Curve {
    Curve::Table(
        (0..TABLE_SIZE)
            .map(|i| f(i as f64 / (TABLE_SIZE - 1) as f64).clamp(0.0, 1.0))
            .collect(),
    )
}

/// Groups a flat vector into points, keeping the first two fields and
/// sorting by x. Trailing incomplete groups are dropped.
fn points(v: &[f64], stride: usize) -> Vec<(f64, f64)> {
    let mut pts: Vec<(f64, f64)> = v.chunks_exact(stride).map(|c| (c[0], c[1])).collect();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0));
    pts
}

/// Index of the segment containing `x`, for `pts.len() >= 2`.
fn segment(pts: &[(f64, f64)], x: f64) -> usize {
    pts.windows(2)
        .position(|w| x <= w[1].0)
        .unwrap_or(pts.len() - 2)
}

fn piecewise_linear(pts: &[(f64, f64)], x: f64) -> f64 {
    let (first, last) = (pts[0], pts[pts.len() - 1]);
    if x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }
    let i = segment(pts, x);
    let (a, b) = (pts[i], pts[i + 1]);
    let dx = b.0 - a.0;
    if dx <= 0.0 {
        return b.1;
    }
    a.1 + (x - a.0) / dx * (b.1 - a.1)
}

fn natural_spline(pts: &[(f64, f64)], x: f64) -> f64 {
    let n = pts.len();
    let (first, last) = (pts[0], pts[n - 1]);
    if x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }

    // Second derivatives via the tridiagonal system, natural boundary.
    let mut y2 = vec![0.0; n];
    let mut u = vec![0.0; n];
    for i in 1..n - 1 {
        let sig = (pts[i].0 - pts[i - 1].0) / (pts[i + 1].0 - pts[i - 1].0);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let d = (pts[i + 1].1 - pts[i].1) / (pts[i + 1].0 - pts[i].0)
            - (pts[i].1 - pts[i - 1].1) / (pts[i].0 - pts[i - 1].0);
        u[i] = (6.0 * d / (pts[i + 1].0 - pts[i - 1].0) - sig * u[i - 1]) / p;
    }
    for k in (0..n - 1).rev() {
        y2[k] = y2[k] * y2[k + 1] + u[k];
    }

    let i = segment(pts, x);
    let h = pts[i + 1].0 - pts[i].0;
    if h <= 0.0 {
        return pts[i + 1].1;
    }
    let a = (pts[i + 1].0 - x) / h;
    let b = (x - pts[i].0) / h;
    a * pts[i].1 + b * pts[i + 1].1 + ((a * a * a - a) * y2[i] + (b * b * b - b) * y2[i + 1]) * h * h / 6.0
}

fn catmull_rom(pts: &[(f64, f64)], x: f64) -> f64 {
    let n = pts.len();
    if x <= pts[0].0 {
        return pts[0].1;
    }
    if x >= pts[n - 1].0 {
        return pts[n - 1].1;
    }
    let slope = |i: usize| {
        let (lo, hi) = (i.saturating_sub(1), (i + 1).min(n - 1));
        let dx = pts[hi].0 - pts[lo].0;
        if dx <= 0.0 { 0.0 } else { (pts[hi].1 - pts[lo].1) / dx }
    };
    let i = segment(pts, x);
    let h = pts[i + 1].0 - pts[i].0;
    if h <= 0.0 {
        return pts[i + 1].1;
    }
    let t = (x - pts[i].0) / h;
    let (t2, t3) = (t * t, t * t * t);
    (2.0 * t3 - 3.0 * t2 + 1.0) * pts[i].1
        + (t3 - 2.0 * t2 + t) * h * slope(i)
        + (-2.0 * t3 + 3.0 * t2) * pts[i + 1].1
        + (t3 - t2) * h * slope(i + 1)
}

/// Polyline approximating a clamped uniform quadratic B-spline whose
/// control polygon is `pts`.
fn quadratic_bspline(pts: &[(f64, f64)]) -> Vec<(f64, f64)> {
    const STEPS: usize = 32;
    let mut out = vec![pts[0]];
    for i in 0..pts.len() - 2 {
        // Segment between midpoints of consecutive control edges, clamped at the ends.
        let p0 = if i == 0 { pts[0] } else { mid(pts[i], pts[i + 1]) };
        let p1 = pts[i + 1];
        let p2 = if i + 3 == pts.len() { pts[i + 2] } else { mid(pts[i + 1], pts[i + 2]) };
        for s in 1..=STEPS {
            let t = s as f64 / STEPS as f64;
            let (a, b, c) = ((1.0 - t) * (1.0 - t), 2.0 * t * (1.0 - t), t * t);
            out.push((a * p0.0 + b * p1.0 + c * p2.0, a * p0.1 + b * p1.1 + c * p2.1));
        }
    }
    out
}

fn mid(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

fn smooth_extrema(pts: &[(f64, f64)], x: f64) -> f64 {
    let n = pts.len();
    if n == 1 || x <= pts[0].0 {
        return pts[0].1;
    }
    if x >= pts[n - 1].0 {
        return pts[n - 1].1;
    }
    let i = segment(pts, x);
    let h = pts[i + 1].0 - pts[i].0;
    if h <= 0.0 {
        return pts[i + 1].1;
    }
    let t = (x - pts[i].0) / h;
    pts[i].1 + (pts[i + 1].1 - pts[i].1) * t * t * (3.0 - 2.0 * t)
}

/// Zone-based curve: each slider bends the middle of its zone by up to a
/// quarter of the zone width, then a natural spline joins the anchors.
fn parametric(v: &[f64]) -> Curve {
    if v.len() < 4 || v[..4].iter().all(|a| *a == 0.0) {
        return Curve::Identity;
    }
    let split = |i: usize, d: f64| v.get(4 + i).map_or(d, |s| s / 100.0).clamp(0.0, 1.0);
    let (s1, s2, s3) = (split(0, 0.25), split(1, 0.5), split(2, 0.75));
    let zones = [(0.0, s1, v[3]), (s1, s2, v[2]), (s2, s3, v[1]), (s3, 1.0, v[0])];

    let mut pts = vec![(0.0, 0.0)];
    for (lo, hi, amount) in zones {
        let m = (lo + hi) / 2.0;
        if hi > lo {
            pts.push((m, m + amount.clamp(-100.0, 100.0) / 100.0 * (hi - lo) / 4.0));
        }
    }
    pts.push((1.0, 1.0));
    tabulate(|x| natural_spline(&pts, x))
}
