//! LUT application command

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clut_core::{Grid2D, OwnedGrid, ParamValueMap, default_values, values_from_json};
use clut_lut::{ImageLoader, PngLoader, Rgb16Image, write_png16};
use clut_math::transfer::{gamma_srgb_clipped, igamma_srgb};
use clut_store::{ClutApplication, ClutStore};
use tracing::{info, warn};

use crate::ApplyArgs;

pub fn run(args: ApplyArgs, store: Arc<ClutStore>, verbose: u8) -> Result<()> {
    let image = PngLoader
        .load(&args.input)
        .with_context(|| format!("Failed to load: {}", args.input.display()))?;

    let mut app = ClutApplication::new(store, &args.lut, &args.working_profile, args.strength, 0);
    if !app.ok() {
        bail!("Cannot use LUT: {}", args.lut.display());
    }

    let values = param_values(&app, &args)?;
    if !app.set_param_values(&values, args.quality.into()) {
        bail!("Failed to set parameters of {}", args.lut.display());
    }

    if verbose > 0 {
        println!(
            "Applying {} to {} ({}x{}, strength {})",
            args.lut.display(),
            args.input.display(),
            image.width,
            image.height,
            app.strength()
        );
    }

    let [mut r, mut g, mut b] = to_planes(&image);
    let start = Instant::now();
    app.apply_planes(&mut r, &mut g, &mut b);
    info!(elapsed = ?start.elapsed(), "LUT applied");

    let out = from_planes(&r, &g, &b);
    write_png16(&args.output, &out)
        .with_context(|| format!("Failed to save: {}", args.output.display()))?;

    if verbose > 0 {
        println!("Done.");
    }
    Ok(())
}

/// Defaults, then the `--params` file, then `--set` overrides.
fn param_values(app: &ClutApplication, args: &ApplyArgs) -> Result<ParamValueMap> {
    let params = app.param_descriptors();
    let mut values = default_values(&params);

    if let Some(path) = &args.params {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display()))?;
        let from_file = values_from_json(&params, &text)
            .with_context(|| format!("Invalid parameter values in {}", path.display()))?;
        values.extend(from_file);
    }

    for assignment in &args.set {
        let (name, vv) = parse_assignment(assignment)?;
        if !params.iter().any(|p| p.name == name) {
            warn!(param = %name, lut = %args.lut.display(), "not a parameter of this LUT");
        }
        values.insert(name, vv);
    }
    Ok(values)
}

/// Parses `name=v1,v2,...`; `true`/`false` stand for 1 and 0.
fn parse_assignment(s: &str) -> Result<(String, Vec<f64>)> {
    let Some((name, value)) = s.split_once('=') else {
        bail!("Expected NAME=VALUE, got `{s}`");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Missing parameter name in `{s}`");
    }
    let values = value
        .split(',')
        .map(|v| match v.trim() {
            "true" => Ok(1.0),
            "false" => Ok(0.0),
            v => v
                .parse::<f64>()
                .with_context(|| format!("Invalid value `{v}` for {name}")),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((name.to_string(), values))
}

/// Splits an sRGB-encoded image into linear planes on the 0..65535 scale.
fn to_planes(image: &Rgb16Image) -> [OwnedGrid<f32>; 3] {
    let (w, h) = (image.width as usize, image.height as usize);
    let mut planes = [Grid2D::new(w, h), Grid2D::new(w, h), Grid2D::new(w, h)];
    for (i, px) in image.data.chunks_exact(3).enumerate() {
        let (y, x) = (i / w, i % w);
        for (plane, v) in planes.iter_mut().zip(px) {
            plane[(y, x)] = igamma_srgb(f32::from(*v));
        }
    }
    planes
}

fn from_planes(r: &OwnedGrid<f32>, g: &OwnedGrid<f32>, b: &OwnedGrid<f32>) -> Rgb16Image {
    let (w, h) = (r.width(), r.height());
    let mut data = Vec::with_capacity(w * h * 3);
    for y in 0..h {
        for x in 0..w {
            for plane in [r, g, b] {
                data.push(gamma_srgb_clipped(plane[(y, x)]).round().clamp(0.0, 65535.0) as u16);
            }
        }
    }
    Rgb16Image {
        width: w as u32,
        height: h as u32,
        data,
    }
}
