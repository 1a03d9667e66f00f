//! LUT information command

use anyhow::Result;
use clut_store::{ClutStore, StoreError};
use tracing::debug;

use crate::InfoArgs;

pub fn run(args: InfoArgs, store: &ClutStore) -> Result<()> {
    for (i, lut) in args.lut.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let path = store.resolve_path(lut);
        let name = store.display_name(&path);
        let split = store.split_clut_filename(&path);

        println!("{}", path.display());
        println!("  Name:       {}", name.name);
        if name.order >= 0 {
            println!("  Order:      {}", name.order);
        }
        let kind = super::lut_kind(&path);
        println!("  Type:       {kind}");
        if kind == super::HALD_KIND {
            println!("  Profile:    {}", split.profile);
        }

        let detail = describe(store, &path);
        match detail {
            Ok(lines) => lines.iter().for_each(|l| println!("  {l}")),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "LUT unusable");
                println!("  Status:     unusable ({e})");
            }
        }

        let params = store.param_descriptors(&path);
        if !params.is_empty() {
            let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
            println!("  Parameters: {}", names.join(", "));
        }
    }
    Ok(())
}

fn describe(store: &ClutStore, path: &std::path::Path) -> Result<Vec<String>, StoreError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    Ok(match ext.as_str() {
        "clf" | "clfz" => {
            store.try_clf_processor(path)?;
            vec!["Status:     ok".into()]
        }
        "json" => {
            let lut = clut_store::ExternalLut::from_manifest(path)?;
            vec![
                format!("Command:    {}", lut.argv().join(" ")),
                format!("Workdir:    {}", lut.workdir().display()),
            ]
        }
        "ctl" => {
            let lut = store.try_ctl_lut(path, 1)?;
            let space = if lut.colorspace().is_empty() {
                "working profile"
            } else {
                lut.colorspace()
            };
            let mut lines = vec![format!("Colorspace: {space}")];
            if lut.lut_dim() > 0 {
                lines.push(format!("Fast path:  {}^3", lut.lut_dim()));
            }
            lines
        }
        _ => {
            let clut = store.try_hald_clut(path)?;
            let n = clut.lattice_size();
            vec![format!("Level:      {} ({n}x{n}x{n} lattice)", clut.level())]
        }
    })
}
