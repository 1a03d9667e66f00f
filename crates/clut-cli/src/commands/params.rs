//! Parameter listing command

use anyhow::{Context, Result};
use clut_core::{ParamKind, default_values, values_to_json};
use clut_store::ClutStore;

use crate::ParamsArgs;

pub fn run(args: ParamsArgs, store: &ClutStore) -> Result<()> {
    let params = store.param_descriptors(&args.lut);

    if args.json {
        let json = values_to_json(&params, &default_values(&params))
            .context("Failed to serialize default values")?;
        println!("{json}");
        return Ok(());
    }

    if params.is_empty() {
        println!("{}: no parameters", args.lut.display());
        return Ok(());
    }

    for p in &params {
        let label = if p.gui_name.is_empty() { &p.name } else { &p.gui_name };
        let range = match p.kind {
            ParamKind::Int | ParamKind::Float => format!("[{}, {}]", p.value_min, p.value_max),
            ParamKind::Choice => p.choices.join(" | "),
            _ => String::new(),
        };
        let default: Vec<String> = p.value_default.iter().map(|v| v.to_string()).collect();
        println!(
            "{:<16} {:<7} {:<24} default {:<12} {}",
            p.name,
            super::kind_name(p),
            range,
            default.join(","),
            label
        );
        if !p.gui_group.is_empty() {
            println!("{:<16} group: {}", "", p.gui_group);
        }
    }
    Ok(())
}
