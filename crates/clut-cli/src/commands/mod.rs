//! CLI command implementations

pub mod apply;
pub mod cache;
pub mod info;
pub mod params;

use std::path::Path;

use clut_core::{ParamDescriptor, ParamKind};

pub const HALD_KIND: &str = "Hald CLUT";

/// LUT kind by extension, as the store dispatches it.
pub fn lut_kind(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "clf" | "clfz" => "CLF transform",
        "json" => "external LUT generator",
        "ctl" => "CTL script",
        _ => HALD_KIND,
    }
}

/// Short type name of a parameter.
pub fn kind_name(desc: &ParamDescriptor) -> &'static str {
    match desc.kind {
        ParamKind::Bool => "bool",
        ParamKind::Int => "int",
        ParamKind::Float => "float",
        ParamKind::Choice => "choice",
        ParamKind::Curve(_) => "curve",
    }
}

/// Format file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lut_kind() {
        assert_eq!(lut_kind(Path::new("a/Film.PNG")), "Hald CLUT");
        assert_eq!(lut_kind(Path::new("x.clfz")), "CLF transform");
        assert_eq!(lut_kind(Path::new("gen.json")), "external LUT generator");
        assert_eq!(lut_kind(Path::new("look.CTL")), "CTL script");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
