//! `@ART-*` directives in CTL script comments.
//!
//! Directives are `//` comment lines of the form `// @ART-<key>: <json>`:
//!
//! ```text
//! // @ART-label: "Film look"
//! // @ART-order: 3
//! // @ART-colorspace: "ACEScg"
//! // @ART-lut: 48
//! // @ART-param: ["gain", "Gain", 0.0, 2.0, 1.0]
//! ```

use serde_json::Value;

use crate::ScriptError;

/// Directives collected from a script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CtlHeader {
    /// `@ART-param` declarations with their 1-based line numbers.
    pub params: Vec<(usize, Value)>,
    /// Working profile named by `@ART-colorspace`, empty when absent.
    pub colorspace: String,
    /// Fast-path LUT resolution from `@ART-lut`, 0 when absent.
    pub lut_dim: usize,
    /// Resolved `@ART-label`.
    pub label: Option<String>,
    /// `@ART-order`.
    pub order: Option<i32>,
}

const COLORSPACES: [(&str, &str); 8] = [
    ("aces2065-1", "ACESp0"),
    ("acescg", "ACESp1"),
    ("rec2020", "Rec2020"),
    ("prophoto", "ProPhoto"),
    ("rec709", "sRGB"),
    ("srgb", "sRGB"),
    ("adobergb", "Adobe RGB"),
    ("adobe", "Adobe RGB"),
];

/// Maps a script colorspace name to a working profile, ignoring case.
pub fn colorspace_profile(name: &str) -> Option<&'static str> {
    let name = name.to_lowercase();
    COLORSPACES
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| *v)
}

/// Resolves a `$key;default` label to `default` and `$key` to `key`.
pub fn resolve_label(label: &str) -> String {
    match label.strip_prefix('$') {
        Some(rest) => match rest.split_once(';') {
            Some((_, default)) => default.to_string(),
            None => rest.to_string(),
        },
        None => label.to_string(),
    }
}

/// Yields `(line_number, key, payload)` for every directive line.
fn directives(source: &str) -> impl Iterator<Item = (usize, &str, &str)> {
    source.lines().enumerate().filter_map(|(i, line)| {
        let rest = line.trim_start().strip_prefix("//")?.trim_start();
        let rest = rest.strip_prefix("@ART-")?;
        let (key, payload) = rest.split_once(':')?;
        Some((i + 1, key, payload))
    })
}

/// Parses the first JSON value of `payload`, ignoring trailing text.
fn leading_json(payload: &str) -> Option<Value> {
    serde_json::Deserializer::from_str(payload)
        .into_iter::<Value>()
        .next()?
        .ok()
}

impl CtlHeader {
    /// Collects the directives of `source`.
    ///
    /// Malformed colorspace or LUT directives and unparsable parameter
    /// declarations are errors. Malformed labels and orders are ignored.
    pub fn parse(source: &str) -> Result<Self, ScriptError> {
        let mut header = Self::default();
        for (line, key, payload) in directives(source) {
            let bad = |what: &str| {
                ScriptError::Signature(format!("line {line}: invalid {what} definition: {}", payload.trim()))
            };
            match key {
                "param" => {
                    let v = leading_json(payload).ok_or_else(|| bad("parameter"))?;
                    header.params.push((line, v));
                }
                "colorspace" => {
                    let name = leading_json(payload)
                        .and_then(|v| v.as_str().and_then(colorspace_profile))
                        .ok_or_else(|| bad("colorspace"))?;
                    header.colorspace = name.to_string();
                }
                "lut" => {
                    let v = leading_json(payload)
                        .and_then(|v| v.as_f64())
                        .ok_or_else(|| bad("lut"))?;
                    if v < 1.0 || v.fract() != 0.0 || v > f64::from(u16::MAX) {
                        return Err(bad("lut"));
                    }
                    header.lut_dim = v as usize;
                }
                "label" => {
                    if let Some(Value::String(s)) = leading_json(payload) {
                        let s = resolve_label(&s);
                        if !s.is_empty() {
                            header.label = Some(s);
                        }
                    }
                }
                "order" => {
                    if let Some(n) = leading_json(payload).and_then(|v| v.as_f64()) {
                        header.order = Some(n as i32);
                    }
                }
                _ => {}
            }
        }
        Ok(header)
    }

    /// Label and order only, without validating other directives.
    pub fn display_label(source: &str) -> (Option<String>, Option<i32>) {
        let mut label = None;
        let mut order = None;
        for (_, key, payload) in directives(source) {
            match key {
                "label" => {
                    if let Some(Value::String(s)) = leading_json(payload) {
                        let s = resolve_label(&s);
                        label = (!s.is_empty()).then_some(s);
                    }
                }
                "order" => {
                    if let Some(n) = leading_json(payload).and_then(|v| v.as_f64()) {
                        order = Some(n as i32);
                    }
                }
                _ => {}
            }
            if label.is_some() && order.is_some() {
                break;
            }
        }
        (label, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"// Sample look
// @ART-label: "$LOOK_WARM;Warm look"
  //   @ART-order: 7
// @ART-colorspace: "ACEScg"
// @ART-lut: 33
// @ART-param: ["gain", "Gain", 0.0, 2.0, 1.0]  trailing words
// @ART-param: ["on", "Enable", true]
@ART-param: ["ignored", "Not a comment", true]

void ART_main(varying float r, varying float g, varying float b,
              output varying float or, output varying float og, output varying float ob,
              float gain, bool on)
{
}
"#;

    #[test]
    fn test_parse_directives() {
        let h = CtlHeader::parse(SCRIPT).unwrap();
        assert_eq!(h.label.as_deref(), Some("Warm look"));
        assert_eq!(h.order, Some(7));
        assert_eq!(h.colorspace, "ACESp1");
        assert_eq!(h.lut_dim, 33);
        let lines: Vec<usize> = h.params.iter().map(|p| p.0).collect();
        assert_eq!(lines, vec![6, 7]);
        assert_eq!(h.params[0].1[0], "gain");
    }

    #[test]
    fn test_defaults_without_directives() {
        let h = CtlHeader::parse("void ART_main() {}\n").unwrap();
        assert_eq!(h, CtlHeader::default());
        assert!(h.colorspace.is_empty());
    }

    #[test]
    fn test_bad_directives() {
        assert!(CtlHeader::parse("// @ART-colorspace: \"XYZ\"").is_err());
        assert!(CtlHeader::parse("// @ART-colorspace: 3").is_err());
        assert!(CtlHeader::parse("// @ART-lut: 0").is_err());
        assert!(CtlHeader::parse("// @ART-lut: 12.5").is_err());
        assert!(CtlHeader::parse("// @ART-param: [\"x\", ").is_err());
        // broken labels are not fatal
        assert!(CtlHeader::parse("// @ART-label: nope").is_ok());
    }

    #[test]
    fn test_colorspace_case() {
        assert_eq!(colorspace_profile("AdobeRGB"), Some("Adobe RGB"));
        assert_eq!(colorspace_profile("ACES2065-1"), Some("ACESp0"));
        assert_eq!(colorspace_profile("Rec709"), Some("sRGB"));
        assert_eq!(colorspace_profile("dci-p3"), None);
    }

    #[test]
    fn test_resolve_label() {
        assert_eq!(resolve_label("Plain"), "Plain");
        assert_eq!(resolve_label("$KEY;Fallback"), "Fallback");
        assert_eq!(resolve_label("$KEY"), "KEY");
    }

    #[test]
    fn test_display_label() {
        assert_eq!(
            CtlHeader::display_label(SCRIPT),
            (Some("Warm look".to_string()), Some(7))
        );
        // label alone, invalid lut ignored
        let (label, order) = CtlHeader::display_label("// @ART-lut: -1\n// @ART-label: \"L\"\n");
        assert_eq!(label.as_deref(), Some("L"));
        assert_eq!(order, None);
    }
}
