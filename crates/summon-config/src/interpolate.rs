//! `{dotted.path}` and `{CONFIG-DIR}` interpolation (spec.md §6: "Path
//! values may reference other keys via `{dotted.path}` interpolation and
//! `{CONFIG-DIR}`"). A small recursive string-substitution pass over the
//! parsed `serde_json::Value` tree, run before typed deserialization —
//! mirrors `turborepo-lib/src/config`'s layered-resolution style without
//! reusing its env-var-specific machinery, since this interpolation targets
//! sibling config keys rather than the process environment.

use crate::ConfigError;

/// Walks every string leaf of `value`, replacing each `{...}` placeholder.
/// `{CONFIG-DIR}` resolves to `config_dir`; any other `{a.b.c}` resolves by
/// walking `root` (the whole, not-yet-substituted document) through its
/// dotted path components. A placeholder naming an unknown path is an
/// error rather than being left verbatim, matching spec.md's "unresolvable
/// interpolation" configuration-error case (§7).
pub fn interpolate(
    value: &mut serde_json::Value,
    root: &serde_json::Value,
    config_dir: &std::path::Path,
) -> Result<(), ConfigError> {
    match value {
        serde_json::Value::String(s) => {
            *s = substitute(s, root, config_dir)?;
        }
        serde_json::Value::Array(items) => {
            for item in items {
                interpolate(item, root, config_dir)?;
            }
        }
        serde_json::Value::Object(map) => {
            for v in map.values_mut() {
                interpolate(v, root, config_dir)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn substitute(
    s: &str,
    root: &serde_json::Value,
    config_dir: &std::path::Path,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            out.push_str(rest);
            return Ok(out);
        };
        let close = open + close;
        out.push_str(&rest[..open]);
        let placeholder = &rest[open + 1..close];
        out.push_str(&resolve_placeholder(placeholder, root, config_dir)?);
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn resolve_placeholder(
    placeholder: &str,
    root: &serde_json::Value,
    config_dir: &std::path::Path,
) -> Result<String, ConfigError> {
    if placeholder == "CONFIG-DIR" {
        return Ok(config_dir.to_string_lossy().into_owned());
    }
    let mut cursor = root;
    for segment in placeholder.split('.') {
        cursor = cursor
            .get(segment)
            .ok_or_else(|| ConfigError::UnresolvedInterpolation(placeholder.to_string()))?;
    }
    cursor
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::UnresolvedInterpolation(placeholder.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_config_dir() {
        let root = json!({"cache": "{CONFIG-DIR}/summon.cache"});
        let mut value = root.clone();
        interpolate(&mut value, &root, std::path::Path::new("/home/user/pack")).unwrap();
        assert_eq!(value["cache"], "/home/user/pack/summon.cache");
    }

    #[test]
    fn resolves_a_dotted_sibling_key() {
        let root = json!({"base": "/mods", "downloads": "{base}/downloads"});
        let mut value = root.clone();
        interpolate(&mut value, &root, std::path::Path::new("/cfg")).unwrap();
        assert_eq!(value["downloads"], "/mods/downloads");
    }

    #[test]
    fn errors_on_unknown_path() {
        let root = json!({"downloads": "{nope.at.all}"});
        let mut value = root.clone();
        assert!(interpolate(&mut value, &root, std::path::Path::new("/cfg")).is_err());
    }
}
