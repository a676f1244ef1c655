//! Config validation: unknown-key detection with Levenshtein suggestions.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `ConveyorConfig`.
///
/// Maintained by hand to match the struct hierarchy in conveyor_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [belt]
        "belt",
        "belt.speed_cm_per_sec",
        "belt.start_buffer_cm",
        "belt.end_buffer_cm",
        "belt.pusher_distances_cm",
        // [trigger]
        "trigger",
        "trigger.photo_eye_window_cm",
        "trigger.activation_offset_cm",
        "trigger.debounce_ms",
        "trigger.diversion_secs",
        "trigger.removal_grace_secs",
        // [runtime]
        "runtime",
        "runtime.tick_interval_ms",
        "runtime.settings_path",
        "runtime.settings_poll_secs",
        // [server]
        "server",
        "server.addr",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist > 3 {
            continue;
        }
        // Ties resolve alphabetically so suggestions are stable across runs.
        let better = match best {
            None => true,
            Some((best_key, best_dist)) => dist < best_dist || (dist == best_dist && k < best_key),
        };
        if better {
            best = Some((k, dist));
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys. Existing configs always continue to work.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde later
    };

    let known = known_config_keys();
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(&key, &known);
            warnings.push(ValidationWarning {
                message: format!("Unknown config key '{key}'"),
                field: key,
                suggestion,
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("belt", "belt"), 0);
    }

    #[test]
    fn walk_collects_nested_paths() {
        let value: toml::Value = "[belt]\nspeed_cm_per_sec = 30.0\n".parse().unwrap();
        let keys = walk_toml_keys(&value, "");
        assert_eq!(keys, vec!["belt".to_string(), "belt.speed_cm_per_sec".to_string()]);
    }

    #[test]
    fn unparseable_toml_yields_no_warnings() {
        assert!(validate_unknown_keys("[belt").is_empty());
    }
}
