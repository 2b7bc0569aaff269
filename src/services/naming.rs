use crate::domain::constants::{DEFAULT_STRIP_PREFIXES, DEFAULT_STRIP_SUFFIXES};

#[derive(Debug, Clone)]
pub struct NameRules {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
}

impl Default for NameRules {
    fn default() -> Self {
        Self {
            prefixes: DEFAULT_STRIP_PREFIXES.iter().map(|s| s.to_string()).collect(),
            suffixes: DEFAULT_STRIP_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Canonical comparison key for a service or runtime unit name.
///
/// Case-folds, maps `_`, `.` and whitespace to `-`, collapses dashes, then
/// strips at most one known prefix and one known suffix. A decoration is only
/// stripped when something remains afterwards.
pub fn normalize_service_name(raw: &str, rules: &NameRules) -> String {
    let mut s = String::with_capacity(raw.len());
    let mut last_dash = true;
    for c in raw.trim().chars() {
        let c = if c == '_' || c == '.' || c.is_whitespace() {
            '-'
        } else {
            c
        };
        if c == '-' {
            if !last_dash {
                s.push('-');
            }
            last_dash = true;
        } else {
            s.extend(c.to_lowercase());
            last_dash = false;
        }
    }
    let mut s = s.trim_end_matches('-').to_string();

    for p in &rules.prefixes {
        let p = p.to_lowercase();
        if let Some(rest) = s.strip_prefix(p.as_str()) {
            if !rest.is_empty() {
                s = rest.to_string();
                break;
            }
        }
    }
    for x in &rules.suffixes {
        let x = x.to_lowercase();
        if let Some(rest) = s.strip_suffix(x.as_str()) {
            if !rest.is_empty() {
                s = rest.to_string();
                break;
            }
        }
    }
    s
}

/// Substring match in either direction on normalized names.
pub fn names_overlap(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}
