//! Extracts interpolation variable identifiers from role manifest template
//! patches (spec.md section 4.6 "Template checks").
//!
//! Parsing template text any further than pulling out `((name))`-style
//! variable references is explicitly out of scope (spec.md section 1: "...
//! mustache parsing of templates beyond extraction of variable
//! identifiers"); callers that need real templating reach for `tera`
//! themselves, same split as the teacher's own `template.rs` versus
//! `vault.rs` (rendering vs. a narrow one-off extraction).

use regex::Regex;

/// Matches BOSH-style `((variable-name))` interpolation references.
fn variable_regex() -> Regex {
    Regex::new(r"\(\(\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\)\)").expect("static regex")
}

/// Every distinct variable identifier interpolated in `text`, in
/// first-appearance order.
pub fn extract_variables(text: &str) -> Vec<String> {
    let re = variable_regex();
    let mut seen = Vec::new();
    for cap in re.captures_iter(text) {
        let name = cap[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// A template that interpolates no variables at all (spec.md section 4.6
/// "global templates must not be constant").
pub fn is_constant(text: &str) -> bool {
    extract_variables(text).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_distinct_variables_in_order() {
        let vars = extract_variables("host: ((db-host)) port: ((db-port)) again: ((db-host))");
        assert_eq!(vars, vec!["db-host".to_string(), "db-port".to_string()]);
    }

    #[test]
    fn constant_text_has_no_variables() {
        assert!(is_constant("just a literal string"));
        assert!(!is_constant("((only-var))"));
    }
}
