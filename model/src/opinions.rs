//! Opinions Store (spec.md section 4.3): light (override) and dark (mask)
//! property trees merged against a job's declared property defaults.

use serde_yaml::{Mapping, Value};

use crate::release::Job;

/// The two operator-supplied property trees, each rooted at a `properties`
/// key in their source document.
#[derive(Clone, Debug, Default)]
pub struct Opinions {
    light: Value,
    dark: Value,
}

impl Opinions {
    pub fn new(light: Value, dark: Value) -> Self {
        Opinions { light, dark }
    }

    pub fn empty() -> Self {
        Opinions { light: Value::Mapping(Mapping::new()), dark: Value::Mapping(Mapping::new()) }
    }

    /// Computes the merged property tree for one job (spec.md section 4.3
    /// `GetPropertiesForJob`).
    pub fn properties_for_job(&self, job: &Job) -> Value {
        let mut result = Mapping::new();
        for prop in &job.properties {
            let path: Vec<&str> = prop.name.split('.').collect();
            let chosen = match lookup_path(&self.dark, &path) {
                Some(dark_value) if is_leaf(dark_value) => None,
                // A container at this path in dark means dark names an
                // interior node, not this leaf: fall through as if dark
                // had not matched at all.
                _ => match lookup_path(&self.light, &path) {
                    Some(light_value) if !light_value.is_null() => Some(light_value.clone()),
                    _ => Some(prop.default.clone()),
                },
            };
            if let Some(value) = chosen {
                insert_path(&mut result, &path, value);
            }
        }
        Value::Mapping(result)
    }

    /// Flattens an arbitrarily nested container tree into dotted-path ->
    /// stringified-leaf pairs. Arrays get an `[i]` suffix on their path
    /// component when `include_arrays` is set; otherwise array values are
    /// skipped entirely.
    pub fn flatten(value: &Value, include_arrays: bool) -> Vec<(String, String)> {
        let mut out = Vec::new();
        flatten_into(value, &mut Vec::new(), include_arrays, &mut out);
        out
    }
}

fn is_leaf(value: &Value) -> bool {
    !matches!(value, Value::Mapping(_) | Value::Sequence(_))
}

fn lookup_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for component in path {
        match current {
            Value::Mapping(map) => {
                current = map.get(&Value::String((*component).to_string()))?;
            }
            _ => return None,
        }
    }
    Some(current)
}

fn insert_path(root: &mut Mapping, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }
    if path.len() == 1 {
        root.insert(Value::String(path[0].to_string()), value);
        return;
    }
    let key = Value::String(path[0].to_string());
    if !matches!(root.get(&key), Some(Value::Mapping(_))) {
        root.insert(key.clone(), Value::Mapping(Mapping::new()));
    }
    if let Some(Value::Mapping(child)) = root.get_mut(&key) {
        insert_path(child, &path[1..], value);
    }
}

/// Stringifies a scalar leaf value the way a flattened opinions tree
/// expects (spec.md section 4.3 "stringified leaf").
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
    }
}

fn flatten_into(value: &Value, path: &mut Vec<String>, include_arrays: bool, out: &mut Vec<(String, String)>) {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                if let Value::String(key) = k {
                    path.push(key.clone());
                    flatten_into(v, path, include_arrays, out);
                    path.pop();
                }
            }
        }
        Value::Sequence(seq) => {
            if include_arrays {
                for (i, v) in seq.iter().enumerate() {
                    // `[i]` is appended directly to the last path
                    // component rather than joined as its own segment, so
                    // `a.c` with index 0 becomes `a.c[0]`, not `a.c.[0]`.
                    let suffixed = match path.pop() {
                        Some(last) => format!("{}[{}]", last, i),
                        None => format!("[{}]", i),
                    };
                    path.push(suffixed);
                    flatten_into(v, path, include_arrays, out);
                    path.pop();
                }
            }
        }
        leaf => {
            out.push((path.join("."), scalar_to_string(leaf)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::JobProperty;

    fn job_with_properties(props: &[(&str, &str)]) -> Job {
        Job {
            name: "j".into(),
            description: String::new(),
            fingerprint: "f".into(),
            sha1: "s".into(),
            archive_path: "/tmp/j.tgz".into(),
            templates: Vec::new(),
            properties: props
                .iter()
                .map(|(n, d)| JobProperty {
                    name: (*n).to_string(),
                    description: String::new(),
                    default: Value::String((*d).to_string()),
                })
                .collect(),
            package_names: Vec::new(),
            providers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    #[test]
    fn dark_leaf_mask_omits_property() {
        let light: Value = serde_yaml::from_str("a:\n  b: 2\n").unwrap();
        let dark: Value = serde_yaml::from_str("a:\n  b: null\n").unwrap();
        let opinions = Opinions::new(light, dark);
        let job = job_with_properties(&[("a.b", "1")]);
        let result = opinions.properties_for_job(&job);
        assert!(result.get(&Value::String("a".into())).is_none());
    }

    #[test]
    fn light_overrides_default_when_not_masked() {
        let light: Value = serde_yaml::from_str("a:\n  b: 2\n").unwrap();
        let dark = Value::Mapping(Mapping::new());
        let opinions = Opinions::new(light, dark);
        let job = job_with_properties(&[("a.b", "1")]);
        let result = opinions.properties_for_job(&job);
        let a = result.get(&Value::String("a".into())).unwrap();
        let b = a.get(&Value::String("b".into())).unwrap();
        assert_eq!(b.as_i64(), Some(2));
    }

    #[test]
    fn dark_container_falls_through_to_light_or_default() {
        // dark names `a` as an interior node (a map), not a leaf at `a.b`,
        // so the mask does not apply to `a.b` itself.
        let light = Value::Mapping(Mapping::new());
        let dark: Value = serde_yaml::from_str("a:\n  c: 9\n").unwrap();
        let opinions = Opinions::new(light, dark);
        let job = job_with_properties(&[("a.b", "default-value")]);
        let result = opinions.properties_for_job(&job);
        let a = result.get(&Value::String("a".into())).unwrap();
        let b = a.get(&Value::String("b".into())).unwrap();
        assert_eq!(b.as_str(), Some("default-value"));
    }

    #[test]
    fn flatten_produces_dotted_paths() {
        let value: Value = serde_yaml::from_str("a:\n  b: 1\n  c:\n  - x\n  - y\n").unwrap();
        let flat = Opinions::flatten(&value, true);
        assert!(flat.contains(&("a.b".to_string(), "1".to_string())));
        assert!(flat.contains(&("a.c[0]".to_string(), "x".to_string())));
    }
}
