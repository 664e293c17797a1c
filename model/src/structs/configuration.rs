//! Role manifest global configuration and release references (spec.md
//! section 3 "Role Manifest", section 6 "configuration.templates",
//! "configuration.variables").

use super::auth::AuthConfig;
use super::variable::VariableDeclaration;

/// An ordered `name -> template text` map, preserving declaration order
/// (spec.md section 4.8 design note: "ordered maps ... must preserve
/// insertion order"). Backed directly by `serde_yaml::Mapping`, which keeps
/// insertion order itself, rather than re-deriving that guarantee here.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateSet {
    pub entries: serde_yaml::Mapping,
}

impl TemplateSet {
    /// The raw value at `name`, whatever its kind. Template *values* are
    /// required to be strings by the validator (spec.md section 4.6), not
    /// by this type.
    pub fn get_raw(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.entries.get(&serde_yaml::Value::String(name.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates key/value pairs in declaration order. Non-string keys are
    /// skipped here; the validator reports them instead (spec.md section
    /// 4.6 "template keys must be strings").
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_yaml::Value)> {
        self.entries.iter().filter_map(|(k, v)| k.as_str().map(|k| (k, v)))
    }

    /// Raw (key, value) pairs, for callers that must themselves flag a
    /// non-string key rather than have it silently skipped.
    pub fn raw_iter(&self) -> impl Iterator<Item = (&serde_yaml::Value, &serde_yaml::Value)> {
        self.entries.iter()
    }
}

/// One entry in the role manifest's `releases[]` (spec.md section 3
/// "Release References").
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseReference {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// The role manifest's top-level `configuration` block (spec.md section 6).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfiguration {
    #[serde(default)]
    pub templates: TemplateSet,
    /// Declared in manifest order; the validator (spec.md section 4.6)
    /// enforces that this sequence is already sorted by name.
    #[serde(default)]
    pub variables: Vec<VariableDeclaration>,
    #[serde(default)]
    pub auth: AuthConfig,
}
