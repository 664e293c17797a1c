//! Variable declarations in the role manifest's global configuration
//! (spec.md section 3 "Variable Declaration", section 4.6 "Variable
//! checks").

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationType {
    Password,
    Certificate,
    SshKey,
    RsaKey,
    None,
}

impl Default for GenerationType {
    fn default() -> Self {
        GenerationType::None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    User,
    Environment,
}

impl Default for ScopeType {
    fn default() -> Self {
        ScopeType::User
    }
}

/// One entry in `configuration.variables` (spec.md section 6). Sequence
/// order and sortedness are a validator invariant, not an in-struct one.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableDeclaration {
    pub name: String,
    #[serde(default)]
    pub generation_type: GenerationType,
    #[serde(default)]
    pub previous_names: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub scope: ScopeType,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub immutable: bool,
}

impl VariableDeclaration {
    /// `environment` scope conflicting with `internal=true` is a
    /// dedicated rule (spec.md section 4.6), not representable purely by
    /// the type.
    pub fn has_environment_internal_conflict(&self) -> bool {
        self.scope == ScopeType::Environment && self.internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_scope_with_internal_is_a_conflict() {
        let v = VariableDeclaration {
            name: "X".into(),
            scope: ScopeType::Environment,
            internal: true,
            ..Default::default()
        };
        assert!(v.has_environment_internal_conflict());
    }

    #[test]
    fn user_scope_with_internal_is_not_a_conflict() {
        let v = VariableDeclaration {
            name: "X".into(),
            scope: ScopeType::User,
            internal: true,
            ..Default::default()
        };
        assert!(!v.has_environment_internal_conflict());
    }
}
