//! Authorization descriptors from the role manifest's global configuration
//! (spec.md section 6 "configuration.auth.{roles,cluster-roles,accounts,
//! pod-security-policies}", section 4.6 "Service accounts").

/// A namespace-scoped role an account may bind to.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<String>,
}

/// A cluster-scoped role an account may bind to.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterRole {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<String>,
}

/// A service account, referenced by name from
/// [`crate::structs::ContainerProperties::service_account`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Account {
    pub name: String,
    /// Names of [`Role`]/[`ClusterRole`] entries this account is bound to.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// The known pod security policy names this toolchain abstracts over
/// (spec.md section 4.6 "if unset, default to the least-privileged name;
/// if set, must be one of the known names").
pub const KNOWN_POD_SECURITY_POLICIES: &[&str] = &["restricted", "baseline", "privileged"];

/// Least-privileged default applied when an instance group declares none.
pub const DEFAULT_POD_SECURITY_POLICY: &str = "restricted";

/// `configuration.auth` (spec.md section 6).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default, rename = "cluster-roles")]
    pub cluster_roles: Vec<ClusterRole>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Extra policy names this manifest declares valid, beyond
    /// [`KNOWN_POD_SECURITY_POLICIES`].
    #[serde(default, rename = "pod-security-policies")]
    pub pod_security_policies: Vec<String>,
}

impl AuthConfig {
    pub fn find_account(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name == name)
    }

    pub fn role_exists(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name) || self.cluster_roles.iter().any(|r| r.name == name)
    }

    pub fn is_known_pod_security_policy(&self, name: &str) -> bool {
        KNOWN_POD_SECURITY_POLICIES.contains(&name) || self.pod_security_policies.iter().any(|p| p == name)
    }
}
