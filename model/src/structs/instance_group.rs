//! Instance groups and job references (spec.md section 3 "Instance Group",
//! "Job Reference", "Run spec").

use std::collections::BTreeMap;

use super::configuration::TemplateSet;
use super::link::ResolvedConsumer;
use super::port::Port;
use super::run::RunSpec;
use super::tags::Tag;

/// Scheduling shape of an instance group (spec.md section 3).
///
/// Deliberately not `Deserialize`: the role manifest parser decodes the raw
/// `type` string itself via [`InstanceGroupType::parse`] so an unknown value
/// produces the specific `UnknownInstanceGroupType` error rather than a
/// generic decode failure (spec.md section 9 design note on checked
/// decoding replacing panic-based rescue).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceGroupType {
    ActiveLongRunning,
    OneShotTask,
    CoLocatedSidecar,
}

impl Default for InstanceGroupType {
    fn default() -> Self {
        InstanceGroupType::ActiveLongRunning
    }
}

impl InstanceGroupType {
    /// Parses the manifest's raw kebab-case `type` string. Returns the
    /// original string on failure so the caller can build an
    /// `UnknownInstanceGroupType` error with it. An empty string resolves
    /// to the structural default (spec.md section 4.4 "missing type ->
    /// active-long-running").
    pub fn parse(raw: &str) -> Result<InstanceGroupType, &str> {
        match raw {
            "" => Ok(InstanceGroupType::ActiveLongRunning),
            "active-long-running" => Ok(InstanceGroupType::ActiveLongRunning),
            "one-shot-task" => Ok(InstanceGroupType::OneShotTask),
            "co-located-sidecar" => Ok(InstanceGroupType::CoLocatedSidecar),
            other => Err(other),
        }
    }
}

/// A provider a job reference exposes to the rest of the manifest, with an
/// optional alias under which other job references look it up (spec.md
/// section 3 "explicit exported providers").
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportedProvider {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl ExportedProvider {
    /// The name other job references resolve this provider by: the alias
    /// when set, otherwise the provider's own declared name (spec.md
    /// section 4.5 step 1a).
    pub fn export_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Per-container scheduling knobs on a job reference (spec.md section 3
/// "Container Properties record").
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerProperties {
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub run: RunSpec,
    #[serde(default)]
    pub colocated_containers: Vec<String>,
    #[serde(default)]
    pub service_account: Option<String>,
    #[serde(default)]
    pub pod_security_policy: Option<String>,
}

/// One job bound into an instance group (spec.md section 3 "Job
/// Reference"). `release_name` + `name` resolve to a [`crate::release::Job`]
/// via the [`crate::registry::ReleaseRegistry`]; the reference itself does
/// not own the job.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobReference {
    pub name: String,
    pub release: String,
    #[serde(default)]
    pub provides: Vec<ExportedProvider>,
    /// Manifest-declared overrides of auto-resolution: consumer name ->
    /// alias to resolve through the provider-by-export-name index (spec.md
    /// section 4.5 step 2a).
    #[serde(default)]
    pub consumes: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: ContainerProperties,
    /// Filled in by the link resolver (spec.md section 4.5); empty as
    /// parsed from the manifest document.
    #[serde(skip)]
    pub resolved_consumers: BTreeMap<String, ResolvedConsumer>,
}

/// A deployable unit of one or more co-located jobs (spec.md section 3
/// "Instance Group").
///
/// Built by [`crate::role_manifest`] from the raw document rather than
/// derived `Deserialize` directly, since `group_type` and `tags` need
/// checked decoding (see [`InstanceGroupType::parse`], [`Tag::parse`]).
#[derive(Clone, Debug, Default, Serialize)]
pub struct InstanceGroup {
    pub name: String,
    pub description: String,
    pub group_type: InstanceGroupType,
    pub jobs: Vec<JobReference>,
    pub configuration: TemplateSet,
    pub run: RunSpec,
    pub tags: Vec<Tag>,
    /// Names of `CoLocatedSidecar` instance groups deployed alongside this
    /// one's pods.
    pub colocated_instance_groups: Option<Vec<String>>,
    /// Scripts this group references, either an absolute in-container path
    /// or a name under the `scripts/` directory adjacent to the manifest
    /// (spec.md section 4.6 "Scripts", section 4.7 step 2).
    pub scripts: Vec<String>,
}

impl InstanceGroup {
    /// Every port exposed by this group's own job references, independent
    /// of any co-located sidecars.
    pub fn own_ports(&self) -> Vec<&Port> {
        self.jobs.iter().flat_map(|j| j.properties.ports.iter()).collect()
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_name_falls_back_to_provider_name() {
        let p = ExportedProvider { name: "db".into(), alias: None };
        assert_eq!(p.export_name(), "db");
        let p = ExportedProvider { name: "db".into(), alias: Some("primary-db".into()) };
        assert_eq!(p.export_name(), "primary-db");
    }
}
