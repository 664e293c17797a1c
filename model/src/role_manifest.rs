//! Role Manifest Parser (spec.md section 4.4).
//!
//! Decodes the role manifest document into the entities from spec.md
//! section 3, filling structural defaults (missing instance-group type ->
//! `active-long-running`, missing flight stage -> `flight`, the latter
//! already handled by [`crate::structs::RunSpec`]'s own `Default`) and
//! rejecting unknown instance-group types and tags with the specific error
//! kinds spec.md section 7 names, rather than a generic decode failure.

use crate::error::{ManifestErrorKind, Result};
use crate::structs::configuration::{GlobalConfiguration, ReleaseReference};
use crate::structs::instance_group::{InstanceGroup, InstanceGroupType, JobReference};
use crate::structs::tags::Tag;

/// The fully parsed role manifest (spec.md section 3 "Role Manifest").
#[derive(Clone, Debug, Default)]
pub struct RoleManifest {
    pub instance_groups: Vec<InstanceGroup>,
    pub configuration: GlobalConfiguration,
    pub releases: Vec<ReleaseReference>,
}

/// Raw document shape, decoded with `serde_yaml` before the checked
/// conversion into [`RoleManifest`]/[`InstanceGroup`] below.
#[derive(Debug, Deserialize)]
struct RoleManifestDoc {
    #[serde(default)]
    instance_groups: Vec<InstanceGroupDoc>,
    #[serde(default)]
    configuration: GlobalConfiguration,
    #[serde(default)]
    releases: Vec<ReleaseReference>,
}

#[derive(Debug, Deserialize)]
struct InstanceGroupDoc {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default)]
    group_type: String,
    #[serde(default)]
    jobs: Vec<JobReference>,
    #[serde(default)]
    configuration: crate::structs::configuration::TemplateSet,
    #[serde(default)]
    run: crate::structs::run::RunSpec,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    colocated_instance_groups: Option<Vec<String>>,
    #[serde(default)]
    scripts: Vec<String>,
}

fn build_instance_group(mut doc: InstanceGroupDoc) -> Result<InstanceGroup> {
    let group_type = InstanceGroupType::parse(&doc.group_type).map_err(|raw| {
        ManifestErrorKind::UnknownInstanceGroupType(doc.name.clone(), raw.to_string())
    })?;
    let mut tags = Vec::with_capacity(doc.tags.len());
    for raw in &doc.tags {
        let tag = Tag::parse(raw)
            .map_err(|raw| ManifestErrorKind::UnknownTag(doc.name.clone(), raw.to_string()))?;
        tags.push(tag);
    }
    for job_ref in &mut doc.jobs {
        for port in &mut job_ref.properties.ports {
            port.normalize();
        }
    }
    Ok(InstanceGroup {
        name: doc.name,
        description: doc.description,
        group_type,
        jobs: doc.jobs,
        configuration: doc.configuration,
        run: doc.run,
        tags,
        colocated_instance_groups: doc.colocated_instance_groups,
        scripts: doc.scripts,
    })
}

/// Parses a role manifest document's text into a [`RoleManifest`].
///
/// This performs structural decoding and default-filling only; link
/// resolution (spec.md section 4.5) and the invariant battery (section
/// 4.6) are separate passes run by [`crate::pipeline`].
pub fn parse(text: &str) -> Result<RoleManifest> {
    let doc: RoleManifestDoc = serde_yaml::from_str(text)
        .map_err(|e| ManifestErrorKind::MalformedDocument("<role manifest>".to_string(), e.to_string()))?;

    let mut instance_groups = Vec::with_capacity(doc.instance_groups.len());
    for ig in doc.instance_groups {
        instance_groups.push(build_instance_group(ig)?);
    }

    Ok(RoleManifest { instance_groups, configuration: doc.configuration, releases: doc.releases })
}

impl RoleManifest {
    pub fn find_instance_group(&self, name: &str) -> Option<&InstanceGroup> {
        self.instance_groups.iter().find(|g| g.name == name)
    }

    /// All job references across every instance group, paired with the
    /// name of the instance group that owns them.
    pub fn job_references(&self) -> impl Iterator<Item = (&InstanceGroup, &JobReference)> {
        self.instance_groups.iter().flat_map(|g| g.jobs.iter().map(move |j| (g, j)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
instance_groups:
  - name: api
    jobs:
      - name: server
        release: core
releases:
  - name: core
    version: "1.0"
"#;

    #[test]
    fn parses_minimal_manifest_with_defaults() {
        let manifest = parse(MINIMAL).unwrap();
        assert_eq!(manifest.instance_groups.len(), 1);
        let ig = &manifest.instance_groups[0];
        assert_eq!(ig.group_type, InstanceGroupType::ActiveLongRunning);
        assert_eq!(ig.jobs[0].name, "server");
        assert_eq!(manifest.releases[0].name, "core");
    }

    #[test]
    fn rejects_unknown_instance_group_type() {
        let text = "instance_groups:\n  - name: api\n    type: quantum-leap\n";
        let err = parse(text).unwrap_err();
        assert!(err.to_string().contains("unknown type"));
    }

    #[test]
    fn rejects_unknown_tag() {
        let text = "instance_groups:\n  - name: api\n    tags: [made-up]\n";
        let err = parse(text).unwrap_err();
        assert!(err.to_string().contains("unknown tag"));
    }

    #[test]
    fn normalizes_ports_while_parsing() {
        let text = r#"
instance_groups:
  - name: api
    jobs:
      - name: server
        release: core
        properties:
          ports:
            - name: http
              internal: 8080
            - name: range
              internal_range: "9000-9002"
"#;
        let manifest = parse(text).unwrap();
        let ports = &manifest.instance_groups[0].jobs[0].properties.ports;
        assert_eq!(ports[0].external, 8080);
        assert_eq!(ports[0].count, 1);
        assert_eq!(ports[0].max, 1);
        assert_eq!(ports[1].internal, 9000);
        assert_eq!(ports[1].external, 9000);
        assert_eq!(ports[1].count, 3);
        assert_eq!(ports[1].max, 3);
        assert!(ports[1].internal_range.is_none());
    }
}
