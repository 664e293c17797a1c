//! Orchestration entry points (spec.md section 6, SPEC_FULL.md section 0/5).
//!
//! No CLI lives in this crate; a command layer is expected to call these
//! functions in sequence: [`load_releases`] -> [`build_role_manifest`] ->
//! [`resolve_and_validate`] -> [`fingerprint_instance_group`] ->
//! [`render_instance_group`], feeding each stage's output to the next.

use std::path::Path;

use crate::archive::{self, ReleaseLayout};
use crate::error::Result;
use crate::links;
use crate::opinions::Opinions;
use crate::registry::ReleaseRegistry;
use crate::role_manifest::{self, RoleManifest};
use crate::signature::{self, SignatureOptions};
use crate::structs::instance_group::InstanceGroup;
use crate::validate::{self, ValidatorOptions};

/// One release to load against a shared [`ReleaseLayout`].
#[derive(Clone, Debug)]
pub struct ReleaseRequest {
    pub name: String,
    pub version: String,
    pub verify_hashes: bool,
}

/// Loads every requested release into a fresh registry (spec.md section 4.1,
/// section 4.2). Fails on the first archive that can't be read, is missing,
/// or fails its hash check; on a duplicate release name.
pub fn load_releases(layout: &ReleaseLayout, requests: &[ReleaseRequest]) -> Result<ReleaseRegistry> {
    let mut registry = ReleaseRegistry::new();
    for request in requests {
        let release = archive::load_release(layout, &request.name, &request.version, request.verify_hashes)?;
        registry.insert(release)?;
    }
    Ok(registry)
}

/// Parses a role manifest document's text (spec.md section 4.4).
pub fn build_role_manifest(text: &str) -> Result<RoleManifest> {
    role_manifest::parse(text)
}

/// Runs link resolution (spec.md section 4.5) followed by the full invariant
/// battery (section 4.6) over an already-parsed manifest, mutating in place.
pub fn resolve_and_validate(manifest: &mut RoleManifest, registry: &ReleaseRegistry, options: &ValidatorOptions) -> Result<()> {
    links::resolve(manifest, registry)?;
    validate::validate(manifest, registry, options)
}

/// Computes one instance group's content fingerprint (spec.md section 4.7).
pub fn fingerprint_instance_group(
    group: &InstanceGroup,
    registry: &ReleaseRegistry,
    opinions: &Opinions,
    scripts_dir: Option<&Path>,
    options: &SignatureOptions,
) -> Result<String> {
    signature::fingerprint_instance_group(group, registry, opinions, scripts_dir, options)
}

/// Renders one instance group's merged property tree to YAML text (spec.md
/// section 4.8), keyed by the job reference name each property block
/// belongs to.
///
/// This is the one place `roleforge_model` reaches for `roleforge_yaml`:
/// every job's merged properties (section 4.3) become a `Node` via
/// [`roleforge_yaml::Node::from_value`], collected into one mapping, and
/// handed to a default-configured [`roleforge_yaml::Encoder`]. Callers that
/// need custom comments or template-block wrapping build their own tree from
/// the same merged values instead of calling this helper.
pub fn render_instance_group(group: &InstanceGroup, registry: &ReleaseRegistry, opinions: &Opinions) -> Result<String> {
    let mut root = roleforge_yaml::Mapping::new();
    for job_ref in &group.jobs {
        let job = registry.find_job(&job_ref.release, &job_ref.name)?;
        let merged = opinions.properties_for_job(job);
        root.insert(job_ref.name.clone(), roleforge_yaml::Node::from_value(&merged));
    }
    let tree = roleforge_yaml::Node::mapping(root);
    let encoder = roleforge_yaml::Encoder::new(roleforge_yaml::EncoderConfig::default());
    Ok(encoder.render(&tree))
}

/// Write-only hook the (external, out of scope) container-build driver
/// would implement: this crate only ever hands it a finished file path for
/// one instance group, never calls back into it for anything else (spec.md
/// section 6, SPEC_FULL.md section 5).
pub trait ContainerBuildCallback {
    fn on_image_ready(&mut self, instance_group_name: &str, dockerfile_path: &Path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{Job, JobProperty, Release};
    use crate::structs::instance_group::JobReference;
    use serde_yaml::Value;
    use std::path::PathBuf;

    fn job_with_property(name: &str, prop: &str, default: &str) -> Job {
        Job {
            name: name.into(),
            description: String::new(),
            fingerprint: "f".into(),
            sha1: "s".into(),
            archive_path: PathBuf::from("/tmp/x.tgz"),
            templates: Vec::new(),
            properties: vec![JobProperty { name: prop.into(), description: String::new(), default: Value::String(default.into()) }],
            package_names: Vec::new(),
            providers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    #[test]
    fn renders_merged_properties_per_job_reference() {
        let mut registry = ReleaseRegistry::new();
        let release = Release::new(
            "core",
            "1.0",
            "deadbeef",
            false,
            false,
            PathBuf::from("/tmp"),
            vec![job_with_property("server", "port", "8080")],
            Vec::new(),
        );
        registry.insert(release).unwrap();

        let group = InstanceGroup {
            name: "api".into(),
            jobs: vec![JobReference { name: "server".into(), release: "core".into(), ..Default::default() }],
            ..Default::default()
        };

        let opinions = Opinions::empty();
        let out = render_instance_group(&group, &registry, &opinions).unwrap();
        assert!(out.contains("server:"));
        assert!(out.contains("port: 8080"));
    }
}
