//! Link Resolver (spec.md section 4.5).
//!
//! Fills in each job reference's `resolved_consumers`: for every consumer a
//! job declares, which concrete (instance group, job, link name, link type)
//! it binds to, if any.

use std::collections::BTreeMap;

use crate::error::{LinkErrorKind, Result};
use crate::registry::ReleaseRegistry;
use crate::role_manifest::RoleManifest;
use crate::structs::link::{ProviderInfo, ResolvedConsumer};

/// Indexes every exported provider across a role manifest, built once and
/// consulted for every consumer slot (spec.md section 4.5 step 1).
///
/// Construction order is the tie-break for name collisions: instance groups
/// in manifest order, job references in manifest order within a group,
/// declared providers in spec order within a job reference — "first-seen
/// wins", never mutated afterward.
struct ProviderIndex {
    by_export_name: BTreeMap<String, ProviderInfo>,
    by_type: BTreeMap<String, Vec<ProviderInfo>>,
}

impl ProviderIndex {
    fn build(manifest: &RoleManifest, registry: &ReleaseRegistry) -> Result<Self> {
        let mut by_export_name: BTreeMap<String, ProviderInfo> = BTreeMap::new();
        let mut by_type: BTreeMap<String, Vec<ProviderInfo>> = BTreeMap::new();

        for group in &manifest.instance_groups {
            for job_ref in &group.jobs {
                let job = registry.find_job(&job_ref.release, &job_ref.name)?;
                for exported in &job_ref.provides {
                    let decl = job.find_provider(&exported.name);
                    let (link_type, properties) = match decl {
                        Some(d) => (d.link_type.clone(), d.properties.clone()),
                        // A provider exported under a name the job doesn't
                        // declare can't be typed; the validator surfaces
                        // this separately, the resolver just skips it.
                        None => continue,
                    };
                    let info = ProviderInfo {
                        export_name: exported.export_name().to_string(),
                        link_type: link_type.clone(),
                        instance_group: group.name.clone(),
                        job: job_ref.name.clone(),
                        properties,
                    };
                    by_export_name.entry(info.export_name.clone()).or_insert_with(|| info.clone());
                    by_type.entry(link_type).or_default().push(info);
                }
            }
        }
        Ok(ProviderIndex { by_export_name, by_type })
    }

    fn by_name(&self, name: &str) -> Option<&ProviderInfo> {
        self.by_export_name.get(name)
    }

    /// Providers of a given type, in first-seen order.
    fn by_link_type(&self, link_type: &str) -> &[ProviderInfo] {
        self.by_type.get(link_type).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Resolves every consumer slot across every instance group (spec.md
/// section 4.5 step 2). Mutates each job reference's `resolved_consumers`
/// in place; never mutates a provider.
pub fn resolve(manifest: &mut RoleManifest, registry: &ReleaseRegistry) -> Result<()> {
    let index = ProviderIndex::build(manifest, registry)?;

    for group in &mut manifest.instance_groups {
        let group_name = group.name.clone();
        for job_ref in &mut group.jobs {
            let job = registry.find_job(&job_ref.release, &job_ref.name)?;
            let mut resolved = BTreeMap::new();
            for consumer in &job.consumers {
                let picked: Option<&ProviderInfo> = if let Some(alias) = job_ref.consumes.get(&consumer.name) {
                    let found = index.by_name(alias);
                    if found.is_none() {
                        return Err(LinkErrorKind::UnresolvedConsumer(
                            consumer.name.clone(),
                            job_ref.name.clone(),
                            group_name.clone(),
                        )
                        .into());
                    }
                    found
                } else if let Some(found) = index.by_name(&consumer.name) {
                    Some(found)
                } else {
                    let candidates = index.by_link_type(&consumer.link_type);
                    match candidates.len() {
                        1 => Some(&candidates[0]),
                        0 => None,
                        _ if consumer.optional => None,
                        _ => {
                            return Err(LinkErrorKind::AmbiguousProvider(
                                consumer.name.clone(),
                                job_ref.name.clone(),
                                group_name.clone(),
                                consumer.link_type.clone(),
                            )
                            .into())
                        }
                    }
                };

                match picked {
                    Some(provider) => {
                        resolved.insert(consumer.name.clone(), ResolvedConsumer::from(provider));
                    }
                    None if consumer.optional => {}
                    None => {
                        return Err(LinkErrorKind::UnresolvedConsumer(
                            consumer.name.clone(),
                            job_ref.name.clone(),
                            group_name.clone(),
                        )
                        .into())
                    }
                }
            }
            job_ref.resolved_consumers = resolved;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{ConsumerDecl, Job, ProviderDecl, Release};
    use crate::structs::instance_group::{ContainerProperties, ExportedProvider, InstanceGroup, JobReference};
    use std::path::PathBuf;

    fn job(name: &str, providers: Vec<ProviderDecl>, consumers: Vec<ConsumerDecl>) -> Job {
        Job {
            name: name.into(),
            description: String::new(),
            fingerprint: "f".into(),
            sha1: "s".into(),
            archive_path: PathBuf::from("/tmp/x.tgz"),
            templates: Vec::new(),
            properties: Vec::new(),
            package_names: Vec::new(),
            providers,
            consumers,
        }
    }

    fn job_ref(name: &str, release: &str, provides: Vec<ExportedProvider>) -> JobReference {
        JobReference {
            name: name.into(),
            release: release.into(),
            provides,
            consumes: Default::default(),
            properties: ContainerProperties::default(),
            resolved_consumers: Default::default(),
        }
    }

    fn group(name: &str, jobs: Vec<JobReference>) -> InstanceGroup {
        InstanceGroup { name: name.into(), jobs, ..Default::default() }
    }

    fn registry_with(release_name: &str, jobs: Vec<Job>) -> ReleaseRegistry {
        let mut registry = ReleaseRegistry::new();
        let release = Release::new(release_name, "1.0", "deadbeef", false, false, PathBuf::from("/tmp"), jobs, Vec::new());
        registry.insert(release).unwrap();
        registry
    }

    #[test]
    fn resolves_unique_provider_by_type() {
        let provider_job = job(
            "db",
            vec![ProviderDecl { name: "db".into(), link_type: "mysql".into(), properties: vec![] }],
            vec![],
        );
        let consumer_job = job(
            "app",
            vec![],
            vec![ConsumerDecl { name: "db".into(), link_type: "mysql".into(), optional: false }],
        );
        let registry = registry_with("rel", vec![provider_job, consumer_job]);

        let mut manifest = RoleManifest {
            instance_groups: vec![
                group("g1", vec![job_ref("db", "rel", vec![ExportedProvider { name: "db".into(), alias: None }])]),
                group("g2", vec![job_ref("app", "rel", vec![])]),
            ],
            ..Default::default()
        };

        resolve(&mut manifest, &registry).unwrap();
        let resolved = &manifest.instance_groups[1].jobs[0].resolved_consumers;
        let link = resolved.get("db").unwrap();
        assert_eq!(link.instance_group, "g1");
        assert_eq!(link.job, "db");
    }

    #[test]
    fn ambiguous_type_match_fails_for_required_consumer() {
        let provider_job = job(
            "db1",
            vec![ProviderDecl { name: "db".into(), link_type: "mysql".into(), properties: vec![] }],
            vec![],
        );
        let provider_job2 = job(
            "db2",
            vec![ProviderDecl { name: "db".into(), link_type: "mysql".into(), properties: vec![] }],
            vec![],
        );
        let consumer_job = job(
            "app",
            vec![],
            vec![ConsumerDecl { name: "otherdb".into(), link_type: "mysql".into(), optional: false }],
        );
        let registry = registry_with("rel", vec![provider_job, provider_job2, consumer_job]);

        let mut manifest = RoleManifest {
            instance_groups: vec![
                group(
                    "g1",
                    vec![
                        job_ref("db1", "rel", vec![ExportedProvider { name: "db".into(), alias: Some("db-one".into()) }]),
                        job_ref("db2", "rel", vec![ExportedProvider { name: "db".into(), alias: Some("db-two".into()) }]),
                    ],
                ),
                group("g2", vec![job_ref("app", "rel", vec![])]),
            ],
            ..Default::default()
        };

        let err = resolve(&mut manifest, &registry).unwrap_err();
        assert!(err.to_string().contains("more than one provider"));
    }

    #[test]
    fn optional_consumer_left_unresolved_without_error() {
        let consumer_job = job(
            "app",
            vec![],
            vec![ConsumerDecl { name: "cache".into(), link_type: "redis".into(), optional: true }],
        );
        let registry = registry_with("rel", vec![consumer_job]);
        let mut manifest = RoleManifest {
            instance_groups: vec![group("g1", vec![job_ref("app", "rel", vec![])])],
            ..Default::default()
        };
        resolve(&mut manifest, &registry).unwrap();
        assert!(manifest.instance_groups[0].jobs[0].resolved_consumers.is_empty());
    }
}
