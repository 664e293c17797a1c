//! Signature/Fingerprint Engine (spec.md section 4.7).
//!
//! Produces a stable hex digest per instance group so an external caller
//! (the container-build driver, out of scope per spec.md section 1) can
//! decide whether to rebuild an image.

use std::fs;
use std::path::Path;

use sha1::Sha1;

use crate::error::{ArchiveErrorKind, Result};
use crate::opinions::Opinions;
use crate::registry::ReleaseRegistry;
use crate::structs::instance_group::InstanceGroup;

/// Values mixed into every fingerprint that come from outside the model
/// (spec.md section 4.7 step 5: "an external tooling-version string and a
/// user-supplied extra tag").
#[derive(Clone, Debug, Default)]
pub struct SignatureOptions {
    pub tooling_version: String,
    pub extra_tag: String,
}

/// Accumulates fields for the aggregate digest (spec.md section 4.7
/// "Aggregation"). Each field is hashed with its own length-delimiting NUL
/// terminator so two differently-split sequences of the same total bytes
/// (`{"ab","a"}` vs `{"a","ba"}`) never collide; the total pre-terminator
/// byte count is folded in last as a final belt-and-suspenders distinguisher.
struct Aggregator {
    hasher: Sha1,
    byte_count: usize,
}

impl Aggregator {
    fn new() -> Self {
        Aggregator { hasher: Sha1::new(), byte_count: 0 }
    }

    fn push(&mut self, field: &[u8]) {
        self.hasher.update(field);
        self.hasher.update(&[0u8]);
        self.byte_count += field.len();
    }

    fn push_str(&mut self, field: &str) {
        self.push(field.as_bytes());
    }

    fn finish(mut self) -> String {
        self.hasher.update(self.byte_count.to_string().as_bytes());
        self.hasher.digest().to_string()
    }
}

fn hash_scripts(group: &InstanceGroup, scripts_dir: Option<&Path>, agg: &mut Aggregator) -> Result<()> {
    let mut names: Vec<&String> = group.scripts.iter().collect();
    names.sort();
    for name in names {
        agg.push_str(name);
        let path = Path::new(name);
        let contents = if path.is_absolute() {
            // in-container path: nothing on the build host to hash besides
            // the name itself.
            Vec::new()
        } else if let Some(dir) = scripts_dir {
            fs::read(dir.join(name))
                .map_err(|e| ArchiveErrorKind::Io(format!("{}: {}", dir.join(name).display(), e)))?
        } else {
            Vec::new()
        };
        agg.push(&contents);
    }
    Ok(())
}

fn hash_templates(group: &InstanceGroup, agg: &mut Aggregator) {
    let mut entries: Vec<(&str, String)> = group
        .configuration
        .iter()
        .map(|(k, v)| (k, v.as_str().map(str::to_string).unwrap_or_else(|| serde_yaml::to_string(v).unwrap_or_default())))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in entries {
        agg.push_str(&format!("{}: {}", key, value));
    }
}

fn hash_opinions(group: &InstanceGroup, registry: &ReleaseRegistry, opinions: &Opinions, agg: &mut Aggregator) -> Result<()> {
    for job_ref in &group.jobs {
        let job = registry.find_job(&job_ref.release, &job_ref.name)?;
        let properties = opinions.properties_for_job(job);
        let mut flat = Opinions::flatten(&properties, true);
        flat.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in flat {
            // record-separator byte (0x1E) between the key and value
            // fields of one property (spec.md section 4.7 step 4).
            agg.push_str(&key);
            agg.push(&[0x1E]);
            agg.push_str(&value);
        }
    }
    Ok(())
}

/// Computes an instance group's content fingerprint (spec.md section 4.7).
///
/// Invariant under reordering the releases passed to the loader (content
/// hashes alone drive the digest, not release order) but *not* under
/// reordering `group.jobs` (job references contribute in manifest order).
pub fn fingerprint_instance_group(
    group: &InstanceGroup,
    registry: &ReleaseRegistry,
    opinions: &Opinions,
    scripts_dir: Option<&Path>,
    options: &SignatureOptions,
) -> Result<String> {
    let mut agg = Aggregator::new();

    for job_ref in &group.jobs {
        let release = registry.get(&job_ref.release)?;
        let job = release
            .find_job(&job_ref.name)
            .ok_or_else(|| ArchiveErrorKind::ArchiveMissing(job_ref.name.clone(), job_ref.release.clone()))?;
        agg.push_str(&job.sha1);

        let mut packages: Vec<_> = job
            .package_names
            .iter()
            .filter_map(|name| release.find_package(name))
            .collect();
        packages.sort();
        for pkg in packages {
            agg.push_str(&pkg.sha1);
        }
    }

    hash_scripts(group, scripts_dir, &mut agg)?;
    hash_templates(group, &mut agg);
    hash_opinions(group, registry, opinions, &mut agg)?;

    agg.push_str(&options.tooling_version);
    agg.push_str(&options.extra_tag);

    Ok(agg.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{Job, Release};
    use std::path::PathBuf;

    fn job(name: &str, sha1: &str, packages: Vec<String>) -> Job {
        Job {
            name: name.into(),
            description: String::new(),
            fingerprint: "f".into(),
            sha1: sha1.into(),
            archive_path: PathBuf::from("/tmp/x.tgz"),
            templates: Vec::new(),
            properties: Vec::new(),
            package_names: packages,
            providers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    fn registry_with_release(jobs: Vec<Job>) -> ReleaseRegistry {
        let mut registry = ReleaseRegistry::new();
        let release = Release::new("rel", "1.0", "deadbeef", false, false, PathBuf::from("/tmp"), jobs, Vec::new());
        registry.insert(release).unwrap();
        registry
    }

    fn group_with_jobs(names: &[&str]) -> InstanceGroup {
        use crate::structs::instance_group::JobReference;
        InstanceGroup {
            name: "g".into(),
            jobs: names
                .iter()
                .map(|n| JobReference { name: (*n).to_string(), release: "rel".into(), ..Default::default() })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let registry = registry_with_release(vec![job("a", "sha-a", vec![]), job("b", "sha-b", vec![])]);
        let opinions = Opinions::empty();
        let options = SignatureOptions { tooling_version: "1.2.3".into(), extra_tag: "x".into() };
        let group = group_with_jobs(&["a", "b"]);
        let f1 = fingerprint_instance_group(&group, &registry, &opinions, None, &options).unwrap();
        let f2 = fingerprint_instance_group(&group, &registry, &opinions, None, &options).unwrap();
        assert_eq!(f1, f2);
    }

    #[test]
    fn fingerprint_changes_when_job_reference_order_changes() {
        let registry = registry_with_release(vec![job("a", "sha-a", vec![]), job("b", "sha-b", vec![])]);
        let opinions = Opinions::empty();
        let options = SignatureOptions::default();
        let forward = group_with_jobs(&["a", "b"]);
        let backward = group_with_jobs(&["b", "a"]);
        let f1 = fingerprint_instance_group(&forward, &registry, &opinions, None, &options).unwrap();
        let f2 = fingerprint_instance_group(&backward, &registry, &opinions, None, &options).unwrap();
        assert_ne!(f1, f2);
    }
}
