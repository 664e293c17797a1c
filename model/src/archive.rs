//! Archive Loader (spec.md section 4.1).
//!
//! Reads a release's manifest document plus its job/package archives and
//! returns a fully populated [`Release`]. Everything here is a straight
//! line: read manifest, resolve each archive path, optionally verify its
//! hash, extract jobs to a scratch directory, decode `job.MF`, clean up.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use regex::Regex;
use sha1::Sha1;

use crate::error::{ArchiveErrorKind, Result};
use crate::release::{ConsumerDecl, Job, JobProperty, Package, ProviderDecl, Release, Template};

/// Where a release's manifest and archives live on disk.
#[derive(Clone, Debug)]
pub enum ReleaseLayout {
    /// `<root>/dev_releases/<release>/<name>-<version>.yml` plus
    /// content-addressed archives under an optional blob cache.
    Dev { root: PathBuf, cache: Option<PathBuf> },
    /// `<root>/release.MF` plus name-addressed archives under `<root>`.
    Final { root: PathBuf },
}

impl ReleaseLayout {
    fn manifest_path(&self, release_name: &str, version: &str) -> PathBuf {
        match self {
            ReleaseLayout::Dev { root, .. } => {
                root.join("dev_releases").join(release_name).join(format!("{}-{}.yml", release_name, version))
            }
            ReleaseLayout::Final { root } => root.join("release.MF"),
        }
    }

    fn is_dev(&self) -> bool {
        matches!(self, ReleaseLayout::Dev { .. })
    }

    fn root(&self) -> &Path {
        match self {
            ReleaseLayout::Dev { root, .. } => root,
            ReleaseLayout::Final { root } => root,
        }
    }
}

/// `<root>/dev_releases/<release>/index.yml`: maps a release name to the
/// set of builds (and hence versions) ever produced for it locally.
pub struct ReleaseIndex {
    builds: Vec<String>,
}

impl ReleaseIndex {
    pub fn load(root: &Path, release_name: &str) -> Result<Self> {
        let path = root.join("dev_releases").join(release_name).join("index.yml");
        let text = fs::read_to_string(&path)
            .map_err(|e| ArchiveErrorKind::Io(format!("{}: {}", path.display(), e)))?;
        let doc: serde_yaml::Value = serde_yaml::from_str(&text)
            .map_err(|e| ArchiveErrorKind::MalformedDocument(path.display().to_string(), e.to_string()))?;
        let builds = doc
            .get("builds")
            .and_then(|b| b.as_mapping())
            .map(|m| {
                m.values()
                    .filter_map(|entry| entry.get("version").and_then(|v| v.as_str()).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(ReleaseIndex { builds })
    }

    /// The highest version among this index's builds, compared as semver
    /// where possible and falling back to lexical order otherwise.
    pub fn latest_version(&self) -> Option<&str> {
        self.builds
            .iter()
            .max_by(|a, b| match (semver::Version::parse(a), semver::Version::parse(b)) {
                (Ok(va), Ok(vb)) => va.cmp(&vb),
                _ => a.cmp(b),
            })
            .map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseManifestDoc {
    name: String,
    version: String,
    commit_hash: String,
    #[serde(default)]
    uncommitted_changes: bool,
    #[serde(default)]
    jobs: Vec<ArchiveEntry>,
    #[serde(default)]
    packages: Vec<PackageEntry>,
    #[serde(default)]
    license: Option<LicenseEntry>,
}

#[derive(Debug, Deserialize)]
struct ArchiveEntry {
    name: String,
    version: String,
    fingerprint: String,
    sha1: String,
}

#[derive(Debug, Deserialize)]
struct PackageEntry {
    name: String,
    version: String,
    fingerprint: String,
    sha1: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LicenseEntry {
    #[allow(dead_code)]
    sha1: String,
}

#[derive(Debug, Deserialize)]
struct JobSpecDoc {
    #[serde(default)]
    description: String,
    #[serde(default)]
    templates: BTreeMap<String, String>,
    #[serde(default)]
    properties: BTreeMap<String, JobSpecProperty>,
    #[serde(default)]
    packages: Vec<String>,
    #[serde(default)]
    provides: Vec<JobSpecProvider>,
    #[serde(default)]
    consumes: Vec<JobSpecConsumer>,
}

#[derive(Debug, Deserialize, Default)]
struct JobSpecProperty {
    #[serde(default)]
    description: String,
    #[serde(default)]
    default: serde_yaml::Value,
}

#[derive(Debug, Deserialize)]
struct JobSpecProvider {
    name: String,
    #[serde(rename = "type")]
    link_type: String,
    #[serde(default)]
    properties: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct JobSpecConsumer {
    name: String,
    #[serde(rename = "type")]
    link_type: String,
    #[serde(default)]
    optional: bool,
}

/// Normalize the historical single-`!` binary tag to the standard `!!`
/// form before handing text to `serde_yaml` (spec.md section 4.1 corner
/// case).
fn normalize_binary_tag(text: &str) -> String {
    let re = Regex::new(r"!{1,2}binary").expect("static regex");
    re.replace_all(text, "!!binary").into_owned()
}

fn read_yaml_document(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| ArchiveErrorKind::Io(format!("{}: {}", path.display(), e)))?;
    Ok(normalize_binary_tag(&raw))
}

fn archive_path_for(layout: &ReleaseLayout, kind: &str, name: &str, sha1: &str) -> PathBuf {
    match layout {
        ReleaseLayout::Dev { cache, .. } => match cache {
            Some(cache) => cache.join(sha1),
            None => layout.root().join(kind).join(format!("{}.tgz", name)),
        },
        ReleaseLayout::Final { .. } => layout.root().join(kind).join(format!("{}.tgz", name)),
    }
}

fn verify_sha1(path: &Path, declared: &str, label: &str) -> Result<()> {
    let mut f = File::open(path).map_err(|e| ArchiveErrorKind::Io(format!("{}: {}", path.display(), e)))?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = f.read(&mut buf).map_err(|e| ArchiveErrorKind::Io(format!("{}: {}", path.display(), e)))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    // file handle is dropped (closed) here, before the hash comparison below
    drop(f);
    let actual = hasher.digest().to_string();
    if actual != declared {
        return Err(ArchiveErrorKind::HashMismatch(label.to_string(), actual, declared.to_string()).into());
    }
    Ok(())
}

fn extract_job_spec(archive: &Path) -> Result<(JobSpecDoc, Vec<Template>)> {
    let dir = tempfile::Builder::new()
        .prefix("roleforge-job-")
        .tempdir()
        .map_err(|e| ArchiveErrorKind::Io(e.to_string()))?;
    // `dir` removes itself on every exit path out of this function,
    // success or error, including an early `?` return.
    let f = File::open(archive).map_err(|e| ArchiveErrorKind::Io(format!("{}: {}", archive.display(), e)))?;
    let gz = flate2::read::GzDecoder::new(f);
    let mut tarball = tar::Archive::new(gz);
    tarball
        .unpack(dir.path())
        .map_err(|e| ArchiveErrorKind::Io(format!("unpacking {}: {}", archive.display(), e)))?;

    let spec_path = dir.path().join("job.MF");
    let text = read_yaml_document(&spec_path)?;
    let spec: JobSpecDoc = serde_yaml::from_str(&text)
        .map_err(|e| ArchiveErrorKind::MalformedDocument(spec_path.display().to_string(), e.to_string()))?;

    let templates_dir = dir.path().join("templates");
    let mut templates: Vec<_> = spec
        .templates
        .iter()
        .map(|(src, dest)| Template { source: src.clone(), destination: dest.clone() })
        .collect();
    templates.sort_by(|a, b| a.source.cmp(&b.source));
    let _ = templates_dir; // templates are read by path reference only; contents are read later by callers that render them

    Ok((spec, templates))
}

/// Load a full [`Release`] from disk, optionally verifying every archive's
/// declared SHA1.
pub fn load_release(layout: &ReleaseLayout, name: &str, version: &str, verify_hashes: bool) -> Result<Release> {
    let manifest_path = layout.manifest_path(name, version);
    let text = read_yaml_document(&manifest_path)?;
    let doc: ReleaseManifestDoc = serde_yaml::from_str(&text)
        .map_err(|e| ArchiveErrorKind::MalformedDocument(manifest_path.display().to_string(), e.to_string()))?;

    let mut packages = Vec::with_capacity(doc.packages.len());
    for p in &doc.packages {
        let archive_path = archive_path_for(layout, "packages", &p.name, &p.sha1);
        if !archive_path.exists() {
            return Err(ArchiveErrorKind::ArchiveMissing(p.name.clone(), archive_path.display().to_string()).into());
        }
        if verify_hashes {
            verify_sha1(&archive_path, &p.sha1, &p.name)?;
        }
        packages.push(Package::new(
            p.name.clone(),
            p.fingerprint.clone(),
            p.sha1.clone(),
            archive_path,
            p.version.clone(),
            p.dependencies.clone(),
        ));
    }

    let mut jobs = Vec::with_capacity(doc.jobs.len());
    for j in &doc.jobs {
        let archive_path = archive_path_for(layout, "jobs", &j.name, &j.sha1);
        if !archive_path.exists() {
            return Err(ArchiveErrorKind::ArchiveMissing(j.name.clone(), archive_path.display().to_string()).into());
        }
        if verify_hashes {
            verify_sha1(&archive_path, &j.sha1, &j.name)?;
        }
        let (spec, templates) = extract_job_spec(&archive_path)?;

        // Properties are read out in lexicographic key order (BTreeMap
        // already guarantees this) to produce a deterministic in-memory
        // order regardless of how they appeared in job.MF.
        let properties = spec
            .properties
            .into_iter()
            .map(|(name, p)| JobProperty { name, description: p.description, default: p.default })
            .collect();

        let providers = spec
            .provides
            .into_iter()
            .map(|p| ProviderDecl { name: p.name, link_type: p.link_type, properties: p.properties })
            .collect();
        let consumers = spec
            .consumes
            .into_iter()
            .map(|c| ConsumerDecl { name: c.name, link_type: c.link_type, optional: c.optional })
            .collect();

        jobs.push(Job {
            name: j.name.clone(),
            description: spec.description,
            fingerprint: j.fingerprint.clone(),
            sha1: j.sha1.clone(),
            archive_path,
            templates,
            properties,
            package_names: spec.packages,
            providers,
            consumers,
        });
    }

    let mut release = Release::new(
        doc.name,
        doc.version,
        doc.commit_hash,
        doc.uncommitted_changes,
        layout.is_dev(),
        layout.root().to_path_buf(),
        jobs,
        packages,
    );
    release.link_package_dependencies()?;
    Ok(release)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_single_bang_binary_tag() {
        let input = "key: !binary |\n  aGVsbG8=\n";
        let out = normalize_binary_tag(input);
        assert_eq!(out, "key: !!binary |\n  aGVsbG8=\n");
    }

    #[test]
    fn leaves_already_doubled_tag_alone() {
        let input = "key: !!binary |\n  aGVsbG8=\n";
        let out = normalize_binary_tag(input);
        assert_eq!(out, input);
    }

    #[test]
    fn release_index_picks_highest_semver_build() {
        let dir = tempfile::tempdir().unwrap();
        let rel_dir = dir.path().join("dev_releases").join("myrel");
        fs::create_dir_all(&rel_dir).unwrap();
        fs::write(
            rel_dir.join("index.yml"),
            "builds:\n  aaa:\n    version: \"1.2.0\"\n  bbb:\n    version: \"1.10.0\"\n  ccc:\n    version: \"1.3.0\"\n",
        )
        .unwrap();
        let idx = ReleaseIndex::load(dir.path(), "myrel").unwrap();
        assert_eq!(idx.latest_version(), Some("1.10.0"));
    }
}
