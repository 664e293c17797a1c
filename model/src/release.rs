//! Release, Package and Job entities (spec.md section 3).
//!
//! A `Release` owns its `Job`s and `Package`s exclusively; nothing else in
//! this crate holds them by value, only by name-reference that gets
//! resolved back to a pointer during link resolution and manifest merging.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A loaded BOSH-style release: a named, versioned bundle of jobs and
/// packages with content-addressed archives.
#[derive(Clone, Debug)]
pub struct Release {
    pub name: String,
    pub version: String,
    pub commit_hash: String,
    pub uncommitted_changes: bool,
    pub dev: bool,
    pub path: PathBuf,
    jobs: Vec<Job>,
    packages: Vec<Package>,
}

impl Release {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        commit_hash: impl Into<String>,
        uncommitted_changes: bool,
        dev: bool,
        path: PathBuf,
        jobs: Vec<Job>,
        packages: Vec<Package>,
    ) -> Self {
        Release {
            name: name.into(),
            version: version.into(),
            commit_hash: commit_hash.into(),
            uncommitted_changes,
            dev,
            path,
            jobs,
            packages,
        }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn find_job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn find_package(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Wire each package's declared dependency names to pointers into this
    /// release's own package index (spec.md section 4.1, "After loading
    /// packages, wire each package's dependency names...").
    pub fn link_package_dependencies(&mut self) -> Result<(), crate::error::ArchiveErrorKind> {
        let index: BTreeMap<String, usize> =
            self.packages.iter().enumerate().map(|(i, p)| (p.name.clone(), i)).collect();
        // Resolve by name first so the borrow checker never needs two
        // mutable views of `self.packages` at once.
        let mut resolved: Vec<Vec<usize>> = Vec::with_capacity(self.packages.len());
        for pkg in &self.packages {
            let mut deps = Vec::with_capacity(pkg.dependency_names.len());
            for dep_name in &pkg.dependency_names {
                match index.get(dep_name) {
                    Some(&idx) => deps.push(idx),
                    None => {
                        return Err(crate::error::ArchiveErrorKind::UnresolvedDependency(
                            pkg.name.clone(),
                            dep_name.clone(),
                        ))
                    }
                }
            }
            resolved.push(deps);
        }
        for (pkg, deps) in self.packages.iter_mut().zip(resolved) {
            pkg.dependencies = deps;
        }
        Ok(())
    }
}

/// A compiled-software package owned by a [`Release`].
#[derive(Clone, Debug)]
pub struct Package {
    pub name: String,
    pub fingerprint: String,
    pub sha1: String,
    pub archive_path: PathBuf,
    pub version: String,
    /// Raw dependency names as declared in the release manifest, before
    /// [`Release::link_package_dependencies`] resolves them to indices.
    pub dependency_names: Vec<String>,
    /// Indices into the owning release's package list, populated by
    /// [`Release::link_package_dependencies`].
    pub dependencies: Vec<usize>,
}

impl Package {
    pub fn new(
        name: impl Into<String>,
        fingerprint: impl Into<String>,
        sha1: impl Into<String>,
        archive_path: PathBuf,
        version: impl Into<String>,
        dependency_names: Vec<String>,
    ) -> Self {
        Package {
            name: name.into(),
            fingerprint: fingerprint.into(),
            sha1: sha1.into(),
            archive_path,
            version: version.into(),
            dependency_names,
            dependencies: Vec::new(),
        }
    }
}

/// Deterministic ordering by fingerprint, used by the signature engine
/// (spec.md section 4.7 step 1: "for each package (in fingerprint-sorted
/// order)").
impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}
impl Eq for Package {}
impl PartialOrd for Package {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Package {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fingerprint.cmp(&other.fingerprint)
    }
}

/// A template file shipped by a [`Job`]: a source path inside the job
/// archive and the destination path it renders to on the deployed host.
#[derive(Clone, Debug)]
pub struct Template {
    pub source: String,
    pub destination: String,
}

/// One property a job's spec declares a default for.
#[derive(Clone, Debug)]
pub struct JobProperty {
    pub name: String,
    pub description: String,
    pub default: serde_yaml::Value,
}

/// A link another job can bind to, published by this job.
#[derive(Clone, Debug)]
pub struct ProviderDecl {
    pub name: String,
    pub link_type: String,
    pub properties: Vec<String>,
}

/// A link this job wants bound to some other job's provider.
#[derive(Clone, Debug)]
pub struct ConsumerDecl {
    pub name: String,
    pub link_type: String,
    pub optional: bool,
}

/// A BOSH job: config templates, scripts and declared links, owned by a
/// [`Release`].
#[derive(Clone, Debug)]
pub struct Job {
    pub name: String,
    pub description: String,
    pub fingerprint: String,
    pub sha1: String,
    pub archive_path: PathBuf,
    pub templates: Vec<Template>,
    pub properties: Vec<JobProperty>,
    /// Names of packages (within the owning release) this job depends on.
    pub package_names: Vec<String>,
    pub providers: Vec<ProviderDecl>,
    pub consumers: Vec<ConsumerDecl>,
}

impl Job {
    pub fn find_provider(&self, name: &str) -> Option<&ProviderDecl> {
        self.providers.iter().find(|p| p.name == name)
    }
}
