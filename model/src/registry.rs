//! Release Registry (spec.md section 4.2): a keyed table of every
//! [`Release`] loaded for a run.

use std::collections::BTreeMap;

use crate::error::{ManifestErrorKind, Result};
use crate::release::{Job, Package, Release};

#[derive(Default)]
pub struct ReleaseRegistry {
    releases: BTreeMap<String, Release>,
}

impl ReleaseRegistry {
    pub fn new() -> Self {
        ReleaseRegistry { releases: BTreeMap::new() }
    }

    /// Inserts a release, failing if one of the same name is already
    /// registered.
    pub fn insert(&mut self, release: Release) -> Result<()> {
        if self.releases.contains_key(&release.name) {
            return Err(ManifestErrorKind::DuplicateRelease(release.name).into());
        }
        self.releases.insert(release.name.clone(), release);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Release> {
        self.releases.get(name).ok_or_else(|| ManifestErrorKind::UnknownRelease(name.to_string()).into())
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Release> {
        self.releases.values()
    }

    /// Looks up a job by release name + job name.
    pub fn find_job(&self, release_name: &str, job_name: &str) -> Result<&Job> {
        let release = self.get(release_name)?;
        release
            .find_job(job_name)
            .ok_or_else(|| ManifestErrorKind::UnknownRelease(format!("{}/{}", release_name, job_name)).into())
    }

    /// Looks up a package by release name + package name.
    pub fn find_package(&self, release_name: &str, package_name: &str) -> Result<&Package> {
        let release = self.get(release_name)?;
        release
            .find_package(package_name)
            .ok_or_else(|| ManifestErrorKind::UnknownRelease(format!("{}/{}", release_name, package_name)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn empty_release(name: &str) -> Release {
        Release::new(name, "1.0", "deadbeef", false, false, PathBuf::from("/tmp"), Vec::new(), Vec::new())
    }

    #[test]
    fn rejects_duplicate_release_names() {
        let mut reg = ReleaseRegistry::new();
        reg.insert(empty_release("myrel")).unwrap();
        let err = reg.insert(empty_release("myrel")).unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn lookup_is_exact_match() {
        let mut reg = ReleaseRegistry::new();
        reg.insert(empty_release("myrel")).unwrap();
        assert!(reg.get("myrel").is_ok());
        assert!(reg.get("other").is_err());
    }
}
