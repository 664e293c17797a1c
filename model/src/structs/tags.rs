//! Instance-group tags (spec.md section 4.6 "Tags").

use super::instance_group::InstanceGroupType;

/// A tag attached to an instance group, constraining or enriching its
/// deployment behavior.
///
/// Parsed from the manifest's raw string form via [`Tag::parse`] rather
/// than a derived `Deserialize`, so an unrecognized tag produces the
/// specific `UnknownTag` error the role manifest parser needs instead of
/// a generic decode failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    /// Requires `ActiveLongRunning` and a non-empty active-passive probe.
    ActivePassive,
    /// Requires `OneShotTask`.
    StopOnFailure,
    /// Valid on any instance-group type: excludes the group from service
    /// discovery / ingress wiring.
    Headless,
    /// Valid on any instance-group type: restricts the group to
    /// intra-cluster traffic only.
    InternalOnly,
}

impl Tag {
    /// The manifest's raw kebab-case spelling of this tag, the inverse of
    /// [`Tag::parse`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::ActivePassive => "active-passive",
            Tag::StopOnFailure => "stop-on-failure",
            Tag::Headless => "headless",
            Tag::InternalOnly => "internal-only",
        }
    }

    /// Parses a manifest's raw kebab-case tag string. Returns the
    /// original string back on failure so the caller can build an
    /// `UnknownTag` error with it.
    pub fn parse(raw: &str) -> Result<Tag, &str> {
        match raw {
            "active-passive" => Ok(Tag::ActivePassive),
            "stop-on-failure" => Ok(Tag::StopOnFailure),
            "headless" => Ok(Tag::Headless),
            "internal-only" => Ok(Tag::InternalOnly),
            other => Err(other),
        }
    }

    /// Instance-group types this tag is permitted on. An empty check
    /// against the owning group's actual type is the validator's job
    /// (spec.md section 4.6); this just states the rule.
    pub fn acceptable_group_types(&self) -> &'static [InstanceGroupType] {
        use InstanceGroupType::*;
        match self {
            Tag::ActivePassive => &[ActiveLongRunning],
            Tag::StopOnFailure => &[OneShotTask],
            Tag::Headless | Tag::InternalOnly => {
                &[ActiveLongRunning, OneShotTask, CoLocatedSidecar]
            }
        }
    }

    pub fn requires_active_passive_probe(&self) -> bool {
        matches!(self, Tag::ActivePassive)
    }
}

impl serde::Serialize for Tag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
