//! Exposed port declarations on a job reference's container properties
//! (spec.md section 4.6 "Instance-group checks").

/// `TCP` or `UDP`; anything else is a `ConfigError` at validation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Tcp
    }
}

/// One exposed port. `internal_range`/`external_range` are the legacy
/// string forms (e.g. `"8080-8090"`); [`Port::normalize`] resolves them
/// into `internal`/`external`/`count`/`max` and clears the legacy fields,
/// matching spec.md section 4.6's "legacy string port range fields are
/// cleared after normalization".
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Port {
    pub name: String,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub internal: u32,
    #[serde(default)]
    pub external: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub max: u32,
    #[serde(default)]
    pub internal_range: Option<String>,
    #[serde(default)]
    pub external_range: Option<String>,
    /// Whether an operator, not just the release author, may reconfigure
    /// this port's name at deploy time. Tightens the name-length rule.
    #[serde(default)]
    pub user_configurable: bool,
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    let mut parts = range.splitn(2, '-');
    let start: u32 = parts.next()?.trim().parse().ok()?;
    let end: u32 = match parts.next() {
        Some(e) => e.trim().parse().ok()?,
        None => start,
    };
    Some((start, end))
}

impl Port {
    /// Resolves legacy range strings into concrete fields, defaults
    /// `external` to `internal` and `max` to `count`, then clears the
    /// legacy fields. Idempotent.
    pub fn normalize(&mut self) {
        if let Some(range) = self.internal_range.take() {
            if let Some((start, end)) = parse_range(&range) {
                self.internal = start;
                if self.count == 0 {
                    self.count = end.saturating_sub(start) + 1;
                }
            }
        }
        if let Some(range) = self.external_range.take() {
            if let Some((start, _end)) = parse_range(&range) {
                self.external = start;
            }
        }
        if self.external == 0 {
            self.external = self.internal;
        }
        if self.count == 0 {
            self.count = 1;
        }
        if self.max == 0 {
            self.max = self.count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_defaults_external_to_internal() {
        let mut p = Port { name: "http".into(), internal: 8080, ..Default::default() };
        p.normalize();
        assert_eq!(p.external, 8080);
        assert_eq!(p.count, 1);
        assert_eq!(p.max, 1);
    }

    #[test]
    fn normalize_resolves_legacy_range_and_clears_it() {
        let mut p = Port {
            name: "http".into(),
            internal_range: Some("8080-8082".into()),
            ..Default::default()
        };
        p.normalize();
        assert_eq!(p.internal, 8080);
        assert_eq!(p.count, 3);
        assert_eq!(p.max, 3);
        assert!(p.internal_range.is_none());
    }
}
