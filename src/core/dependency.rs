//! Dependencies as capability descriptors.
//!
//! A build query like "is this built with `foo`?" can be asked with a plain
//! option token or with a [`Dependency`], which may answer to several alias
//! tokens. Both go through the [`Capability`] trait.

use std::fmt;

use serde::Serialize;

use crate::core::options::BuildOption;

/// Something that can be switched on or off by build options.
///
/// The returned names are option tokens without the `with-`/`without-`
/// polarity, in priority order.
pub trait Capability {
    fn option_names(&self) -> Vec<&str>;
}

impl Capability for str {
    fn option_names(&self) -> Vec<&str> {
        vec![self]
    }
}

impl Capability for String {
    fn option_names(&self) -> Vec<&str> {
        vec![self.as_str()]
    }
}

impl Capability for BuildOption {
    fn option_names(&self) -> Vec<&str> {
        vec![self.name()]
    }
}

impl<T: Capability + ?Sized> Capability for &T {
    fn option_names(&self) -> Vec<&str> {
        (**self).option_names()
    }
}

/// How a dependency participates in a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyTag {
    /// Needed only while building.
    Build,
    /// Needed only for the test phase.
    Test,
    /// Off unless `--with-<name>` is passed.
    Optional,
    /// On unless `--without-<name>` is passed.
    Recommended,
}

impl std::str::FromStr for DependencyTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" => Ok(DependencyTag::Build),
            "test" => Ok(DependencyTag::Test),
            "optional" => Ok(DependencyTag::Optional),
            "recommended" => Ok(DependencyTag::Recommended),
            _ => Err(format!(
                "invalid dependency tag '{}'; expected 'build', 'test', 'optional', or 'recommended'",
                s
            )),
        }
    }
}

/// A dependency of the package being built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// Full dependency name, possibly tap-qualified (`org/tap/foo`)
    name: String,

    /// Tags controlling when the dependency applies
    tags: Vec<DependencyTag>,

    /// Option tokens this dependency answers to
    option_names: Vec<String>,
}

impl Dependency {
    /// Create a required dependency.
    ///
    /// The default alias is the last `/`-separated segment of the name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let alias = name.rsplit('/').next().unwrap_or(&name).to_string();
        Dependency {
            name,
            tags: Vec::new(),
            option_names: vec![alias],
        }
    }

    /// Parse `name[:tag[:tag...]]`, e.g. `openssl:optional`.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let mut parts = spec.split(':');
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(format!("invalid dependency '{}': missing name", spec));
        }

        let mut dep = Dependency::new(name);
        for tag in parts {
            dep = dep.with_tag(tag.parse()?);
        }
        Ok(dep)
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: DependencyTag) -> Self {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Replace the alias tokens.
    pub fn with_option_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.option_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[DependencyTag] {
        &self.tags
    }

    pub fn is_build(&self) -> bool {
        self.tags.contains(&DependencyTag::Build)
    }

    pub fn is_test(&self) -> bool {
        self.tags.contains(&DependencyTag::Test)
    }

    pub fn is_optional(&self) -> bool {
        self.tags.contains(&DependencyTag::Optional)
    }

    pub fn is_recommended(&self) -> bool {
        self.tags.contains(&DependencyTag::Recommended)
    }

    /// Required unless optional or recommended.
    pub fn is_required(&self) -> bool {
        !self.is_optional() && !self.is_recommended()
    }

    /// The option declaration this dependency implies for its package.
    ///
    /// Optional dependencies are opted into (`with-<alias>`), recommended ones
    /// are opted out of (`without-<alias>`). Optional takes precedence if both
    /// tags are present.
    pub fn implied_option(&self) -> Option<String> {
        let alias = self.option_names.first()?;
        if self.is_optional() {
            Some(format!("with-{}", alias))
        } else if self.is_recommended() {
            Some(format!("without-{}", alias))
        } else {
            None
        }
    }
}

impl Capability for Dependency {
    fn option_names(&self) -> Vec<&str> {
        self.option_names.iter().map(String::as_str).collect()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
