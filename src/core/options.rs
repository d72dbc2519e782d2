//! Build options and option sets.
//!
//! A package declares the toggles it understands (`with-foo`, `without-bar`,
//! `HEAD`, ...). The user supplies flags (`--with-foo`). Both sides are held
//! as [`Options`], compared by option name, so that the declaration
//! `with-foo` and the flag `--with-foo` refer to the same [`BuildOption`].

use std::cmp::Ordering;
use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

use crate::core::dependency::Dependency;

/// Sentinel flag selecting a build from the latest source.
pub const HEAD: &str = "HEAD";

/// Sentinel flag selecting a bottle (prebuilt binary) build.
pub const BUILD_BOTTLE: &str = "build-bottle";

/// A single build option.
///
/// Identity is the option name; the description is informational only.
#[derive(Debug, Clone)]
pub struct BuildOption {
    name: String,
    description: String,
}

impl BuildOption {
    /// Create an option without a description.
    pub fn new(name: impl Into<String>) -> Self {
        BuildOption {
            name: name.into(),
            description: String::new(),
        }
    }

    /// Attach a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Parse a command-line flag. One leading `--` is stripped.
    pub fn from_flag(flag: &str) -> Self {
        BuildOption::new(flag.strip_prefix("--").unwrap_or(flag))
    }

    /// The option name, e.g. `with-foo`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The option description (may be empty).
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The command-line form, e.g. `--with-foo`.
    pub fn flag(&self) -> String {
        format!("--{}", self.name)
    }
}

impl PartialEq for BuildOption {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for BuildOption {}

impl PartialOrd for BuildOption {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BuildOption {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for BuildOption {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for BuildOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--{}", self.name)
    }
}

/// A set of build options, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    inner: BTreeSet<BuildOption>,
}

impl Options {
    /// Create an empty option set.
    pub fn new() -> Self {
        Options {
            inner: BTreeSet::new(),
        }
    }

    /// Build a set from declaration names (`with-foo`, `HEAD`, ...).
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|n| BuildOption::new(n.as_ref()))
            .collect()
    }

    /// Build a set from supplied command-line flags (`--with-foo`, ...).
    pub fn from_flags<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        flags
            .into_iter()
            .map(|f| BuildOption::from_flag(f.as_ref()))
            .collect()
    }

    /// Add an option. An option with the same name is kept as-is.
    pub fn insert(&mut self, option: BuildOption) -> bool {
        self.inner.insert(option)
    }

    /// Declare the option a dependency implies, if any.
    pub fn declare_dependency(&mut self, dep: &Dependency) -> bool {
        match dep.implied_option() {
            Some(name) => self.insert(BuildOption::new(name)),
            None => false,
        }
    }

    /// Check whether an option with this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(&BuildOption::new(name))
    }

    /// Look up an option by name.
    pub fn get(&self, name: &str) -> Option<&BuildOption> {
        self.inner.get(&BuildOption::new(name))
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, BuildOption> {
        self.inner.iter()
    }

    /// Option names in order.
    pub fn names(&self) -> Vec<&str> {
        self.inner.iter().map(BuildOption::name).collect()
    }

    /// Options present in both sets, taken from `self`.
    pub fn intersection(&self, other: &Options) -> Options {
        self.inner
            .iter()
            .filter(|o| other.inner.contains(*o))
            .cloned()
            .collect()
    }

    /// Options in `self` that are not in `other`.
    pub fn difference(&self, other: &Options) -> Options {
        self.inner
            .iter()
            .filter(|o| !other.inner.contains(*o))
            .cloned()
            .collect()
    }

    /// Options in either set; `self` wins on duplicate names.
    pub fn union(&self, other: &Options) -> Options {
        let mut merged = self.clone();
        merged.extend(other.iter().cloned());
        merged
    }
}

impl FromIterator<BuildOption> for Options {
    fn from_iter<T: IntoIterator<Item = BuildOption>>(iter: T) -> Self {
        Options {
            inner: iter.into_iter().collect(),
        }
    }
}

impl Extend<BuildOption> for Options {
    fn extend<T: IntoIterator<Item = BuildOption>>(&mut self, iter: T) {
        for option in iter {
            self.inner.insert(option);
        }
    }
}

impl<'a> IntoIterator for &'a Options {
    type Item = &'a BuildOption;
    type IntoIter = btree_set::Iter<'a, BuildOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for option in &self.inner {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}", option)?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for Options {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.inner.iter().map(BuildOption::name))
    }
}
