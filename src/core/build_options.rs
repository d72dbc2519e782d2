//! Build option resolution.
//!
//! [`BuildOptions`] answers "is this build configured with X?" from two
//! immutable option sets: what the package declares and what the user
//! passed. A declaration fixes the default polarity of a toggle:
//!
//! | declared       | `--with-foo` passed | `--without-foo` passed | neither |
//! |----------------|---------------------|------------------------|---------|
//! | `with-foo`     | on                  | off                    | off     |
//! | `without-foo`  | on                  | off                    | on      |
//! | (undeclared)   | off                 | off                    | off     |
//!
//! When both `with-foo` and `without-foo` are declared, the `with-` row
//! applies.

use std::fmt;

use crate::core::dependency::{Capability, Dependency};
use crate::core::options::{Options, BUILD_BOTTLE, HEAD};

/// Options for a single package build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Flags supplied by the user
    args: Options,

    /// Options the package declares
    options: Options,
}

impl BuildOptions {
    /// Create a resolver from supplied flags and declared options.
    pub fn new(args: Options, options: Options) -> Self {
        BuildOptions { args, options }
    }

    /// True if the build is configured with `capability`.
    ///
    /// Any one of the capability's aliases being enabled is enough.
    ///
    /// ```
    /// use keg::core::{BuildOptions, Options};
    ///
    /// let build = BuildOptions::new(
    ///     Options::from_flags(["--with-foo"]),
    ///     Options::from_names(["with-foo", "without-bar"]),
    /// );
    /// assert!(build.with("foo"));
    /// assert!(build.with("bar"));
    /// assert!(!build.with("baz"));
    /// ```
    pub fn with<C: Capability + ?Sized>(&self, capability: &C) -> bool {
        capability
            .option_names()
            .into_iter()
            .any(|name| self.name_enabled(name))
    }

    /// True if the build is configured without `capability`.
    pub fn without<C: Capability + ?Sized>(&self, capability: &C) -> bool {
        !self.with(capability)
    }

    /// True if building a bottle.
    pub fn is_bottle(&self) -> bool {
        self.args.contains(BUILD_BOTTLE)
    }

    /// True if building from the latest source instead of a release.
    pub fn is_head(&self) -> bool {
        self.args.contains(HEAD)
    }

    /// True if building a released version. This is the default.
    pub fn is_stable(&self) -> bool {
        !self.is_head()
    }

    pub fn any_args_or_options(&self) -> bool {
        !self.args.is_empty() || !self.options.is_empty()
    }

    /// Declared options the user passed.
    pub fn used_options(&self) -> Options {
        self.options.intersection(&self.args)
    }

    /// Declared options the user did not pass.
    pub fn unused_options(&self) -> Options {
        self.options.difference(&self.args)
    }

    /// True if an optional or recommended dependency is switched off.
    pub fn should_prune(&self, dep: &Dependency) -> bool {
        !dep.is_required() && self.without(dep)
    }

    pub fn args(&self) -> &Options {
        &self.args
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn name_enabled(&self, name: &str) -> bool {
        let with = format!("with-{}", name);
        if self.options.contains(&with) {
            return self.args.contains(&with);
        }

        let without = format!("without-{}", name);
        if self.options.contains(&without) {
            return !self.args.contains(&without);
        }

        false
    }
}

impl fmt::Display for BuildOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[BuildOptions: args={} options={}]",
            self.args, self.options
        )
    }
}
