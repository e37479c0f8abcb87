// SPDX-License-Identifier: MPL-2.0

//! A constraint binds a range of versions to a package identity.

use std::fmt;

use crate::package::Package;
use crate::range::VersionRange;
use crate::version::Version;

/// A range of versions of one specific package.
///
/// Set operations are only defined between constraints on the same package;
/// mixing packages is a programming error and panics.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct VersionConstraint<P: Package, V: Version> {
    package: P,
    range: VersionRange<V>,
}

impl<P: Package, V: Version> VersionConstraint<P, V> {
    pub fn new(package: P, range: VersionRange<V>) -> Self {
        Self { package, range }
    }

    /// Constraint allowing every version of a package.
    pub fn any(package: P) -> Self {
        Self::new(package, VersionRange::any())
    }

    /// Constraint allowing exactly one version of a package.
    pub fn exact(package: P, version: V) -> Self {
        Self::new(package, VersionRange::exact(version))
    }

    pub fn package(&self) -> &P {
        &self.package
    }

    pub fn range(&self) -> &VersionRange<V> {
        &self.range
    }

    /// No version satisfies this constraint.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Every version satisfies this constraint.
    pub fn is_any(&self) -> bool {
        self.range.is_any()
    }

    pub fn contains(&self, version: &V) -> bool {
        self.range.contains(version)
    }

    /// Constraint selecting exactly the versions this one rejects.
    pub fn inverse(&self) -> Self {
        Self::new(self.package.clone(), self.range.complement())
    }

    pub fn intersection(&self, other: &Self) -> Self {
        self.check_package(other);
        Self::new(self.package.clone(), self.range.intersection(&other.range))
    }

    pub fn union(&self, other: &Self) -> Self {
        self.check_package(other);
        Self::new(self.package.clone(), self.range.union(&other.range))
    }

    /// Versions allowed by this constraint but not by the other.
    pub fn difference(&self, other: &Self) -> Self {
        self.intersection(&other.inverse())
    }

    pub fn subset_of(&self, other: &Self) -> bool {
        self.check_package(other);
        self.range.subset_of(&other.range)
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.check_package(other);
        self.range.intersects(&other.range)
    }

    fn check_package(&self, other: &Self) {
        assert!(
            self.package == other.package,
            "constraints can only be combined within one package: {} vs {}",
            self.package,
            other.package,
        );
    }
}

impl<P: Package, V: Version> fmt::Display for VersionConstraint<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.package, self.range)
    }
}
