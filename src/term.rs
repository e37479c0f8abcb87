// SPDX-License-Identifier: MPL-2.0

//! A term is the fundamental unit of operation of the solving algorithm.
//! It is a positive or negative statement about a package constraint.

use std::fmt;

use crate::constraint::VersionConstraint;
use crate::package::Package;
use crate::version::Version;

/// A positive or negative statement about the versions of one package.
///
/// The positive term "a >= 1, < 2" is true when a version of `a` is selected
/// and lies between 1 and 2. The negative term "not a < 3" is true when the
/// selected version of `a` is >= 3, or when no version of `a` is selected
/// at all.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Term<P: Package, V: Version> {
    constraint: VersionConstraint<P, V>,
    positive: bool,
}

/// How one term relates to another, seen as sets of versions.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Relation {
    /// Whenever `self` is true, the other term must be true.
    Subset,
    /// Whenever `self` is true, the other term must be false.
    Disjoint,
    /// Neither of the above can be concluded.
    Overlap,
}

/// Base methods.
impl<P: Package, V: Version> Term<P, V> {
    pub fn new(constraint: VersionConstraint<P, V>, positive: bool) -> Self {
        Self { constraint, positive }
    }

    pub fn positive(constraint: VersionConstraint<P, V>) -> Self {
        Self::new(constraint, true)
    }

    pub fn negative(constraint: VersionConstraint<P, V>) -> Self {
        Self::new(constraint, false)
    }

    /// A positive term selecting exactly one version.
    pub fn exact(package: P, version: V) -> Self {
        Self::positive(VersionConstraint::exact(package, version))
    }

    pub fn package(&self) -> &P {
        self.constraint.package()
    }

    pub fn constraint(&self) -> &VersionConstraint<P, V> {
        &self.constraint
    }

    pub fn is_positive(&self) -> bool {
        self.positive
    }

    /// The constraint this term allows when stated positively:
    /// the constraint itself for a positive term, its inverse otherwise.
    pub fn normalized_constraint(&self) -> VersionConstraint<P, V> {
        if self.positive {
            self.constraint.clone()
        } else {
            self.constraint.inverse()
        }
    }

    /// Negate a term. Evaluation of a negated term always returns
    /// the opposite of the evaluation of the original one.
    pub fn negate(&self) -> Self {
        Self::new(self.constraint.clone(), !self.positive)
    }

    /// A term that can never be true: a positive term over no versions.
    pub(crate) fn is_empty(&self) -> bool {
        self.positive && self.constraint.is_empty()
    }

    /// A term that is always true: a negative term over no versions.
    pub(crate) fn is_always_true(&self) -> bool {
        !self.positive && self.constraint.is_empty()
    }
}

/// Set operations with terms.
impl<P: Package, V: Version> Term<P, V> {
    /// Compute the intersection of two terms about the same package.
    /// If at least one term is positive, the intersection is also positive.
    pub fn intersection(&self, other: &Self) -> Self {
        match (self.positive, other.positive) {
            (true, true) => Self::positive(self.constraint.intersection(&other.constraint)),
            (true, false) => {
                Self::positive(self.constraint.intersection(&other.constraint.inverse()))
            }
            (false, true) => {
                Self::positive(self.constraint.inverse().intersection(&other.constraint))
            }
            (false, false) => Self::negative(self.constraint.union(&other.constraint)),
        }
    }

    /// Versions allowed by this term but not by the other.
    pub fn difference(&self, other: &Self) -> Self {
        self.intersection(&other.negate())
    }

    /// How this term relates to another term about the same package:
    /// [Relation::Subset] when it implies the other, [Relation::Disjoint]
    /// when it excludes it, [Relation::Overlap] otherwise.
    pub fn relation(&self, other: &Self) -> Relation {
        let full_intersection = self.intersection(other);
        if &full_intersection == self {
            Relation::Subset
        } else if full_intersection.is_empty() {
            Relation::Disjoint
        } else {
            Relation::Overlap
        }
    }

    /// Indicate if this term implies the other term.
    pub fn satisfies(&self, other: &Self) -> bool {
        self.relation(other) == Relation::Subset
    }
}

// REPORT ######################################################################

impl<P: Package, V: Version> fmt::Display for Term<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.positive {
            write!(f, "{}", self.constraint)
        } else {
            write!(f, "not {}", self.constraint)
        }
    }
}

// TESTS #######################################################################
