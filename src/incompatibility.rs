// SPDX-License-Identifier: MPL-2.0

//! An incompatibility is a set of terms for different packages
//! that should never be satisfied all together.

use std::fmt;

use crate::constraint::VersionConstraint;
use crate::internal::arena::{Arena, Id};
use crate::package::Package;
use crate::range::VersionRange;
use crate::term::{self, Term};
use crate::version::Version;

/// An incompatibility is a set of terms for different packages
/// that should never be satisfied all together.
///
/// An incompatibility usually originates from a package dependency.
/// For example, if package A at version 1 depends on package B in some
/// range, you can never have both terms `A = 1` and `not B <range>`
/// satisfied at the same time in a partial solution: that would mean we
/// selected A at version 1 but not the B it requires.
///
/// Incompatibilities can also be derived from two other incompatibilities
/// during conflict resolution; the derivation is recorded in the cause so
/// that a failure can be explained.
#[derive(Debug, Clone)]
pub struct Incompatibility<P: Package, V: Version> {
    terms: Vec<Term<P, V>>,
    cause: Cause<P, V>,
}

/// The id of an incompatibility in the solver's store.
pub(crate) type IncompId<P, V> = Id<Incompatibility<P, V>>;

/// How an incompatibility came to be.
#[derive(Debug, Clone)]
pub(crate) enum Cause<P: Package, V: Version> {
    /// The synthetic goal: the root package must be selected.
    Root(P),
    /// A dependency declared by the source for a package version.
    Dependency(P, V, VersionConstraint<P, V>),
    /// The source offered no candidate for this constraint.
    NoVersions(VersionConstraint<P, V>),
    /// Learned from two other incompatibilities during conflict resolution.
    Conflict(IncompId<P, V>, IncompId<P, V>),
}

/// How a set of cumulative terms (the partial solution) compares
/// to an incompatibility.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Relation<P: Package, V: Version> {
    /// The terms satisfy every term of the incompatibility:
    /// the incompatibility is violated.
    Satisfied,
    /// The terms satisfy all but one term, and are inconclusive for that
    /// one. The incompatibility forces the negation of the remaining term.
    AlmostSatisfied(P),
    /// At least one term is contradicted, so the incompatibility
    /// cannot be violated any more at this decision level.
    Contradicted(Term<P, V>),
    /// Otherwise, nothing can be deduced.
    Inconclusive,
}

impl<P: Package, V: Version> Incompatibility<P, V> {
    /// Normalising constructor: merges the terms per package, drops terms
    /// that are always true, and collapses to the failure incompatibility
    /// (no terms at all) when a merged term can never be true.
    fn new(terms: Vec<Term<P, V>>, cause: Cause<P, V>) -> Self {
        let mut merged: Vec<Term<P, V>> = Vec::with_capacity(terms.len());
        for term in terms {
            match merged.iter_mut().find(|t| t.package() == term.package()) {
                Some(existing) => *existing = existing.intersection(&term),
                None => merged.push(term),
            }
        }
        // An always-true term cannot constrain a conflict.
        merged.retain(|term| !term.is_always_true());
        // A term that can never be true proves the conjunction impossible
        // outright, which is what the empty incompatibility states.
        if merged.iter().any(|term| term.is_empty()) {
            merged.clear();
        }
        Self {
            terms: merged,
            cause,
        }
    }

    /// Create the initial incompatibility stating that the root package
    /// must not be left unresolved.
    pub(crate) fn not_root(package: P) -> Self {
        Self {
            terms: vec![Term::negative(VersionConstraint::any(package.clone()))],
            cause: Cause::Root(package),
        }
    }

    /// Build the two-term incompatibility expressing that selecting
    /// `package` at `version` requires the dependency to be satisfied:
    /// `{ package = version, not dependency }`.
    pub fn from_dependency(package: P, version: V, dependency: (P, VersionRange<V>)) -> Self {
        let (dep_package, dep_range) = dependency;
        let dep_constraint = VersionConstraint::new(dep_package, dep_range);
        Self::new(
            vec![
                Term::exact(package.clone(), version.clone()),
                Term::negative(dep_constraint.clone()),
            ],
            Cause::Dependency(package, version, dep_constraint),
        )
    }

    /// Create an incompatibility to remember that the source offered
    /// no version at all for the given positive term.
    pub(crate) fn no_versions(term: Term<P, V>) -> Self {
        debug_assert!(
            term.is_positive(),
            "only a positive term can run out of versions"
        );
        let constraint = term.normalized_constraint();
        Self {
            terms: vec![term],
            cause: Cause::NoVersions(constraint),
        }
    }

    /// Learn a new incompatibility by the rule of resolution: drop the
    /// conflicting package from both parents and keep everything else.
    /// When the satisfier only partially covers the conflicting term, the
    /// uncovered part is negated back into the learned clause.
    pub(crate) fn prior_cause(
        incompat_id: IncompId<P, V>,
        satisfier_cause_id: IncompId<P, V>,
        current_term: &Term<P, V>,
        satisfier_term: &Term<P, V>,
        store: &Arena<Incompatibility<P, V>>,
    ) -> Self {
        let package = current_term.package();
        let mut terms: Vec<Term<P, V>> = store[incompat_id]
            .terms
            .iter()
            .filter(|term| term.package() != package)
            .cloned()
            .collect();
        terms.extend(
            store[satisfier_cause_id]
                .terms
                .iter()
                .filter(|term| term.package() != package)
                .cloned(),
        );
        let difference = satisfier_term.difference(current_term);
        if !difference.is_empty() {
            terms.push(difference.negate());
        }
        Self::new(terms, Cause::Conflict(incompat_id, satisfier_cause_id))
    }

    /// Check if this incompatibility proves that solving failed entirely:
    /// either it has no terms left, or its single term positively
    /// constrains the root package.
    pub(crate) fn is_failure(&self, root: &P) -> bool {
        match self.terms.as_slice() {
            [] => true,
            [term] => term.is_positive() && term.package() == root,
            _ => false,
        }
    }

    /// The merged terms, in first-occurrence order.
    pub fn terms(&self) -> &[Term<P, V>] {
        &self.terms
    }

    /// Get the term related to a given package, if any.
    pub fn get(&self, package: &P) -> Option<&Term<P, V>> {
        self.terms.iter().find(|term| term.package() == package)
    }

    pub(crate) fn cause(&self) -> &Cause<P, V> {
        &self.cause
    }

    /// Retrieve parent ids when this was learned from a conflict.
    pub(crate) fn causes(&self) -> Option<(IncompId<P, V>, IncompId<P, V>)> {
        match self.cause {
            Cause::Conflict(id1, id2) => Some((id1, id2)),
            _ => None,
        }
    }

    /// Compare the incompatibility against the cumulative terms known for
    /// each package, where `terms` yields the cumulative term (if any).
    pub(crate) fn relation(
        &self,
        mut terms: impl FnMut(&P) -> Option<Term<P, V>>,
    ) -> Relation<P, V> {
        let mut relation = Relation::Satisfied;
        for incompat_term in &self.terms {
            let package = incompat_term.package();
            match terms(package).map(|cumulative| cumulative.relation(incompat_term)) {
                Some(term::Relation::Subset) => {}
                Some(term::Relation::Disjoint) => {
                    return Relation::Contradicted(incompat_term.clone());
                }
                // A package the partial solution knows nothing about acts
                // like the always-true term, which is inconclusive here.
                None | Some(term::Relation::Overlap) => {
                    if relation == Relation::Satisfied {
                        relation = Relation::AlmostSatisfied(package.clone());
                    } else {
                        relation = Relation::Inconclusive;
                    }
                }
            }
        }
        relation
    }
}

impl<P: Package, V: Version> fmt::Display for Incompatibility<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, term) in self.terms.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", term)?;
        }
        Ok(())
    }
}

// TESTS #######################################################################

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::term::tests::strategy_for;

    proptest! {

        /// For any three different packages p1, p2 and p3,
        /// for any three terms t1, t2 and t3,
        /// if we have the two following incompatibilities:
        ///    { p1: t1, p2: not t2 }
        ///    { p2: t2, p3: t3 }
        /// the rule of resolution says that we can deduce the following
        /// incompatibility:
        ///    { p1: t1, p3: t3 }
        #[test]
        fn rule_of_resolution(
            t1 in strategy_for("p1"),
            t2 in strategy_for("p2"),
            t3 in strategy_for("p3"),
        ) {
            // Terms over an empty range degenerate to always-true or
            // never-true statements that normalisation folds away.
            prop_assume!(!t1.constraint().is_empty());
            prop_assume!(!t2.constraint().is_empty());
            prop_assume!(!t3.constraint().is_empty());

            let mut store = Arena::new();
            let i1 = store.alloc(Incompatibility::new(
                vec![t1.clone(), t2.negate()],
                Cause::Root("p1"),
            ));
            let i2 = store.alloc(Incompatibility::new(
                vec![t2.clone(), t3.clone()],
                Cause::Root("p2"),
            ));

            // The derivation forced by i2 on p2 is the negation of its
            // p2 term, which exactly satisfies the p2 term of i1.
            let current_term = t2.negate();
            let satisfier_term = t2.negate();
            let learned = Incompatibility::prior_cause(i1, i2, &current_term, &satisfier_term, &store);

            let expected = Incompatibility::new(
                vec![t1, t3],
                Cause::Conflict(i1, i2),
            );
            prop_assert_eq!(learned.terms(), expected.terms());
        }
    }

    #[test]
    fn dependency_shape() {
        let incompat =
            Incompatibility::from_dependency("foo", 1u32, ("bar", VersionRange::between(1u32, 2u32)));
        assert_eq!(incompat.to_string(), "foo = 1, not bar >= 1, < 2");
        assert!(!incompat.is_failure(&"root"));
    }

    #[test]
    fn positive_empty_term_collapses_to_failure() {
        let impossible = Term::positive(VersionConstraint::new("a", VersionRange::<u32>::empty()));
        let incompat = Incompatibility::new(vec![impossible], Cause::Root("root"));
        assert!(incompat.terms().is_empty());
        assert!(incompat.is_failure(&"root"));
    }
}
