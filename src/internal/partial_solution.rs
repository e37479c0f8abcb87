// SPDX-License-Identifier: MPL-2.0

//! The partial solution is the current state of the solution being built
//! by the algorithm: an ordered trail of assignments, together with a
//! per-package view of the terms asserted so far.

use std::fmt;
use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::FxHasher;

use crate::constraint::VersionConstraint;
use crate::incompatibility::IncompId;
use crate::package::Package;
use crate::term::{Relation, Term};
use crate::type_aliases::SelectedVersions;
use crate::version::Version;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Number of decisions on the trail up to and including an assignment.
/// Level 0 holds the derivations made before any decision.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct DecisionLevel(pub u32);

impl DecisionLevel {
    pub fn increment(self) -> Self {
        Self(self.0 + 1)
    }
}

/// An entry on the trail: either a decision (a chosen version for a
/// package) or a derivation (a term forced by an incompatibility, whose id
/// is recorded as the cause).
#[derive(Debug, Clone)]
pub enum Assignment<P: Package, V: Version> {
    Decision {
        package: P,
        version: V,
        decision_level: DecisionLevel,
        index: usize,
    },
    Derivation {
        term: Term<P, V>,
        decision_level: DecisionLevel,
        index: usize,
        cause: IncompId<P, V>,
    },
}

impl<P: Package, V: Version> Assignment<P, V> {
    pub fn package(&self) -> &P {
        match self {
            Self::Decision { package, .. } => package,
            Self::Derivation { term, .. } => term.package(),
        }
    }

    pub fn decision_level(&self) -> DecisionLevel {
        match self {
            Self::Decision { decision_level, .. } => *decision_level,
            Self::Derivation { decision_level, .. } => *decision_level,
        }
    }

    /// Position in the trail; strictly increasing over time.
    pub fn index(&self) -> usize {
        match self {
            Self::Decision { index, .. } => *index,
            Self::Derivation { index, .. } => *index,
        }
    }

    /// The incompatibility that forced a derivation; `None` for decisions.
    pub fn cause(&self) -> Option<IncompId<P, V>> {
        match self {
            Self::Decision { .. } => None,
            Self::Derivation { cause, .. } => Some(*cause),
        }
    }

    /// The term asserted by this assignment: a decision implicitly asserts
    /// the positive term selecting exactly its version.
    pub fn as_term(&self) -> Term<P, V> {
        match self {
            Self::Decision {
                package, version, ..
            } => Term::exact(package.clone(), version.clone()),
            Self::Derivation { term, .. } => term.clone(),
        }
    }
}

/// Cumulative knowledge about one package: the intersection of every term
/// asserted about it on the trail, plus the decided version if any.
#[derive(Debug, Clone)]
struct PackageAssignment<P: Package, V: Version> {
    term: Term<P, V>,
    decision: Option<V>,
}

/// The partial solution: append-only trail (except for backtracking) and
/// the per-package cumulative view derived from it.
#[derive(Clone)]
pub struct PartialSolution<P: Package, V: Version> {
    trail: Vec<Assignment<P, V>>,
    decision_level: DecisionLevel,
    cumulative: FxIndexMap<P, PackageAssignment<P, V>>,
}

impl<P: Package, V: Version> PartialSolution<P, V> {
    /// Initialize an empty partial solution.
    pub fn empty() -> Self {
        Self {
            trail: Vec::new(),
            decision_level: DecisionLevel(0),
            cumulative: FxIndexMap::default(),
        }
    }

    pub fn decision_level(&self) -> DecisionLevel {
        self.decision_level
    }

    /// Add a decision, opening a new decision level.
    pub fn decide(&mut self, package: P, version: V) {
        if cfg!(debug_assertions) {
            match self.cumulative.get(&package) {
                None => {}
                Some(pa) => {
                    assert!(
                        pa.decision.is_none(),
                        "{} already has a decision",
                        package
                    );
                    debug_assert!(
                        pa.term.relation(&Term::exact(package.clone(), version.clone()))
                            != Relation::Disjoint,
                        "{} @ {} is outside the cumulative term {}",
                        package,
                        version,
                        pa.term,
                    );
                }
            }
        }
        self.decision_level = self.decision_level.increment();
        let assignment = Assignment::Decision {
            package,
            version,
            decision_level: self.decision_level,
            index: self.trail.len(),
        };
        record(&mut self.cumulative, &assignment);
        self.trail.push(assignment);
    }

    /// Add a derivation at the current decision level.
    pub fn derive(&mut self, term: Term<P, V>, cause: IncompId<P, V>) {
        debug_assert!(
            self.cumulative
                .get(term.package())
                .map_or(true, |pa| pa.decision.is_none()),
            "derivation about {} after its decision",
            term.package(),
        );
        let assignment = Assignment::Derivation {
            term,
            decision_level: self.decision_level,
            index: self.trail.len(),
            cause,
        };
        record(&mut self.cumulative, &assignment);
        self.trail.push(assignment);
    }

    /// Intersection of all terms asserted about a package so far.
    pub fn term_intersection_for_package(&self, package: &P) -> Option<&Term<P, V>> {
        self.cumulative.get(package).map(|pa| &pa.term)
    }

    /// Relation between what is known about the term's package and the
    /// term itself. Knowing nothing is inconclusive.
    pub fn relation(&self, term: &Term<P, V>) -> Relation {
        match self.term_intersection_for_package(term.package()) {
            Some(cumulative) => cumulative.relation(term),
            None => Relation::Overlap,
        }
    }

    pub fn satisfies(&self, term: &Term<P, V>) -> bool {
        self.relation(term) == Relation::Subset
    }

    /// The earliest assignment after which `term` is satisfied, found by
    /// replaying the trail and intersecting every term about the package
    /// until the running conjunction becomes a subset of `term`.
    ///
    /// Panics if the trail never satisfies the term; callers only ask for
    /// satisfiers of terms the partial solution claims to satisfy, so this
    /// is an internal invariant violation.
    pub fn satisfier(&self, term: &Term<P, V>) -> &Assignment<P, V> {
        let mut accumulated: Option<Term<P, V>> = None;
        for assignment in &self.trail {
            if assignment.package() != term.package() {
                continue;
            }
            let running = match &accumulated {
                None => assignment.as_term(),
                Some(prev) => prev.intersection(&assignment.as_term()),
            };
            if running.satisfies(term) {
                return assignment;
            }
            accumulated = Some(running);
        }
        panic!(
            "no satisfier for {} in a trail of {} assignments, \
             of which {:?} concern its package",
            term,
            self.trail.len(),
            self.trail
                .iter()
                .filter(|a| a.package() == term.package())
                .map(|a| a.index())
                .collect::<Vec<_>>(),
        );
    }

    /// Truncate the trail to the last assignment at a decision level at or
    /// below the target, and recompute the cumulative view from what is
    /// left.
    pub fn backtrack(&mut self, decision_level: DecisionLevel) {
        let keep = self
            .trail
            .partition_point(|a| a.decision_level() <= decision_level);
        self.trail.truncate(keep);
        self.decision_level = decision_level;
        self.cumulative.clear();
        for assignment in &self.trail {
            record(&mut self.cumulative, assignment);
        }
    }

    /// Constraints of the packages that are positively required but have
    /// no decision yet. When this is empty, solving has succeeded.
    pub fn unsatisfied_constraints(&self) -> impl Iterator<Item = &VersionConstraint<P, V>> {
        self.cumulative.values().filter_map(|pa| {
            if pa.decision.is_none() && pa.term.is_positive() {
                Some(pa.term.constraint())
            } else {
                None
            }
        })
    }

    /// The versions decided so far, by package.
    pub fn decisions(&self) -> SelectedVersions<P, V> {
        self.cumulative
            .iter()
            .filter_map(|(p, pa)| pa.decision.clone().map(|v| (p.clone(), v)))
            .collect()
    }
}

/// Fold one assignment into the per-package cumulative view.
fn record<P: Package, V: Version>(
    cumulative: &mut FxIndexMap<P, PackageAssignment<P, V>>,
    assignment: &Assignment<P, V>,
) {
    let decision = match assignment {
        Assignment::Decision { version, .. } => Some(version.clone()),
        Assignment::Derivation { .. } => None,
    };
    match cumulative.entry(assignment.package().clone()) {
        indexmap::map::Entry::Occupied(mut occupied) => {
            let pa = occupied.get_mut();
            pa.term = pa.term.intersection(&assignment.as_term());
            if decision.is_some() {
                pa.decision = decision;
            }
        }
        indexmap::map::Entry::Vacant(vacant) => {
            vacant.insert(PackageAssignment {
                term: assignment.as_term(),
                decision,
            });
        }
    }
}

impl<P: Package, V: Version> fmt::Display for PartialSolution<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "decision level {}:", self.decision_level.0)?;
        for assignment in &self.trail {
            match assignment {
                Assignment::Decision {
                    package,
                    version,
                    decision_level,
                    ..
                } => writeln!(f, "  [{}] decide {} @ {}", decision_level.0, package, version)?,
                Assignment::Derivation {
                    term,
                    decision_level,
                    cause,
                    ..
                } => writeln!(f, "  [{}] derive {} (cause {:?})", decision_level.0, term, cause)?,
            }
        }
        Ok(())
    }
}

// TESTS #######################################################################
