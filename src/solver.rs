// SPDX-License-Identifier: MPL-2.0

//! Version solving consists in efficiently finding a set of packages and
//! versions that satisfy all the constraints of a given project
//! dependencies. In addition, when that is not possible, we should try to
//! provide a very human-readable and clear explanation as to why that
//! failed.
//!
//! The algorithm is generic over the package and version types through
//! the [Package] and [Version] traits, and over the package metadata
//! through the [Source] trait. The call to [solve](VersionSolver::solve)
//! computes the set of packages and versions needed to satisfy the
//! dependencies of the source's root package. If there is no solution,
//! the reason is provided as clear as possible.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::BuildHasherDefault;

use log::{debug, info};
use priority_queue::PriorityQueue;
use rustc_hash::FxHasher;

use crate::constraint::VersionConstraint;
use crate::error::SolveError;
use crate::incompatibility::Incompatibility;
use crate::internal::core::State;
use crate::package::Package;
use crate::range::VersionRange;
use crate::term::Term;
use crate::type_aliases::{DependencyConstraints, Map, SelectedVersions};
use crate::version::Version;

/// Trait that allows the algorithm to retrieve available packages and
/// their dependencies. An implementor needs to be supplied to
/// [VersionSolver] or [resolve].
///
/// The source is treated as a pure function for the duration of a solve:
/// two calls with the same arguments must return the same answers.
pub trait Source {
    /// How this source names packages.
    type P: Package;

    /// How this source orders versions.
    type V: Version;

    /// The type returned from [prioritize](Self::prioritize). The solver
    /// does not care what type this is as long as it can pick a largest
    /// one and clone it.
    ///
    /// [Reverse] can be useful if you want to pick the package with the
    /// fewest versions that match the outstanding constraint.
    type Priority: Ord + Clone;

    /// The synthetic package representing the top-level requirement.
    fn root(&self) -> Self::P;

    /// The candidate versions allowed by the constraint, preferred
    /// versions first. The solver decides on the first one.
    fn versions_for(&self, constraint: &VersionConstraint<Self::P, Self::V>) -> Vec<Self::V>;

    /// The incompatibilities induced by selecting the given package
    /// version: one [dependency](Incompatibility::from_dependency) entry
    /// per dependency it declares, plus any additional constraint the
    /// source wants to impose.
    fn incompatibilities_for(
        &self,
        package: &Self::P,
        version: &Self::V,
    ) -> Vec<Incompatibility<Self::P, Self::V>>;

    /// Decision making is the process of choosing the next package to add
    /// to the partial solution. Every time such a decision must be made,
    /// the solver looks at all currently unsatisfied package constraints
    /// and asks the source how important each one is; the highest
    /// priority is decided first.
    ///
    /// The strategy employed cannot change whether a solution exists, but
    /// it can drastically change solving performance. Picking the package
    /// with the fewest matching versions tends to find conflicts earlier.
    fn prioritize(&self, constraint: &VersionConstraint<Self::P, Self::V>) -> Self::Priority;
}

impl<S: Source> Source for &S {
    type P = S::P;
    type V = S::V;
    type Priority = S::Priority;

    fn root(&self) -> Self::P {
        (**self).root()
    }

    fn versions_for(&self, constraint: &VersionConstraint<Self::P, Self::V>) -> Vec<Self::V> {
        (**self).versions_for(constraint)
    }

    fn incompatibilities_for(
        &self,
        package: &Self::P,
        version: &Self::V,
    ) -> Vec<Incompatibility<Self::P, Self::V>> {
        (**self).incompatibilities_for(package, version)
    }

    fn prioritize(&self, constraint: &VersionConstraint<Self::P, Self::V>) -> Self::Priority {
        (**self).prioritize(constraint)
    }
}

/// Main function of the library: finds a set of versions satisfying the
/// dependency bounds reachable from the source's root package.
pub fn resolve<S: Source>(
    source: S,
) -> Result<SelectedVersions<S::P, S::V>, SolveError<S::P, S::V>> {
    VersionSolver::new(source).solve()
}

/// The solver: alternates unit propagation and decision making until the
/// partial solution covers the root goal, or a conflict proves it never
/// will.
///
/// A solver holds no state worth keeping between solves; build one, call
/// [solve](Self::solve), drop it.
pub struct VersionSolver<S: Source> {
    source: S,
    state: State<S::P, S::V>,
    /// (package, version) pairs whose dependency incompatibilities are
    /// already in the store, so a re-decision after backtracking does not
    /// add them twice.
    added_dependencies: Map<S::P, BTreeSet<S::V>>,
}

impl<S: Source> VersionSolver<S> {
    pub fn new(source: S) -> Self {
        let root = source.root();
        Self {
            source,
            state: State::init(root),
            added_dependencies: Map::default(),
        }
    }

    /// Run the solving loop to completion.
    ///
    /// On success the returned map holds exactly one version per non-root
    /// package reached from the root requirements.
    pub fn solve(&mut self) -> Result<SelectedVersions<S::P, S::V>, SolveError<S::P, S::V>> {
        let mut next = self.state.root_package().clone();
        loop {
            info!("unit propagation: {}", next);
            self.state
                .unit_propagation(next)
                .map_err(|terminal| SolveError::NoSolution(self.state.build_derivation_tree(terminal)))?;

            debug!(
                "partial solution after propagation:\n{}",
                self.state.partial_solution
            );

            let Some(constraint) = self.choose_package() else {
                // No unsatisfied package left: success.
                let mut decisions = self.state.partial_solution.decisions();
                decisions.remove(self.state.root_package());
                return Ok(decisions);
            };

            let package = constraint.package().clone();
            let mut candidates = self.source.versions_for(&constraint).into_iter();
            let Some(version) = candidates.next() else {
                // No candidate at all: reject the whole constraint and let
                // propagation backjump out of the dead end.
                info!("no versions of {}", constraint);
                self.state
                    .add_incompatibility(Incompatibility::no_versions(Term::positive(constraint)));
                next = package;
                continue;
            };
            if !constraint.contains(&version) {
                return Err(SolveError::Failure(format!(
                    "the source offered {} @ {}, outside of the constraint {}",
                    package, version, constraint,
                )));
            }

            let newly_added = self
                .added_dependencies
                .entry(package.clone())
                .or_default()
                .insert(version.clone());
            if newly_added {
                for incompat in self.source.incompatibilities_for(&package, &version) {
                    self.state.add_incompatibility(incompat);
                }
            }

            info!("decide: {} @ {}", package, version);
            self.state.partial_solution.decide(package.clone(), version);
            next = package;
        }
    }

    /// Pick the unsatisfied package constraint with the highest priority
    /// according to the source, or `None` when everything is satisfied.
    fn choose_package(&mut self) -> Option<VersionConstraint<S::P, S::V>> {
        let mut prioritized: PriorityQueue<S::P, S::Priority, BuildHasherDefault<FxHasher>> =
            PriorityQueue::default();
        for constraint in self.state.partial_solution.unsatisfied_constraints() {
            prioritized.push(constraint.package().clone(), self.source.prioritize(constraint));
        }
        let (package, _) = prioritized.pop()?;
        let term = self
            .state
            .partial_solution
            .term_intersection_for_package(&package)
            .expect("an unsatisfied package has a cumulative term");
        Some(term.constraint().clone())
    }
}

/// A basic implementation of [Source], holding all the dependency
/// information in memory.
///
/// Packages are prioritized by fewest matching versions first, and
/// versions are offered newest first.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "P: serde::Serialize, V: serde::Serialize",
        deserialize = "P: serde::Deserialize<'de>, V: serde::Deserialize<'de>"
    ))
)]
pub struct OfflineSource<P: Package, V: Version> {
    root: P,
    dependencies: Map<P, BTreeMap<V, DependencyConstraints<P, V>>>,
}

impl<P: Package, V: Version> OfflineSource<P, V> {
    /// Creates an empty source with the given root package.
    pub fn new(root: P) -> Self {
        Self {
            root,
            dependencies: Map::default(),
        }
    }

    /// Registers the dependencies of a package and version pair. All
    /// dependencies of that pair must be given in a single call; a
    /// subsequent call for the same pair replaces them.
    pub fn add_dependencies<I: IntoIterator<Item = (P, VersionRange<V>)>>(
        &mut self,
        package: P,
        version: impl Into<V>,
        dependencies: I,
    ) {
        let deps = dependencies.into_iter().collect();
        *self
            .dependencies
            .entry(package)
            .or_default()
            .entry(version.into())
            .or_default() = deps;
    }

    /// Lists the packages that have been saved.
    pub fn packages(&self) -> impl Iterator<Item = &P> {
        self.dependencies.keys()
    }

    /// Lists the known versions of a package, in ascending order.
    /// Returns [None] if no information is available about that package.
    pub fn versions(&self, package: &P) -> Option<impl Iterator<Item = &V>> {
        self.dependencies.get(package).map(|versions| versions.keys())
    }
}

impl<P: Package, V: Version> Source for OfflineSource<P, V> {
    type P = P;
    type V = V;
    type Priority = Reverse<usize>;

    fn root(&self) -> P {
        self.root.clone()
    }

    fn versions_for(&self, constraint: &VersionConstraint<P, V>) -> Vec<V> {
        self.dependencies
            .get(constraint.package())
            .map(|versions| {
                versions
                    .keys()
                    .rev()
                    .filter(|v| constraint.contains(v))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn incompatibilities_for(&self, package: &P, version: &V) -> Vec<Incompatibility<P, V>> {
        self.dependencies
            .get(package)
            .and_then(|versions| versions.get(version))
            .map(|deps| {
                deps.iter()
                    .map(|(dep_package, dep_range)| {
                        Incompatibility::from_dependency(
                            package.clone(),
                            version.clone(),
                            (dep_package.clone(), dep_range.clone()),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn prioritize(&self, constraint: &VersionConstraint<P, V>) -> Self::Priority {
        Reverse(
            self.dependencies
                .get(constraint.package())
                .map(|versions| versions.keys().filter(|v| constraint.contains(v)).count())
                .unwrap_or(0),
        )
    }
}
