// SPDX-License-Identifier: MPL-2.0

//! Core state and functions of the solving algorithm:
//! unit propagation, conflict resolution and backjumping.

use crate::incompatibility::{Cause, IncompId, Incompatibility, Relation};
use crate::internal::arena::Arena;
use crate::internal::partial_solution::{DecisionLevel, PartialSolution};
use crate::package::Package;
use crate::report::{DerivationTree, Derived, External};
use crate::type_aliases::{Map, Set};
use crate::version::Version;

/// Current state of the solving algorithm.
pub struct State<P: Package, V: Version> {
    root_package: P,

    /// Ids of the incompatibilities touching each package.
    incompatibilities: Map<P, Vec<IncompId<P, V>>>,

    /// Ids of incompatibilities that are already contradicted, with the
    /// decision level at which that was observed. They stay contradicted
    /// until we backtrack past that level.
    contradicted_incompatibilities: Map<IncompId<P, V>, DecisionLevel>,

    pub partial_solution: PartialSolution<P, V>,

    /// The reference storage for all incompatibilities.
    pub incompatibility_store: Arena<Incompatibility<P, V>>,

    /// Stack of packages whose cumulative term changed, to be revisited by
    /// `unit_propagation`. Kept here to reuse the allocation.
    unit_propagation_buffer: Vec<P>,
}

impl<P: Package, V: Version> State<P, V> {
    /// Seed the state with the incompatibility stating that the root
    /// package must not be left unresolved.
    pub fn init(root_package: P) -> Self {
        let mut incompatibility_store = Arena::new();
        let not_root_id = incompatibility_store.alloc(Incompatibility::not_root(root_package.clone()));
        let mut incompatibilities = Map::default();
        incompatibilities.insert(root_package.clone(), vec![not_root_id]);
        Self {
            root_package,
            incompatibilities,
            contradicted_incompatibilities: Map::default(),
            partial_solution: PartialSolution::empty(),
            incompatibility_store,
            unit_propagation_buffer: Vec::new(),
        }
    }

    pub fn root_package(&self) -> &P {
        &self.root_package
    }

    /// Add an incompatibility to the store and index it by package.
    pub fn add_incompatibility(&mut self, incompat: Incompatibility<P, V>) {
        let id = self.incompatibility_store.alloc(incompat);
        self.index_incompatibility(id);
    }

    fn index_incompatibility(&mut self, id: IncompId<P, V>) {
        for term in self.incompatibility_store[id].terms() {
            debug_assert!(!term.is_always_true());
            self.incompatibilities
                .entry(term.package().clone())
                .or_default()
                .push(id);
        }
    }

    /// Unit propagation is the core mechanism of the solving algorithm.
    ///
    /// Examines every incompatibility touching the packages on the
    /// worklist; an almost-satisfied incompatibility forces the negation
    /// of its remaining term, and a fully satisfied one triggers conflict
    /// resolution. Returns the terminal incompatibility id if the conflict
    /// proves there is no solution.
    pub fn unit_propagation(&mut self, package: P) -> Result<(), IncompId<P, V>> {
        self.unit_propagation_buffer.clear();
        self.unit_propagation_buffer.push(package);
        while let Some(current_package) = self.unit_propagation_buffer.pop() {
            let mut conflict_id = None;
            // Iterate in reverse order to evaluate the newest
            // incompatibilities first.
            let indexed = match self.incompatibilities.get(&current_package) {
                Some(ids) => ids.as_slice(),
                None => &[],
            };
            for &incompat_id in indexed.iter().rev() {
                if self.contradicted_incompatibilities.contains_key(&incompat_id) {
                    continue;
                }
                let current_incompat = &self.incompatibility_store[incompat_id];
                let relation = current_incompat.relation(|p| {
                    self.partial_solution
                        .term_intersection_for_package(p)
                        .cloned()
                });
                match relation {
                    Relation::Satisfied => {
                        log::info!(
                            "start conflict resolution: incompatibility satisfied: {}",
                            current_incompat
                        );
                        conflict_id = Some(incompat_id);
                        break;
                    }
                    Relation::AlmostSatisfied(package_almost) => {
                        // A linear scan is cheaper than hashing here, the
                        // buffer stays small.
                        if !self.unit_propagation_buffer.contains(&package_almost) {
                            self.unit_propagation_buffer.push(package_almost.clone());
                        }
                        let forced = self.incompatibility_store[incompat_id]
                            .get(&package_almost)
                            .expect("the almost-satisfied term is in the incompatibility")
                            .negate();
                        self.partial_solution.derive(forced, incompat_id);
                        // With the derivation added, the incompatibility is
                        // now contradicted.
                        self.contradicted_incompatibilities
                            .insert(incompat_id, self.partial_solution.decision_level());
                    }
                    Relation::Contradicted(_) => {
                        self.contradicted_incompatibilities
                            .insert(incompat_id, self.partial_solution.decision_level());
                    }
                    Relation::Inconclusive => {}
                }
            }
            if let Some(incompat_id) = conflict_id {
                let (package_almost, root_cause) = self.conflict_resolution(incompat_id)?;
                // Propagation restarts from the learned incompatibility.
                self.unit_propagation_buffer.clear();
                self.unit_propagation_buffer.push(package_almost.clone());
                let forced = self.incompatibility_store[root_cause]
                    .get(&package_almost)
                    .expect("the conflict package is in the learned incompatibility")
                    .negate();
                self.partial_solution.derive(forced, root_cause);
                self.contradicted_incompatibilities
                    .insert(root_cause, self.partial_solution.decision_level());
            }
        }
        Ok(())
    }

    /// Repeatedly resolve the conflicting incompatibility against the
    /// cause of the assignment that last satisfied it, until a clause is
    /// reached that allows a backjump. Returns the package to propagate
    /// next together with the learned clause, or the terminal
    /// incompatibility if solving failed entirely.
    fn conflict_resolution(
        &mut self,
        incompatibility: IncompId<P, V>,
    ) -> Result<(P, IncompId<P, V>), IncompId<P, V>> {
        let mut current_id = incompatibility;
        let mut current_changed = false;
        loop {
            if self.incompatibility_store[current_id].is_failure(&self.root_package) {
                return Err(current_id);
            }

            // Among the assignments that first satisfied each term, find
            // the latest one; the highest decision level of the others is
            // the backjump candidate, floored at level 1 so intermediate
            // conflicts keep the root decision on the trail.
            let mut current_term = None;
            let mut current_satisfier: Option<&crate::internal::partial_solution::Assignment<P, V>> = None;
            let mut previous_level = DecisionLevel(1);
            for term in self.incompatibility_store[current_id].terms() {
                let assignment = self.partial_solution.satisfier(term);
                match current_satisfier {
                    Some(best) if assignment.index() <= best.index() => {
                        previous_level = previous_level.max(assignment.decision_level());
                    }
                    _ => {
                        if let Some(best) = current_satisfier {
                            previous_level = previous_level.max(best.decision_level());
                        }
                        current_term = Some(term);
                        current_satisfier = Some(assignment);
                    }
                }
            }
            let current_term = current_term
                .expect("a non-terminal incompatibility has at least one term")
                .clone();
            let satisfier = current_satisfier.expect("every term has a satisfier");
            let satisfier_level = satisfier.decision_level();
            let satisfier_cause = satisfier.cause();
            let satisfier_term = satisfier.as_term();

            // The backjump target always lands below the satisfier, so a
            // conflict whose satisfier is the level 1 decision undoes it
            // by backtracking to level 0.
            let target_level =
                previous_level.min(DecisionLevel(satisfier_level.0.saturating_sub(1)));
            match satisfier_cause {
                // A decision, or a satisfier above every other satisfier:
                // backjump, then let propagation derive from the clause.
                None => {
                    self.backjump(current_id, current_changed, target_level);
                    return Ok((current_term.package().clone(), current_id));
                }
                Some(_) if previous_level < satisfier_level => {
                    self.backjump(current_id, current_changed, target_level);
                    return Ok((current_term.package().clone(), current_id));
                }
                Some(cause_id) => {
                    let prior = Incompatibility::prior_cause(
                        current_id,
                        cause_id,
                        &current_term,
                        &satisfier_term,
                        &self.incompatibility_store,
                    );
                    log::info!("prior cause: {}", prior);
                    current_id = self.incompatibility_store.alloc(prior);
                    current_changed = true;
                }
            }
        }
    }

    fn backjump(
        &mut self,
        incompat: IncompId<P, V>,
        incompat_changed: bool,
        decision_level: DecisionLevel,
    ) {
        log::info!("backtrack to decision level {}", decision_level.0);
        self.partial_solution.backtrack(decision_level);
        // Contradictions observed above the backtrack target no longer hold.
        self.contradicted_incompatibilities
            .retain(|_, level| *level <= decision_level);
        if incompat_changed {
            self.index_incompatibility(incompat);
        }
    }

    // Error reporting #########################################################

    /// Externalise the cause DAG of a terminal incompatibility as a
    /// self-contained tree, so the failure can be explained without access
    /// to the solver's store.
    pub fn build_derivation_tree(&self, incompat: IncompId<P, V>) -> DerivationTree<P, V> {
        let mut all_ids: Set<IncompId<P, V>> = Set::default();
        let mut shared_ids = Set::default();
        let mut stack = vec![incompat];
        while let Some(id) = stack.pop() {
            if let Some((id1, id2)) = self.incompatibility_store[id].causes() {
                if all_ids.contains(&id) {
                    shared_ids.insert(id);
                } else {
                    stack.push(id1);
                    stack.push(id2);
                }
            }
            all_ids.insert(id);
        }
        // Building in increasing id order guarantees causes are available
        // before the incompatibilities they derived.
        let mut sorted_ids: Vec<_> = all_ids.into_iter().collect();
        sorted_ids.sort_unstable_by_key(|id| id.into_raw());
        let mut precomputed: Map<IncompId<P, V>, DerivationTree<P, V>> = Map::default();
        for id in sorted_ids {
            let node = self.derivation_node(id, &shared_ids, &precomputed);
            precomputed.insert(id, node);
        }
        precomputed
            .remove(&incompat)
            .expect("the terminal incompatibility is part of its own DAG")
    }

    fn derivation_node(
        &self,
        id: IncompId<P, V>,
        shared_ids: &Set<IncompId<P, V>>,
        precomputed: &Map<IncompId<P, V>, DerivationTree<P, V>>,
    ) -> DerivationTree<P, V> {
        let incompat = &self.incompatibility_store[id];
        match incompat.cause() {
            Cause::Conflict(id1, id2) => {
                let cause = |cause_id: &IncompId<P, V>| {
                    precomputed
                        .get(cause_id)
                        .cloned()
                        .expect("causes are built before their dependents")
                };
                DerivationTree::Derived(Derived {
                    terms: incompat.terms().to_vec(),
                    shared_id: shared_ids.contains(&id).then(|| id.into_raw()),
                    cause1: Box::new(cause(id1)),
                    cause2: Box::new(cause(id2)),
                })
            }
            Cause::Root(package) => DerivationTree::External(External::Root(package.clone())),
            Cause::Dependency(package, version, dependency) => DerivationTree::External(
                External::Dependency(package.clone(), version.clone(), dependency.clone()),
            ),
            Cause::NoVersions(constraint) => {
                DerivationTree::External(External::NoVersions(constraint.clone()))
            }
        }
    }
}
