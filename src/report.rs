// SPDX-License-Identifier: MPL-2.0

//! Build a report as clear as possible as to why version solving failed.

use std::fmt;
use std::ops::Deref;

use crate::constraint::VersionConstraint;
use crate::package::Package;
use crate::term::Term;
use crate::type_aliases::Map;
use crate::version::Version;

/// Reporter trait.
pub trait Reporter<P: Package, V: Version> {
    /// Output type of the report.
    type Output;

    /// Generate a report from the derivation tree
    /// describing the resolution failure.
    fn report(derivation_tree: &DerivationTree<P, V>) -> Self::Output;
}

/// Derivation tree resulting in the impossibility to solve the
/// dependencies of our root package. The terms of the root node are the
/// failure incompatibility itself; the leaves are the external facts it
/// was derived from.
#[derive(Debug, Clone)]
pub enum DerivationTree<P: Package, V: Version> {
    /// External incompatibility.
    External(External<P, V>),
    /// Incompatibility derived from two others.
    Derived(Derived<P, V>),
}

/// Incompatibilities that are not derived from others: they have their
/// own reason.
#[derive(Debug, Clone)]
pub enum External<P: Package, V: Version> {
    /// The initial goal of selecting a version of the root package.
    Root(P),
    /// A dependency declared by the source: the package at this version
    /// requires the constraint to be satisfied.
    Dependency(P, V, VersionConstraint<P, V>),
    /// The source offered no version matching the constraint.
    NoVersions(VersionConstraint<P, V>),
}

/// Incompatibility derived from two others during conflict resolution.
#[derive(Debug, Clone)]
pub struct Derived<P: Package, V: Version> {
    /// Terms of the incompatibility.
    pub terms: Vec<Term<P, V>>,
    /// Indicate if that incompatibility is present multiple times in the
    /// derivation tree. If that is the case, it has a unique id, provided
    /// in that option. Then, we may want to only explain it once, and
    /// refer to that explanation for the other times.
    pub shared_id: Option<usize>,
    /// First cause.
    pub cause1: Box<DerivationTree<P, V>>,
    /// Second cause.
    pub cause2: Box<DerivationTree<P, V>>,
}

impl<P: Package, V: Version> fmt::Display for External<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root(package) => {
                write!(f, "we are solving dependencies of {}", package)
            }
            Self::NoVersions(constraint) => {
                if constraint.is_any() {
                    write!(f, "there is no available version for {}", constraint.package())
                } else {
                    write!(
                        f,
                        "there is no version of {} in {}",
                        constraint.package(),
                        constraint.range()
                    )
                }
            }
            Self::Dependency(package, version, dependency) => {
                write!(
                    f,
                    "{} {} depends on {}",
                    package,
                    version,
                    display_constraint(dependency)
                )
            }
        }
    }
}

/// Renders the whole failure explanation, as produced by
/// [DefaultStringReporter].
impl<P: Package, V: Version> fmt::Display for DerivationTree<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", DefaultStringReporter::report(self))
    }
}

/// Default reporter able to generate an explanation as a [String].
pub struct DefaultStringReporter {
    /// Number of explanations already with a line reference.
    ref_count: usize,
    /// Shared nodes that have already been marked with a line reference.
    /// The incompatibility ids are the keys, and the line references are
    /// the values.
    shared_with_ref: Map<usize, usize>,
    /// Accumulated lines of the report already generated.
    lines: Vec<String>,
}

impl DefaultStringReporter {
    fn new() -> Self {
        Self {
            ref_count: 0,
            shared_with_ref: Map::default(),
            lines: Vec::new(),
        }
    }

    fn build_recursive<P: Package, V: Version>(&mut self, derived: &Derived<P, V>) {
        let conclusion = string_terms(&derived.terms);
        self.build_recursive_helper(derived, conclusion);
        if let Some(id) = derived.shared_id {
            if !self.shared_with_ref.contains_key(&id) {
                self.add_line_ref();
                self.shared_with_ref.insert(id, self.ref_count);
            }
        };
    }

    fn build_recursive_helper<P: Package, V: Version>(
        &mut self,
        current: &Derived<P, V>,
        conclusion: String,
    ) {
        match (current.cause1.deref(), current.cause2.deref()) {
            (DerivationTree::External(external1), DerivationTree::External(external2)) => {
                // Simplest case, we just combine two external incompatibilities.
                self.lines
                    .push(format!("Because {} and {}, {}.", external1, external2, conclusion));
            }
            (DerivationTree::Derived(derived), DerivationTree::External(external)) => {
                // One cause is derived, so we explain this first, then add
                // the one-line external part, and finally conclude with the
                // current incompatibility.
                self.report_one_each(derived, external, conclusion);
            }
            (DerivationTree::External(external), DerivationTree::Derived(derived)) => {
                self.report_one_each(derived, external, conclusion);
            }
            (DerivationTree::Derived(derived1), DerivationTree::Derived(derived2)) => {
                // This is the most complex case since both causes are
                // also derived.
                match (
                    self.line_ref_of(derived1.shared_id),
                    self.line_ref_of(derived2.shared_id),
                ) {
                    // If both causes already have been referenced, the
                    // explanation simply uses those references.
                    (Some(ref1), Some(ref2)) => self.lines.push(format!(
                        "Because {} ({}) and {} ({}), {}.",
                        string_terms(&derived1.terms),
                        ref1,
                        string_terms(&derived2.terms),
                        ref2,
                        conclusion,
                    )),
                    // Otherwise, if one only has a line number reference,
                    // we recursively call the one without reference and
                    // then add the one with reference to conclude.
                    (Some(ref1), None) => {
                        self.build_recursive(derived2);
                        self.lines.push(format!(
                            "And because {} ({}), {}.",
                            string_terms(&derived1.terms),
                            ref1,
                            conclusion,
                        ));
                    }
                    (None, Some(ref2)) => {
                        self.build_recursive(derived1);
                        self.lines.push(format!(
                            "And because {} ({}), {}.",
                            string_terms(&derived2.terms),
                            ref2,
                            conclusion,
                        ));
                    }
                    // Finally, if no line reference exists yet, we
                    // recursively call the first one and then,
                    //   - if this was a shared node, it got a line ref and
                    //     we can simply recall this with the current node,
                    //   - otherwise, we add a line reference to it,
                    //     recursively call on the second node, and
                    //     finally conclude.
                    (None, None) => {
                        self.build_recursive(derived1);
                        if derived1.shared_id.is_some() {
                            self.lines.push("".into());
                            self.build_recursive_helper(current, conclusion);
                        } else {
                            self.add_line_ref();
                            let ref1 = self.ref_count;
                            self.lines.push("".into());
                            self.build_recursive(derived2);
                            self.lines.push(format!(
                                "And because {} ({}), {}.",
                                string_terms(&derived1.terms),
                                ref1,
                                conclusion,
                            ));
                        }
                    }
                }
            }
        }
    }

    /// Report a derived and an external incompatibility.
    ///
    /// The result will depend on the fact that the derived incompatibility
    /// has already been explained or not.
    fn report_one_each<P: Package, V: Version>(
        &mut self,
        derived: &Derived<P, V>,
        external: &External<P, V>,
        conclusion: String,
    ) {
        match self.line_ref_of(derived.shared_id) {
            Some(ref_id) => self.lines.push(format!(
                "Because {} ({}) and {}, {}.",
                string_terms(&derived.terms),
                ref_id,
                external,
                conclusion,
            )),
            None => self.report_recurse_one_each(derived, external, conclusion),
        }
    }

    /// Report one derived (without a line ref yet) and one external.
    fn report_recurse_one_each<P: Package, V: Version>(
        &mut self,
        derived: &Derived<P, V>,
        external: &External<P, V>,
        conclusion: String,
    ) {
        match (derived.cause1.deref(), derived.cause2.deref()) {
            // If the derived cause has itself one external prior cause,
            // we can chain the external explanations.
            (DerivationTree::Derived(prior_derived), DerivationTree::External(prior_external)) => {
                self.build_recursive(prior_derived);
                self.lines.push(format!(
                    "And because {} and {}, {}.",
                    prior_external, external, conclusion,
                ));
            }
            (DerivationTree::External(prior_external), DerivationTree::Derived(prior_derived)) => {
                self.build_recursive(prior_derived);
                self.lines.push(format!(
                    "And because {} and {}, {}.",
                    prior_external, external, conclusion,
                ));
            }
            _ => {
                self.build_recursive(derived);
                self.lines
                    .push(format!("And because {}, {}.", external, conclusion));
            }
        }
    }

    // Helper functions ########################################################

    fn add_line_ref(&mut self) {
        let new_count = self.ref_count + 1;
        self.ref_count = new_count;
        if let Some(line) = self.lines.last_mut() {
            *line = format!("{} ({})", line, new_count);
        }
    }

    fn line_ref_of(&self, shared_id: Option<usize>) -> Option<usize> {
        shared_id.and_then(|id| self.shared_with_ref.get(&id).cloned())
    }
}

impl<P: Package, V: Version> Reporter<P, V> for DefaultStringReporter {
    type Output = String;

    fn report(derivation_tree: &DerivationTree<P, V>) -> Self::Output {
        match derivation_tree {
            DerivationTree::External(external) => {
                format!("Because {}, version solving failed.", external)
            }
            DerivationTree::Derived(derived) => {
                let mut reporter = Self::new();
                reporter.build_recursive_helper(derived, "version solving failed".into());
                reporter.lines.join("\n")
            }
        }
    }
}

/// Render the terms of an incompatibility as a statement of what they
/// forbid together.
fn string_terms<P: Package, V: Version>(terms: &[Term<P, V>]) -> String {
    match terms {
        [] => "version solving failed".into(),
        [term] if term.is_positive() => {
            format!("{} is forbidden", display_constraint(term.constraint()))
        }
        [term] => format!("{} is mandatory", display_constraint(term.constraint())),
        [t1, t2] if t1.is_positive() && !t2.is_positive() => format!(
            "{} depends on {}",
            display_constraint(t1.constraint()),
            display_constraint(t2.constraint()),
        ),
        [t1, t2] if !t1.is_positive() && t2.is_positive() => format!(
            "{} depends on {}",
            display_constraint(t2.constraint()),
            display_constraint(t1.constraint()),
        ),
        slice => {
            let str_terms: Vec<_> = slice.iter().map(|t| t.to_string()).collect();
            str_terms.join(", ") + " are incompatible"
        }
    }
}

/// A constraint allowing every version reads better as the bare package.
fn display_constraint<P: Package, V: Version>(constraint: &VersionConstraint<P, V>) -> String {
    if constraint.is_any() {
        constraint.package().to_string()
    } else {
        constraint.to_string()
    }
}
