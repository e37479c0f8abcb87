// SPDX-License-Identifier: MPL-2.0

//! Conflict-driven version solving for package dependency resolution.
//!
//! Version solving consists in finding a set of packages and versions
//! that satisfy all the constraints of a given project dependencies. This
//! crate implements the PubGrub algorithm: unit propagation over learned
//! incompatibilities, with conflict-driven clause learning and
//! backjumping. When no solution exists, the solver explains precisely
//! which constraints conflict.
//!
//! # Packages, versions and sources
//!
//! The algorithm is generic. Package identifiers need to implement the
//! [Package] trait, which is automatic for any type implementing
//! [Clone] + [Eq] + [Hash](std::hash::Hash) + [Debug](std::fmt::Debug) +
//! [Display](std::fmt::Display), so things like [String] work out of the
//! box. Versions are opaque to the solver and only need the [Version]
//! trait, automatic for [Clone] + [Ord] + [Debug](std::fmt::Debug) +
//! [Display](std::fmt::Display).
//!
//! Package metadata is supplied through the [Source] trait: which
//! versions exist for a constraint, and which incompatibilities a chosen
//! version induces. Everything else (manifests, fetching, caching) stays
//! on the embedder's side of that trait.
//!
//! # Basic example
//!
//! Let's imagine we are building a user interface with a menu containing
//! dropdowns with some icons, icons we are also directly using in other
//! parts of the interface. The complete set of dependencies:
//!
//! - `root` depends on `menu` and `icons`
//! - `menu` depends on `dropdown`
//! - `dropdown` depends on `icons`
//! - `icons` has no dependency
//!
//! We can model that scenario with this library as follows
//! ```
//! # use version_solver::{resolve, OfflineSource, VersionRange};
//! let mut source = OfflineSource::<&str, u32>::new("root");
//!
//! source.add_dependencies(
//!     "root",
//!     1u32,
//!     [("menu", VersionRange::any()), ("icons", VersionRange::any())],
//! );
//! source.add_dependencies("menu", 1u32, [("dropdown", VersionRange::any())]);
//! source.add_dependencies("dropdown", 1u32, [("icons", VersionRange::any())]);
//! source.add_dependencies("icons", 1u32, []);
//!
//! let solution = resolve(&source).unwrap();
//! assert_eq!(solution.get("menu"), Some(&1));
//! assert_eq!(solution.get("dropdown"), Some(&1));
//! ```
//!
//! # Solution and failure reporting
//!
//! On success the solver returns one version per (non-root) package
//! reached from the root requirements, as a
//! [SelectedVersions<P, V>](SelectedVersions) map. When the constraints
//! cannot all hold, [resolve] returns
//! [SolveError::NoSolution](SolveError::NoSolution) carrying a
//! [DerivationTree]: the full chain of reasons why there is no solution,
//! rooted at the failure incompatibility. The [DefaultStringReporter]
//! renders it as text:
//!
//! ```
//! # use version_solver::{resolve, DefaultStringReporter, OfflineSource, Reporter, SolveError, VersionRange};
//! # let mut source = OfflineSource::<&str, u32>::new("root");
//! # source.add_dependencies(
//! #     "root",
//! #     1u32,
//! #     [("foo", VersionRange::higher_than(2u32)), ("bar", VersionRange::any())],
//! # );
//! # source.add_dependencies("bar", 1u32, [("foo", VersionRange::strictly_lower_than(2u32))]);
//! # source.add_dependencies("foo", 1u32, []);
//! # source.add_dependencies("foo", 2u32, []);
//! match resolve(&source) {
//!     Ok(solution) => println!("{:?}", solution),
//!     Err(SolveError::NoSolution(tree)) => {
//!         eprintln!("{}", DefaultStringReporter::report(&tree));
//!     }
//!     Err(err) => panic!("{:?}", err),
//! };
//! ```

mod constraint;
mod error;
mod incompatibility;
mod package;
mod range;
mod report;
mod solver;
mod term;
mod type_aliases;
mod version;

pub use constraint::VersionConstraint;
pub use error::SolveError;
pub use incompatibility::Incompatibility;
pub use package::Package;
pub use range::{Interval, ParseRangeError, VersionRange};
pub use report::{DefaultStringReporter, DerivationTree, Derived, External, Reporter};
pub use solver::{resolve, OfflineSource, Source, VersionSolver};
pub use term::{Relation, Term};
pub use type_aliases::{DependencyConstraints, Map, SelectedVersions, Set};
pub use version::Version;

mod internal;
