// SPDX-License-Identifier: MPL-2.0

//! Handling solver errors.

use thiserror::Error;

use crate::package::Package;
use crate::report::DerivationTree;
use crate::version::Version;

/// Errors that may occur while solving dependencies.
#[derive(Error, Debug)]
pub enum SolveError<P: Package, V: Version> {
    /// There is no solution for this set of dependencies.
    ///
    /// The derivation tree explains why: the terms of its root node are
    /// the failure incompatibility, and its leaves are the dependency
    /// facts the failure was derived from.
    #[error("{0}")]
    NoSolution(DerivationTree<P, V>),

    /// Something unexpected happened, like a source returning a version
    /// outside of the constraint it was asked about.
    #[error("{0}")]
    Failure(String),
}
