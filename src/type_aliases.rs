// SPDX-License-Identifier: MPL-2.0

//! Publicly exported type aliases.

/// Map implementation used by the library.
pub type Map<K, V> = rustc_hash::FxHashMap<K, V>;

/// Set implementation used by the library.
pub type Set<V> = rustc_hash::FxHashSet<V>;

/// Versions chosen by the solver for each package reached,
/// as returned by [solve](crate::VersionSolver::solve).
pub type SelectedVersions<P, V> = Map<P, V>;

/// Ranges accepted for each dependency of a given package version.
///
/// An empty map means the package version has no dependency, and that is
/// a known fact, contrary to a version the source knows nothing about.
pub type DependencyConstraints<P, V> = Map<P, crate::range::VersionRange<V>>;
