// SPDX-License-Identifier: MPL-2.0

//! Trait for ordering versions.

use std::fmt::{Debug, Display};

/// Trait for the version type supplied by the embedder.
///
/// The solver never looks inside a version; it only compares them.
/// Automatically implemented for types already implementing
/// [Clone] + [Ord] + [Debug] + [Display](std::fmt::Display),
/// so things like `u32` or `semver::Version` work out of the box.
pub trait Version: Clone + Ord + Debug + Display {}

impl<T: Clone + Ord + Debug + Display> Version for T {}
