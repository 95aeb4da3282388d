//! Keyed virtual tree reconciliation.
//!
//! [`diff`] compares two immutable [`Node`] trees and returns a [`PatchPlan`]
//! addressed by pre-order index of the old tree. [`PatchPlan::apply_to`]
//! replays the plan on any host tree implementing [`HostOps`].
//! [`MountRegistry`] ties the two together per container.

pub mod apply;
pub mod attrs;
pub mod diff;
pub mod host;
pub mod mount;
pub mod node;
pub mod patch;
pub mod reorder;

mod config;
mod error;

pub use crate::apply::resolve_indices;
pub use crate::attrs::{AttrDelta, AttrDiff, AttrMap, AttrValue, OpaqueValue, diff_attributes};
pub use crate::config::{ApplyConfig, DiffConfig};
pub use crate::diff::{diff, diff_with_config};
pub use crate::error::PatchError;
pub use crate::host::{HostKind, HostOps, to_host};
pub use crate::mount::MountRegistry;
pub use crate::node::{Child, Element, ElementBuilder, Fragment, Node};
pub use crate::patch::{Insertion, Moves, Patch, PatchPlan, Removal, Warning};
pub use crate::reorder::{Reordered, reorder};
