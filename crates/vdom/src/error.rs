use std::fmt;

/// Failure while applying a patch plan or mounting a tree.
///
/// Reconciliation itself never fails; only host operations and, in strict
/// mode, unresolvable plan entries surface here.
#[derive(Debug)]
pub enum PatchError<E> {
    /// A host capability call failed.
    Host(E),
    /// Strict mode: no live host node exists at this pre-order index.
    UnresolvedIndex(usize),
    /// Strict mode: a reorder insertion named a key that was never removed.
    MissingKey(String),
}

impl<E> From<E> for PatchError<E> {
    fn from(err: E) -> Self {
        PatchError::Host(err)
    }
}

impl<E: fmt::Display> fmt::Display for PatchError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::Host(err) => write!(f, "host operation failed: {err}"),
            PatchError::UnresolvedIndex(index) => {
                write!(f, "no host node at pre-order index {index}")
            }
            PatchError::MissingKey(key) => write!(f, "reorder key {key:?} was not removed"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for PatchError<E> {}
