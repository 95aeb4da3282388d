/// Diff-time options.
#[derive(Clone, Copy, Debug)]
pub struct DiffConfig {
    /// Mirror plan warnings to the `log` facade. Warnings are always recorded
    /// on the plan regardless.
    pub log_warnings: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { log_warnings: true }
    }
}

/// Patch application options.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApplyConfig {
    /// Fail on indices that cannot be resolved to a host node and on reorder
    /// keys missing from the removal map, instead of skipping them.
    pub strict: bool,
}
