//! Configuration for the statement transform pipeline.

/// Switches and limits for the statement transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompilerSettings {
    /// Rewrite interpolated string handler patterns into interpolated string
    /// blocks (default: true).
    pub string_interpolation: bool,

    /// How often the transforms may be re-run at one statement position
    /// after a change before the driver moves on (default: 16).
    pub max_iterations_per_position: usize,
}

impl Default for DecompilerSettings {
    fn default() -> Self {
        Self {
            string_interpolation: true,
            max_iterations_per_position: 16,
        }
    }
}

impl DecompilerSettings {
    /// Creates settings with all transforms enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the interpolated string transform.
    #[must_use]
    pub fn with_string_interpolation(mut self, enabled: bool) -> Self {
        self.string_interpolation = enabled;
        self
    }

    /// Sets the per-position re-run limit.
    #[must_use]
    pub fn with_max_iterations_per_position(mut self, limit: usize) -> Self {
        self.max_iterations_per_position = limit;
        self
    }
}
