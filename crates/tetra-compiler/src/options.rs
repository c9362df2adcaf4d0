//! Compiler configuration.

/// Limits applied while compiling one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Stop recording diagnostics after this many; later ones are counted only.
    pub max_diagnostics: usize,
    /// Upper bound on simultaneously live locals in one function.
    pub max_locals: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_diagnostics: 100,
            max_locals: u16::MAX as u32,
        }
    }
}

impl CompileOptions {
    pub fn with_max_diagnostics(mut self, max: usize) -> Self {
        self.max_diagnostics = max;
        self
    }

    pub fn with_max_locals(mut self, max: u32) -> Self {
        self.max_locals = max.min(u16::MAX as u32);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_locals_is_capped_by_slot_width() {
        let options = CompileOptions::default().with_max_locals(1_000_000);
        assert_eq!(options.max_locals, u16::MAX as u32);
    }
}
