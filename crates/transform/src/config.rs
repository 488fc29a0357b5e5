/// Randomization configuration options.
///
/// Every dimension defaults to off; any subset is legal. With all three
/// disabled the `stabilize` pass still synthesizes the module constructor
/// and renames `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StabilizerConfig {
    /// Randomize heap object placement.
    pub heap: bool,

    /// Randomize stack frame placement.
    pub stack: bool,

    /// Randomize function placement.
    pub code: bool,
}

impl StabilizerConfig {
    pub const fn all() -> Self {
        Self {
            heap: true,
            stack: true,
            code: true,
        }
    }

    pub const fn code_only() -> Self {
        Self {
            heap: false,
            stack: false,
            code: true,
        }
    }
}
