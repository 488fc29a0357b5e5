//! Pass registry.
//!
//! The host pipeline addresses the passes by name, the same two names the
//! plugin registers: `lower-intrinsics` and `stabilize`.

use stabilizer_ir::Module;

use crate::{
    config::StabilizerConfig,
    diagnostics::Diagnostic,
    lower_intrinsics::{run_lower_intrinsics, LowerIntrinsicsReport},
    stabilize::{run_stabilize, StabilizeReport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassId {
    LowerIntrinsics,
    Stabilize,
}

impl PassId {
    pub const ALL: [PassId; 2] = [PassId::LowerIntrinsics, PassId::Stabilize];

    pub fn name(self) -> &'static str {
        match self {
            Self::LowerIntrinsics => "lower-intrinsics",
            Self::Stabilize => "stabilize",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pass| pass.name() == name)
    }
}

#[derive(Debug)]
pub enum PassReport {
    LowerIntrinsics(LowerIntrinsicsReport),
    Stabilize(StabilizeReport),
}

impl PassReport {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::LowerIntrinsics(report) => &report.diagnostics,
            Self::Stabilize(report) => &report.diagnostics,
        }
    }
}

/// Runs the pass registered under `name`, or returns `None` for an
/// unregistered name.
pub fn run_pass(name: &str, module: &mut Module, config: &StabilizerConfig) -> Option<PassReport> {
    let report = match PassId::from_name(name)? {
        PassId::LowerIntrinsics => PassReport::LowerIntrinsics(run_lower_intrinsics(module)),
        PassId::Stabilize => PassReport::Stabilize(run_stabilize(module, config)),
    };
    Some(report)
}

#[cfg(test)]
mod tests {
    use stabilizer_ir::builder::ModuleBuilder;
    use stabilizer_triple::TargetTriple;

    use super::*;

    #[test]
    fn passes_resolve_by_registered_name() {
        assert_eq!(
            PassId::from_name("lower-intrinsics"),
            Some(PassId::LowerIntrinsics)
        );
        assert_eq!(PassId::from_name("stabilize"), Some(PassId::Stabilize));
        assert_eq!(PassId::from_name("mem2reg"), None);
    }

    #[test]
    fn unregistered_name_runs_nothing() {
        let mut module = ModuleBuilder::new(TargetTriple::parse("x86_64-unknown-linux").unwrap())
            .build();
        let config = StabilizerConfig::default();

        assert!(run_pass("mem2reg", &mut module, &config).is_none());
        assert!(run_pass("stabilize", &mut module, &config).is_some());
    }
}
