//! Intrinsic lowering.
//!
//! Every intrinsic that is not on the always-inline list is redirected to
//! an ordinary external declaration with the mapped libcall name and the
//! intrinsic's signature. Converting them to plain calls locks their ABI
//! before randomization; left as intrinsics, they could expand during code
//! generation into sequences with constant-pool references the randomizer
//! never saw.

use stabilizer_ir::{Linkage, Module};
use tracing::{debug, warn};

use crate::{
    diagnostics::{Diagnostic, Location},
    libcalls::{is_always_inlined, libcall_for},
};

#[derive(Debug, Default)]
pub struct LowerIntrinsicsReport {
    /// Intrinsics deleted after their uses were redirected.
    pub lowered: usize,

    /// Intrinsics with no known libcall, left in place.
    pub retained: usize,

    pub diagnostics: Vec<Diagnostic>,
}

pub fn run_lower_intrinsics(module: &mut Module) -> LowerIntrinsicsReport {
    let mut report = LowerIntrinsicsReport::default();
    let mut to_delete = Vec::new();

    for func in module.iter_functions().collect::<Vec<_>>() {
        if !module.is_intrinsic(func) {
            continue;
        }

        let name = module.funcs[func].sig.name().to_string();
        if is_always_inlined(&name) {
            continue;
        }

        let Some(libcall) = libcall_for(&name) else {
            warn!(intrinsic = %name, "unable to handle intrinsic");
            report.diagnostics.push(Diagnostic::warning(
                format!("unable to handle intrinsic `{name}`"),
                Location::Function(func),
            ));
            report.retained += 1;
            continue;
        };

        let replacement = match module.func_by_name(libcall) {
            Some(existing) => existing,
            None => {
                let sig = module.funcs[func].sig.clone_as(libcall, Linkage::External);
                module.declare_function(sig)
            }
        };

        debug!(intrinsic = %name, libcall, "lowering intrinsic to libcall");
        module.replace_all_uses_with(func, replacement);
        to_delete.push(func);
        report.lowered += 1;
    }

    // Deletion happens after the scan so no traversal observes a function
    // whose uses are mid-rewrite.
    for func in to_delete {
        module.remove_function(func);
    }

    report
}
