//! The `stabilize` pass driver.
//!
//! Sub-passes run in a fixed order: heap rewiring, the local-function
//! snapshot, runtime declarations, stack randomization, constructor
//! synthesis with code randomization emitting into it, re-registration of
//! pre-existing constructors, and finally the `main` rename. The snapshot
//! is taken before anything is synthesized, so sentinels, converters, and
//! the constructor itself never become randomization targets.

use rustc_hash::FxHashMap;
use stabilizer_ir::{FuncRef, GlobalVariableRef, Module};
use tracing::debug;

use crate::{
    code::{randomize_code, PERSONALITY_FUNCTION},
    config::StabilizerConfig,
    ctor::{
        declare_runtime_functions, emit_register_constructor, emit_register_function,
        emit_register_stack_pad, existing_constructors, finish_constructor, make_constructor,
        rename_main, replace_ctor_table, MODULE_CTOR,
    },
    diagnostics::Diagnostic,
    heap::randomize_heap,
    stack::{make_stack_pad, randomize_stack},
};

#[derive(Debug, Default)]
pub struct StabilizeReport {
    pub heap_functions_rewired: usize,
    pub stack_padded_functions: usize,
    pub randomized_functions: usize,
    pub registered_constructors: usize,
    pub renamed_main: bool,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn run_stabilize(module: &mut Module, config: &StabilizerConfig) -> StabilizeReport {
    let mut report = StabilizeReport::default();

    if config.heap {
        report.heap_functions_rewired = randomize_heap(module);
    }

    let local_functions: Vec<FuncRef> = module
        .iter_functions()
        .filter(|func| is_randomizable(module, *func))
        .collect();
    debug!(
        local_functions = local_functions.len(),
        ?config,
        "stabilizing module"
    );

    let rt = declare_runtime_functions(module);

    let mut stack_pads: FxHashMap<FuncRef, GlobalVariableRef> = FxHashMap::default();
    if config.stack {
        for &func in &local_functions {
            let pad = make_stack_pad(module, func);
            stack_pads.insert(func, pad);
            randomize_stack(module, func, pad);
        }
        report.stack_padded_functions = local_functions.len();
    }

    let old_ctors = existing_constructors(module);
    let ctor = make_constructor(module, MODULE_CTOR);

    if config.code {
        for &func in &local_functions {
            let registration = randomize_code(module, func);
            emit_register_function(
                module,
                ctor,
                &rt,
                &registration,
                stack_pads.get(&func).copied(),
            );
        }
        report.randomized_functions = local_functions.len();
    }

    for &old_ctor in &old_ctors {
        emit_register_constructor(module, ctor, &rt, old_ctor);
    }
    report.registered_constructors = old_ctors.len();

    // Without code randomization the pads have no registration tuple to
    // ride along with, so they are registered on their own.
    if config.stack && !config.code {
        for &func in &local_functions {
            emit_register_stack_pad(module, ctor, &rt, stack_pads[&func]);
        }
    }

    finish_constructor(module, ctor);
    replace_ctor_table(module, ctor);
    report.renamed_main = rename_main(module);

    report
}

/// A function is a randomization target if it is locally defined with a
/// body, not an intrinsic, and not the exception personality routine.
/// Linkage alone is not enough: a forward declaration can carry local
/// linkage while having no body to randomize.
pub fn is_randomizable(module: &Module, func: FuncRef) -> bool {
    !module.is_intrinsic(func)
        && module.has_definition(func)
        && !module.funcs[func].is_declaration()
        && module.funcs[func].sig.name() != PERSONALITY_FUNCTION
}
