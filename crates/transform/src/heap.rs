//! Heap randomization.
//!
//! Allocator call sites are rewired to the runtime's replacements purely by
//! name; signatures and argument order are untouched. The original
//! declarations are left in the module as unused symbols.

use stabilizer_ir::{Linkage, Module};
use tracing::debug;

/// Allocator entry points the runtime provides replacements for.
pub const HEAP_FUNCTIONS: [&str; 4] = ["malloc", "calloc", "realloc", "free"];

/// Prefix of the runtime's replacement symbols.
pub const RUNTIME_PREFIX: &str = "stabilizer_";

/// Rewires every declared allocator to its `stabilizer_`-prefixed runtime
/// replacement. Returns the number of allocators rewired.
pub fn randomize_heap(module: &mut Module) -> usize {
    let mut rewired = 0;

    for name in HEAP_FUNCTIONS {
        let Some(original) = module.func_by_name(name) else {
            continue;
        };

        let replacement_name = format!("{RUNTIME_PREFIX}{name}");
        let replacement = match module.func_by_name(&replacement_name) {
            Some(existing) => existing,
            None => {
                let sig = module.funcs[original]
                    .sig
                    .clone_as(&replacement_name, Linkage::External);
                module.declare_function(sig)
            }
        };

        debug!(allocator = name, replacement = %replacement_name, "rewiring heap allocator");
        module.replace_all_uses_with(original, replacement);
        rewired += 1;
    }

    rewired
}

#[cfg(test)]
mod tests {
    use stabilizer_ir::{builder::ModuleBuilder, Signature, Type};
    use stabilizer_triple::TargetTriple;

    use super::*;

    #[test]
    fn malloc_calls_are_retargeted_by_name() {
        let mut builder = ModuleBuilder::new(TargetTriple::parse("x86_64-unknown-linux").unwrap());
        let i8p = Type::make_ptr(Type::I8);
        let malloc = builder.declare_function(Signature::new(
            "malloc",
            Linkage::External,
            &[Type::I64],
            i8p.clone(),
        ));
        let caller =
            builder.declare_function(Signature::new("caller", Linkage::Public, &[], i8p.clone()));
        let mut fb = builder.func_builder(caller);
        let entry = fb.append_block();
        fb.switch_to_block(entry);
        let size = fb.make_imm_value(32i64);
        let ptr = fb.call(malloc, &[size]).unwrap();
        fb.ret(Some(ptr));

        let mut module = builder.build();
        assert_eq!(randomize_heap(&mut module), 1);

        let replacement = module.func_by_name("stabilizer_malloc").unwrap();
        assert_eq!(module.funcs[replacement].sig.args(), &[Type::I64]);
        assert_eq!(module.funcs[replacement].sig.ret_ty(), &i8p);
        assert_eq!(module.count_uses_of(replacement), 1);

        // The original symbol survives with no remaining uses.
        assert_eq!(module.func_by_name("malloc"), Some(malloc));
        assert_eq!(module.count_uses_of(malloc), 0);
    }

    #[test]
    fn absent_allocators_are_ignored() {
        let mut builder = ModuleBuilder::new(TargetTriple::parse("x86_64-unknown-linux").unwrap());
        builder.declare_function(Signature::new("free", Linkage::External, &[Type::make_ptr(Type::I8)], Type::Unit));

        let mut module = builder.build();
        assert_eq!(randomize_heap(&mut module), 1);
        assert!(module.func_by_name("stabilizer_free").is_some());
        assert!(module.func_by_name("stabilizer_malloc").is_none());
    }
}
