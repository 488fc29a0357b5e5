use stabilizer_triple::TargetTriple;

use super::FunctionBuilder;
use crate::{
    function::Signature,
    global_variable::{GlobalVariableData, GlobalVariableRef},
    module::{FuncRef, Module},
};

/// Convenience wrapper for assembling a module.
///
/// Declaration is deduplicated by symbol name, so declaring the same
/// function twice hands back the original reference.
pub struct ModuleBuilder {
    pub module: Module,
}

impl ModuleBuilder {
    pub fn new(triple: TargetTriple) -> Self {
        Self {
            module: Module::new(triple),
        }
    }

    pub fn declare_function(&mut self, sig: Signature) -> FuncRef {
        self.module.declare_function(sig)
    }

    pub fn declare_intrinsic(&mut self, sig: Signature) -> FuncRef {
        self.module.declare_intrinsic(sig)
    }

    pub fn lookup_func(&self, name: &str) -> Option<FuncRef> {
        self.module.func_by_name(name)
    }

    pub fn make_global(&mut self, global: GlobalVariableData) -> GlobalVariableRef {
        self.module.globals.make_gv(global)
    }

    pub fn lookup_global(&self, name: &str) -> Option<GlobalVariableRef> {
        self.module.globals.gv_by_symbol(name)
    }

    pub fn func_builder(&mut self, func: FuncRef) -> FunctionBuilder<'_> {
        FunctionBuilder::new(&mut self.module, func)
    }

    pub fn build(self) -> Module {
        self.module
    }
}
