//! Module constructor synthesis.
//!
//! The transformed module ends up with exactly one constructor: a
//! synthesized function that hands every randomized function, stack pad,
//! and pre-existing constructor to the runtime. Pre-existing constructors
//! are no longer run by the loader; the runtime invokes them itself,
//! after it has relocated the code they are about to execute.

use stabilizer_ir::{
    builder::FunctionBuilder, Constant, FuncRef, GlobalVariableData, GlobalVariableRef, Immediate,
    Linkage, Module, Signature, Type, CTOR_TABLE_SYMBOL,
};
use tracing::debug;

use crate::code::FuncRegistration;

/// Name of the synthesized module constructor.
pub const MODULE_CTOR: &str = "stabilizer.module_ctor";

/// Runtime registration entry points.
pub const REGISTER_FUNCTION: &str = "stabilizer_register_function";
pub const REGISTER_CONSTRUCTOR: &str = "stabilizer_register_constructor";
pub const REGISTER_STACK_PAD: &str = "stabilizer_register_stack_pad";

/// The program entry point, and the name it is moved to. The runtime links
/// its own `main`, which sets up randomization and then invokes the
/// renamed symbol.
pub const MAIN: &str = "main";
pub const RENAMED_MAIN: &str = "stabilizer_main";

/// Priority of the synthesized constructor-table entry.
pub const CTOR_PRIORITY: u32 = 65535;

#[derive(Debug, Clone, Copy)]
pub struct RuntimeFunctions {
    pub register_function: FuncRef,
    pub register_constructor: FuncRef,
    pub register_stack_pad: FuncRef,
}

/// Declares the runtime's registration functions. All three are external
/// and non-lazy-bound: they must resolve before any randomization runs.
pub fn declare_runtime_functions(module: &mut Module) -> RuntimeFunctions {
    let i8p = Type::make_ptr(Type::I8);

    let register_function = module.declare_function(Signature::new(
        REGISTER_FUNCTION,
        Linkage::External,
        &[
            i8p.clone(), // code base
            i8p.clone(), // code limit
            i8p.clone(), // relocation table base
            Type::I32,   // table byte size
            Type::I1,    // adjacent table
            i8p.clone(), // stack pad
        ],
        Type::Unit,
    ));
    let register_constructor = module.declare_function(Signature::new(
        REGISTER_CONSTRUCTOR,
        Linkage::External,
        &[i8p.clone()],
        Type::Unit,
    ));
    let register_stack_pad = module.declare_function(Signature::new(
        REGISTER_STACK_PAD,
        Linkage::External,
        &[i8p],
        Type::Unit,
    ));

    for func in [register_function, register_constructor, register_stack_pad] {
        module.func_attributes[func].non_lazy_bind = true;
    }

    RuntimeFunctions {
        register_function,
        register_constructor,
        register_stack_pad,
    }
}

/// Function pointers of the module's existing constructor-table entries,
/// in table order.
pub fn existing_constructors(module: &Module) -> Vec<FuncRef> {
    let Some(table) = module.globals.gv_by_symbol(CTOR_TABLE_SYMBOL) else {
        return Vec::new();
    };
    let Some(Constant::Array(entries)) = module.globals.init_data(table) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Constant::Struct(fields) => match fields.get(1) {
                Some(Constant::FuncAddr(func)) => Some(*func),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

/// Creates the constructor function with a single open basic block.
/// Registration calls are appended by the caller; [`finish_constructor`]
/// terminates it.
pub fn make_constructor(module: &mut Module, name: &str) -> FuncRef {
    let ctor = module.declare_function(Signature::new(name, Linkage::Private, &[], Type::Unit));
    let f = &mut module.funcs[ctor];
    let block = f.dfg.make_block();
    f.layout.append_block(block);
    ctor
}

pub fn finish_constructor(module: &mut Module, ctor: FuncRef) {
    let mut fb = ctor_builder(module, ctor);
    fb.ret(None);
}

/// Appends a `stabilizer_register_function` call for `reg`, with the
/// function's stack pad or a null pointer when stack randomization is off.
pub fn emit_register_function(
    module: &mut Module,
    ctor: FuncRef,
    rt: &RuntimeFunctions,
    reg: &FuncRegistration,
    pad: Option<GlobalVariableRef>,
) {
    let i8p = Type::make_ptr(Type::I8);
    let register_function = rt.register_function;

    let mut fb = ctor_builder(module, ctor);
    let base = fb.make_constant_value(Constant::ptr_cast(
        Constant::FuncAddr(reg.func),
        i8p.clone(),
    ));
    let limit = fb.make_constant_value(Constant::ptr_cast(
        Constant::FuncAddr(reg.sentinel),
        i8p.clone(),
    ));
    let table = match reg.table {
        Some(table) => {
            fb.make_constant_value(Constant::ptr_cast(Constant::Global(table), i8p.clone()))
        }
        None => fb.make_constant_value(Constant::Null(i8p.clone())),
    };
    let table_size = fb.make_imm_value(Immediate::I32(reg.table_size as i32));
    let adjacent = fb.make_imm_value(reg.adjacent);
    let pad = match pad {
        // The pad global is a byte, so its address already is an `*i8`.
        Some(pad) => fb.make_constant_value(Constant::Global(pad)),
        None => fb.make_constant_value(Constant::Null(i8p)),
    };

    fb.call(
        register_function,
        &[base, limit, table, table_size, adjacent, pad],
    );
}

/// Appends a `stabilizer_register_constructor` call for a pre-existing
/// constructor.
pub fn emit_register_constructor(
    module: &mut Module,
    ctor: FuncRef,
    rt: &RuntimeFunctions,
    old_ctor: FuncRef,
) {
    let i8p = Type::make_ptr(Type::I8);
    let register_constructor = rt.register_constructor;

    let mut fb = ctor_builder(module, ctor);
    let ptr = fb.make_constant_value(Constant::ptr_cast(Constant::FuncAddr(old_ctor), i8p));
    fb.call(register_constructor, &[ptr]);
}

/// Appends a `stabilizer_register_stack_pad` call; used when stack
/// randomization runs without code randomization.
pub fn emit_register_stack_pad(
    module: &mut Module,
    ctor: FuncRef,
    rt: &RuntimeFunctions,
    pad: GlobalVariableRef,
) {
    let register_stack_pad = rt.register_stack_pad;

    let mut fb = ctor_builder(module, ctor);
    let ptr = fb.make_constant_value(Constant::Global(pad));
    fb.call(register_stack_pad, &[ptr]);
}

/// Replaces the module's constructor table with a one-entry table at
/// priority [`CTOR_PRIORITY`] pointing at the synthesized constructor.
/// Any previous table is removed; the new one takes the well-known name.
pub fn replace_ctor_table(module: &mut Module, ctor: FuncRef) {
    if let Some(old) = module.globals.gv_by_symbol(CTOR_TABLE_SYMBOL) {
        module.globals.remove_gv(old);
    }

    let i8p = Type::make_ptr(Type::I8);
    let ctor_fn_ptr_ty = Type::make_ptr(Type::make_func(Vec::new(), Type::Unit));
    let entry_ty = Type::Struct(vec![Type::I32, ctor_fn_ptr_ty, i8p.clone()]);

    let entry = Constant::Struct(vec![
        Constant::Int(Immediate::I32(CTOR_PRIORITY as i32)),
        Constant::FuncAddr(ctor),
        Constant::Null(i8p),
    ]);

    debug!(ctor = module.funcs[ctor].sig.name(), "installing constructor table");
    module.globals.make_gv(GlobalVariableData::constant(
        CTOR_TABLE_SYMBOL.to_string(),
        Type::make_array(entry_ty, 1),
        Linkage::Private,
        Constant::Array(vec![entry]),
    ));
}

/// Renames `main` to the symbol the runtime's own `main` will invoke.
/// Returns `true` if the module defined a `main`.
pub fn rename_main(module: &mut Module) -> bool {
    let Some(main) = module.func_by_name(MAIN) else {
        return false;
    };

    debug!("renaming `{MAIN}` to `{RENAMED_MAIN}`");
    module.rename_function(main, RENAMED_MAIN);
    true
}

fn ctor_builder(module: &mut Module, ctor: FuncRef) -> FunctionBuilder<'_> {
    let entry = module.funcs[ctor]
        .layout
        .entry_block()
        .expect("constructor body must be open");
    let mut fb = FunctionBuilder::new(module, ctor);
    fb.switch_to_block(entry);
    fb
}
