//! The IR module: an arena of functions and globals referenced by stable
//! handles.

use cranelift_entity::{PrimaryMap, SecondaryMap};
use rustc_hash::FxHashMap;
use stabilizer_triple::{PointerWidth, TargetTriple};

use crate::{
    constant::SymbolRef,
    function::{Function, Signature},
    global_variable::GlobalVariableStore,
    types::Type,
    value::Value,
};

/// Symbol of the module's constructor table: a global of array-of-entry
/// shape, each entry `{ i32 priority, fn pointer, data pointer }`. The
/// loader runs the listed functions before `main`.
pub const CTOR_TABLE_SYMBOL: &str = "ctor_table";

/// An opaque reference to a [`Function`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncRef(pub u32);
cranelift_entity::entity_impl!(FuncRef);

/// Per-function attributes that live outside the signature.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FuncAttribute {
    /// The function is a compiler intrinsic: its body is supplied by the
    /// code generator, not by this module.
    pub intrinsic: bool,

    /// Requested placement alignment of the emitted code, in bytes.
    pub align: Option<u32>,

    pub stack_protect: bool,
    pub stack_protect_req: bool,

    /// Resolve the symbol eagerly at load time instead of through a lazy
    /// binding stub.
    pub non_lazy_bind: bool,
}

#[derive(Debug)]
pub struct Module {
    /// Target triple of the module.
    pub triple: TargetTriple,

    /// Pointer width of the module's data layout.
    pub ptr_width: PointerWidth,

    /// Holds all functions declared in the module.
    pub funcs: PrimaryMap<FuncRef, Function>,

    pub func_attributes: SecondaryMap<FuncRef, FuncAttribute>,

    pub globals: GlobalVariableStore,

    /// The observable order of the module's function list. Iteration and
    /// adjacency queries go through this, so a function inserted after
    /// another stays exactly there in the output.
    func_order: Vec<FuncRef>,

    symbols: FxHashMap<String, FuncRef>,
}

impl Module {
    pub fn new(triple: TargetTriple) -> Self {
        let ptr_width = triple.architecture.default_pointer_width();
        Self::with_pointer_width(triple, ptr_width)
    }

    pub fn with_pointer_width(triple: TargetTriple, ptr_width: PointerWidth) -> Self {
        Self {
            triple,
            ptr_width,
            funcs: PrimaryMap::default(),
            func_attributes: SecondaryMap::default(),
            globals: GlobalVariableStore::default(),
            func_order: Vec::default(),
            symbols: FxHashMap::default(),
        }
    }

    /// Declares a function, or returns the existing one with the same name.
    pub fn declare_function(&mut self, sig: Signature) -> FuncRef {
        if let Some(&func) = self.symbols.get(sig.name()) {
            return func;
        }

        let name = sig.name().to_string();
        let func = self.funcs.push(Function::new(sig));
        self.func_order.push(func);
        self.symbols.insert(name, func);
        func
    }

    /// Declares an intrinsic function: an external declaration whose body
    /// the code generator supplies.
    pub fn declare_intrinsic(&mut self, sig: Signature) -> FuncRef {
        let func = self.declare_function(sig);
        self.func_attributes[func].intrinsic = true;
        func
    }

    pub fn func_by_name(&self, name: &str) -> Option<FuncRef> {
        self.symbols.get(name).copied()
    }

    /// Functions in module-list order.
    pub fn iter_functions(&self) -> impl Iterator<Item = FuncRef> + '_ {
        self.func_order.iter().copied()
    }

    /// The function immediately following `func` in the module list.
    pub fn next_function_of(&self, func: FuncRef) -> Option<FuncRef> {
        let pos = self.position_of(func);
        self.func_order.get(pos + 1).copied()
    }

    /// Moves `func` so it immediately follows `after` in the module list.
    pub fn insert_func_after(&mut self, func: FuncRef, after: FuncRef) {
        let pos = self.position_of(func);
        self.func_order.remove(pos);
        let after_pos = self.position_of(after);
        self.func_order.insert(after_pos + 1, func);
    }

    /// Unlinks `func` from the module list and symbol table. The arena
    /// slot stays allocated but the function is no longer reachable.
    pub fn remove_function(&mut self, func: FuncRef) {
        let pos = self.position_of(func);
        self.func_order.remove(pos);
        self.symbols.remove(self.funcs[func].sig.name());
    }

    /// Gives `func` a new name. Panics if the name is already taken.
    pub fn rename_function(&mut self, func: FuncRef, name: &str) {
        assert!(
            !self.symbols.contains_key(name),
            "duplicate function symbol `{name}`"
        );
        self.symbols.remove(self.funcs[func].sig.name());
        self.funcs[func].sig.set_name(name);
        self.symbols.insert(name.to_string(), func);
    }

    pub fn is_intrinsic(&self, func: FuncRef) -> bool {
        self.func_attributes[func].intrinsic
    }

    /// Returns `true` if the function carries a definition in this module.
    pub fn has_definition(&self, func: FuncRef) -> bool {
        self.funcs[func].sig.linkage().has_definition()
    }

    /// Redirects every use of `old` to `new`: direct call targets,
    /// function addresses in materialized constants, and function
    /// addresses in global initializers.
    pub fn replace_all_uses_with(&mut self, old: FuncRef, new: FuncRef) {
        for func in self.func_order.clone() {
            self.funcs[func].dfg.replace_func_refs(old, new);
        }

        for data in self.globals.iter_mut_data() {
            if let Some(init) = &mut data.init {
                init.replace_func(old, new);
            }
        }
    }

    /// Counts the operand slots, call sites, and initializer references
    /// that mention `func` across the module.
    pub fn count_uses_of(&self, func: FuncRef) -> usize {
        let mut count = 0;

        for f in &self.func_order {
            let dfg = &self.funcs[*f].dfg;
            count += dfg.call_sites_of(func);

            for (value, data) in dfg.values.iter() {
                let Value::Constant { constant, .. } = data else {
                    continue;
                };
                let mut mentions = 0;
                constant.walk_symbols(&mut |sym| {
                    if sym == SymbolRef::Func(func) {
                        mentions += 1;
                    }
                });
                if mentions > 0 {
                    count += dfg.users_num(value);
                }
            }
        }

        for gv in self.globals.iter().collect::<Vec<_>>() {
            if let Some(init) = self.globals.init_data(gv) {
                init.walk_symbols(&mut |sym| {
                    if sym == SymbolRef::Func(func) {
                        count += 1;
                    }
                });
            }
        }

        count
    }

    /// The pointer-sized integer type of the module's data layout.
    pub fn intptr_ty(&self) -> Type {
        match self.ptr_width {
            PointerWidth::W32 => Type::I32,
            PointerWidth::W64 => Type::I64,
        }
    }

    fn position_of(&self, func: FuncRef) -> usize {
        self.func_order
            .iter()
            .position(|f| *f == func)
            .unwrap_or_else(|| panic!("function is not linked into the module list"))
    }
}
