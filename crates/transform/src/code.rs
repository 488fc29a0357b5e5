//! Code randomization.
//!
//! A randomized function may be copied anywhere in memory at runtime, so
//! nothing in its body may address a global directly. Every constant
//! operand whose closure mentions a global or a function is replaced by a
//! load from a per-function relocation table; the runtime patches the
//! table (or places a copy of it behind the function's sentinel on
//! PC-relative targets) whenever the function moves. The sentinel function
//! placed immediately after the function in the module list doubles as the
//! upper bound of its emitted code.

use indexmap::IndexMap;
use smallvec::smallvec;
use stabilizer_ir::{
    Constant, FuncRef, GlobalVariableData, GlobalVariableRef, Insn, InsnData, Linkage, Module,
    Signature, SymbolRef, Type, Value, ValueId,
};
use tracing::debug;

use crate::float_extract::extract_float_operations;

/// Name prefix of sentinel functions.
pub const SENTINEL_PREFIX: &str = "stabilizer.dummy.";

/// Placement alignment of sentinels, one cache line, so code and table
/// bytes never share a line.
pub const SENTINEL_ALIGN: u32 = 64;

/// The exception personality routine; never randomized and never treated
/// as a relocatable reference.
pub const PERSONALITY_FUNCTION: &str = "__gxx_personality_v0";

/// The arguments a function is registered with, in runtime ABI order:
/// code base, code limit, relocation table, table byte size, and whether
/// the reachable table is the adjacent copy rather than the global one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncRegistration {
    pub func: FuncRef,
    pub sentinel: FuncRef,
    pub table: Option<GlobalVariableRef>,
    pub table_size: u32,
    pub adjacent: bool,
}

/// One rewritable mention of a collected constant.
#[derive(Debug, Clone, Copy)]
enum UseSite {
    /// An ordinary operand slot.
    Operand { insn: Insn, slot: usize },

    /// A phi incoming value; the replacement load must execute on the
    /// incoming edge.
    PhiIncoming { insn: Insn, slot: usize },

    /// The target of a direct call; rewriting turns the call indirect.
    Callee { insn: Insn },
}

/// Transforms `func` to reach globals only through its relocation table
/// and returns its registration arguments.
pub fn randomize_code(module: &mut Module, func: FuncRef) -> FuncRegistration {
    let sentinel = make_sentinel(module, func);
    normalize_function(module, func);

    // Required unconditionally; PowerPC additionally needs float-truncate
    // extracted, which extract_float_operations handles by target.
    extract_float_operations(module, func);

    let references = collect_pc_relative_uses(module, func);
    if references.is_empty() {
        return FuncRegistration {
            func,
            sentinel,
            table: None,
            table_size: 0,
            adjacent: false,
        };
    }

    let referenced: Vec<Constant> = references.keys().cloned().collect();
    let field_tys: Vec<Type> = referenced.iter().map(|c| c.ty(module)).collect();
    let table_ty = Type::Struct(field_tys.clone());

    let table_symbol = format!("{}.relocation_table", module.funcs[func].sig.name());
    debug!(
        func = module.funcs[func].sig.name(),
        entries = referenced.len(),
        "building relocation table"
    );
    // The table must stay mutable: the runtime rewrites its slots on every
    // relocation.
    let table = module.globals.make_gv(GlobalVariableData::new(
        table_symbol,
        table_ty.clone(),
        Linkage::Private,
        false,
        Some(Constant::Struct(referenced)),
    ));

    // On PC-relative targets the code reaches the copy of the table that
    // the runtime places at the sentinel, a fixed offset from the moving
    // code; elsewhere the global table is addressed directly.
    let adjacent = module.triple.architecture.is_data_pc_relative();
    let table_base = if adjacent {
        Constant::ptr_cast(Constant::FuncAddr(sentinel), Type::make_ptr(table_ty.clone()))
    } else {
        Constant::Global(table)
    };

    rewrite_uses(module, func, references, &field_tys, &table_base, &table_ty);

    let table_size = table_ty.size_of(module.ptr_width) as u32;

    FuncRegistration {
        func,
        sentinel,
        table: Some(table),
        table_size,
        adjacent,
    }
}

/// Creates `stabilizer.dummy.{func}`: an empty, cache-line aligned function
/// placed immediately after `func` in the module list. The address range
/// [func, sentinel) is the function's emitted code extent.
fn make_sentinel(module: &mut Module, func: FuncRef) -> FuncRef {
    let name = format!("{SENTINEL_PREFIX}{}", module.funcs[func].sig.name());
    let sentinel =
        module.declare_function(Signature::new(&name, Linkage::Private, &[], Type::Unit));
    module.func_attributes[sentinel].align = Some(SENTINEL_ALIGN);

    let f = &mut module.funcs[sentinel];
    let block = f.dfg.make_block();
    f.layout.append_block(block);
    let ret = f.dfg.make_insn(InsnData::Return { args: None });
    f.layout.append_insn(ret, block);

    module.insert_func_after(sentinel, func);
    sentinel
}

/// Strips the attributes and linkage that would defeat randomization:
/// stack protectors introduce implicit global references during code
/// generation, and linkonce-ODR copies must not be deduplicated away.
fn normalize_function(module: &mut Module, func: FuncRef) {
    let attrs = &mut module.func_attributes[func];
    attrs.stack_protect = false;
    attrs.stack_protect_req = false;

    let sig = &mut module.funcs[func].sig;
    if sig.linkage() == Linkage::LinkOnceOdr {
        sig.set_linkage(Linkage::Public);
    }
}

/// Collects every operand whose constant closure mentions a randomizable
/// global, keyed by constant in first-discovery order. Direct call targets
/// count as mentions of the callee's address.
fn collect_pc_relative_uses(
    module: &Module,
    func: FuncRef,
) -> IndexMap<Constant, Vec<UseSite>> {
    let mut references: IndexMap<Constant, Vec<UseSite>> = IndexMap::new();
    let f = &module.funcs[func];

    for block in f.layout.iter_block() {
        for insn in f.layout.iter_insn(block) {
            let data = f.dfg.insn(insn);
            let is_phi = data.is_phi();

            for (slot, value) in data.args().iter().enumerate() {
                let Value::Constant { constant, .. } = f.dfg.value(*value) else {
                    continue;
                };
                if !refers_to_randomizable_global(module, constant) {
                    continue;
                }

                let site = if is_phi {
                    UseSite::PhiIncoming { insn, slot }
                } else {
                    UseSite::Operand { insn, slot }
                };
                references.entry(constant.clone()).or_default().push(site);
            }

            if let Some(callee) = data.callee() {
                if is_randomizable_target(module, callee) {
                    references
                        .entry(Constant::FuncAddr(callee))
                        .or_default()
                        .push(UseSite::Callee { insn });
                }
            }
        }
    }

    references
}

/// Returns `true` if the constant's closure contains any global value
/// other than intrinsics and the personality routine.
fn refers_to_randomizable_global(module: &Module, constant: &Constant) -> bool {
    let mut found = false;
    constant.walk_symbols(&mut |sym| match sym {
        SymbolRef::Global(_) => found = true,
        SymbolRef::Func(func) => found |= is_randomizable_target(module, func),
    });
    found
}

fn is_randomizable_target(module: &Module, func: FuncRef) -> bool {
    !module.is_intrinsic(func) && module.funcs[func].sig.name() != PERSONALITY_FUNCTION
}

/// Rewrites every collected use into a GEP-and-load of the corresponding
/// table slot. A load may never dominate itself through a phi, so loads
/// for phi operands are inserted at the incoming block's terminator.
///
/// Operand rewrites address slots positionally, and turning a direct call
/// indirect prepends the loaded pointer as operand 0, shifting every
/// argument slot of that call. Callee conversions therefore run only
/// after all slot-addressed rewrites are done.
fn rewrite_uses(
    module: &mut Module,
    func: FuncRef,
    references: IndexMap<Constant, Vec<UseSite>>,
    field_tys: &[Type],
    table_base: &Constant,
    table_ty: &Type,
) {
    let table_ptr_ty = Type::make_ptr(table_ty.clone());
    let mut deferred_callees = Vec::new();

    for (index, (_, sites)) in references.into_iter().enumerate() {
        for site in sites {
            let point = match site {
                UseSite::Operand { insn, .. } => insn,
                UseSite::PhiIncoming { insn, slot } => {
                    let incoming = module.funcs[func].dfg.insn(insn).phi_incoming_block(slot);
                    module.funcs[func]
                        .layout
                        .last_insn_of(incoming)
                        .expect("phi predecessor must end in a terminator")
                }
                UseSite::Callee { insn } => {
                    deferred_callees.push((index, insn));
                    continue;
                }
            };

            let loaded =
                load_table_slot(module, func, point, table_base, &table_ptr_ty, index, &field_tys[index]);
            let (UseSite::Operand { insn, slot } | UseSite::PhiIncoming { insn, slot }) = site
            else {
                unreachable!();
            };
            module.funcs[func].dfg.rewrite_insn_arg(insn, slot, loaded);
        }
    }

    for (index, insn) in deferred_callees {
        let loaded =
            load_table_slot(module, func, insn, table_base, &table_ptr_ty, index, &field_tys[index]);

        let f = &mut module.funcs[func];
        let InsnData::Call { args, ret_ty, .. } = f.dfg.insn(insn).clone() else {
            panic!("callee use must belong to a direct call");
        };
        let mut indirect_args = smallvec![loaded];
        indirect_args.extend(args);
        f.dfg.replace_insn(
            insn,
            InsnData::CallIndirect {
                args: indirect_args,
                ret_ty,
            },
        );
    }
}

/// Emits a GEP of slot `index` against the addressed table and a load of
/// the slot, both immediately before `point`, and returns the loaded
/// value.
fn load_table_slot(
    module: &mut Module,
    func: FuncRef,
    point: Insn,
    table_base: &Constant,
    table_ptr_ty: &Type,
    index: usize,
    field_ty: &Type,
) -> ValueId {
    let f = &mut module.funcs[func];
    let base = f
        .dfg
        .make_constant_value(table_base.clone(), table_ptr_ty.clone());
    let zero = f.dfg.make_imm_value(0i32);
    let slot_index = f.dfg.make_imm_value(index as i32);

    let gep = f.dfg.make_insn(InsnData::Gep {
        args: smallvec![base, zero, slot_index],
    });
    f.layout.insert_insn_before(gep, point);
    let gep_result = f.dfg.make_result(gep).unwrap();
    let gep_result = f.dfg.make_value(gep_result);
    f.dfg.attach_result(gep, gep_result);

    let load = f.dfg.make_insn(InsnData::Load {
        args: [gep_result],
        ty: field_ty.clone(),
    });
    f.layout.insert_insn_before(load, point);
    let loaded = f.dfg.make_result(load).unwrap();
    let loaded = f.dfg.make_value(loaded);
    f.dfg.attach_result(load, loaded);
    loaded
}

#[cfg(test)]
mod tests {
    use stabilizer_ir::{builder::ModuleBuilder, Immediate};
    use stabilizer_triple::TargetTriple;

    use super::*;

    fn builder(triple: &str) -> ModuleBuilder {
        ModuleBuilder::new(TargetTriple::parse(triple).unwrap())
    }

    fn empty_func(builder: &mut ModuleBuilder, name: &str) -> FuncRef {
        let func =
            builder.declare_function(Signature::new(name, Linkage::Public, &[], Type::Unit));
        let mut fb = builder.func_builder(func);
        let entry = fb.append_block();
        fb.switch_to_block(entry);
        fb.ret(None);
        func
    }

    #[test]
    fn sentinel_follows_the_function() {
        let mut builder = builder("x86_64-unknown-linux");
        let f = empty_func(&mut builder, "f");
        let g = empty_func(&mut builder, "g");

        let mut module = builder.build();
        let reg = randomize_code(&mut module, f);

        assert_eq!(module.next_function_of(f), Some(reg.sentinel));
        assert_eq!(module.next_function_of(reg.sentinel), Some(g));
        assert_eq!(
            module.funcs[reg.sentinel].sig.name(),
            "stabilizer.dummy.f"
        );
        assert_eq!(module.func_attributes[reg.sentinel].align, Some(64));

        // The sentinel body is a single void return.
        let s = &module.funcs[reg.sentinel];
        let entry = s.layout.entry_block().unwrap();
        let body: Vec<_> = s.layout.iter_insn(entry).collect();
        assert_eq!(body.len(), 1);
        assert!(matches!(s.dfg.insn(body[0]), InsnData::Return { args: None }));
    }

    #[test]
    fn reference_free_function_registers_without_a_table() {
        let mut builder = builder("x86_64-unknown-linux");
        let f = empty_func(&mut builder, "f");

        let mut module = builder.build();
        let reg = randomize_code(&mut module, f);

        assert_eq!(reg.table, None);
        assert_eq!(reg.table_size, 0);
        assert!(!reg.adjacent);
    }

    #[test]
    fn global_reference_goes_through_the_table() {
        let mut builder = builder("x86_64-unknown-linux");
        let g = builder.make_global(GlobalVariableData::new(
            "g".into(),
            Type::I32,
            Linkage::Public,
            false,
            Some(Constant::Int(Immediate::I32(7))),
        ));
        let h = builder.declare_function(Signature::new("h", Linkage::Public, &[], Type::I32));
        let mut fb = builder.func_builder(h);
        let entry = fb.append_block();
        fb.switch_to_block(entry);
        let addr = fb.make_constant_value(Constant::Global(g));
        let value = fb.load(addr, Type::I32);
        fb.ret(Some(value));

        let mut module = builder.build();
        let reg = randomize_code(&mut module, h);

        let table = reg.table.unwrap();
        assert_eq!(module.globals.symbol(table), "h.relocation_table");
        assert!(!module.globals.is_const(table));
        assert_eq!(
            module.globals.init_data(table),
            Some(&Constant::Struct(vec![Constant::Global(g)]))
        );
        // One pointer-sized slot on a 64-bit PC-relative target.
        assert_eq!(reg.table_size, 8);
        assert!(reg.adjacent);

        // The body is now gep, load (slot), load (value), ret, and the
        // original load's address operand is the slot load's result.
        let f = &module.funcs[h];
        let insns: Vec<_> = f.layout.iter_insn(entry).collect();
        assert_eq!(insns.len(), 4);
        assert!(matches!(f.dfg.insn(insns[0]), InsnData::Gep { .. }));
        assert!(matches!(f.dfg.insn(insns[1]), InsnData::Load { .. }));
        let slot_value = f.dfg.insn_result(insns[1]).unwrap();
        assert_eq!(f.dfg.insn(insns[2]).args().as_slice(), &[slot_value]);
    }

    #[test]
    fn table_base_is_the_sentinel_on_pc_relative_targets() {
        let mut builder = builder("x86_64-unknown-linux");
        let g = builder.make_global(GlobalVariableData::new(
            "g".into(),
            Type::I32,
            Linkage::Public,
            false,
            None,
        ));
        let h = builder.declare_function(Signature::new("h", Linkage::Public, &[], Type::I32));
        let mut fb = builder.func_builder(h);
        let entry = fb.append_block();
        fb.switch_to_block(entry);
        let addr = fb.make_constant_value(Constant::Global(g));
        let value = fb.load(addr, Type::I32);
        fb.ret(Some(value));

        let mut module = builder.build();
        let reg = randomize_code(&mut module, h);

        let f = &module.funcs[h];
        let insns: Vec<_> = f.layout.iter_insn(entry).collect();
        let gep_base = f.dfg.insn(insns[0]).args()[0];
        match f.dfg.value(gep_base) {
            Value::Constant {
                constant: Constant::PtrCast(inner, _),
                ..
            } => assert_eq!(**inner, Constant::FuncAddr(reg.sentinel)),
            other => panic!("expected sentinel cast as table base, got {other:?}"),
        }
    }

    #[test]
    fn table_base_is_the_global_on_absolute_targets() {
        let mut builder = builder("i686-pc-linux");
        let g = builder.make_global(GlobalVariableData::new(
            "g".into(),
            Type::I32,
            Linkage::Public,
            false,
            None,
        ));
        let h = builder.declare_function(Signature::new("h", Linkage::Public, &[], Type::I32));
        let mut fb = builder.func_builder(h);
        let entry = fb.append_block();
        fb.switch_to_block(entry);
        let addr = fb.make_constant_value(Constant::Global(g));
        let value = fb.load(addr, Type::I32);
        fb.ret(Some(value));

        let mut module = builder.build();
        let reg = randomize_code(&mut module, h);

        assert!(!reg.adjacent);
        // One 32-bit pointer slot.
        assert_eq!(reg.table_size, 4);

        let f = &module.funcs[h];
        let entry = f.layout.entry_block().unwrap();
        let insns: Vec<_> = f.layout.iter_insn(entry).collect();
        let gep_base = f.dfg.insn(insns[0]).args()[0];
        match f.dfg.value(gep_base) {
            Value::Constant {
                constant: Constant::Global(gv),
                ..
            } => assert_eq!(*gv, reg.table.unwrap()),
            other => panic!("expected the table global as base, got {other:?}"),
        }
    }

    #[test]
    fn direct_calls_become_indirect_through_the_table() {
        let mut builder = builder("x86_64-unknown-linux");
        let callee =
            builder.declare_function(Signature::new("callee", Linkage::External, &[], Type::Unit));
        let caller =
            builder.declare_function(Signature::new("caller", Linkage::Public, &[], Type::Unit));
        let mut fb = builder.func_builder(caller);
        let entry = fb.append_block();
        fb.switch_to_block(entry);
        fb.call(callee, &[]);
        fb.ret(None);

        let mut module = builder.build();
        let reg = randomize_code(&mut module, caller);

        assert_eq!(
            module.globals.init_data(reg.table.unwrap()),
            Some(&Constant::Struct(vec![Constant::FuncAddr(callee)]))
        );

        let f = &module.funcs[caller];
        let insns: Vec<_> = f.layout.iter_insn(entry).collect();
        assert!(matches!(
            f.dfg.insn(insns[2]),
            InsnData::CallIndirect { .. }
        ));
        assert_eq!(f.dfg.call_sites_of(callee), 0);
    }

    #[test]
    fn call_argument_slots_survive_callee_conversion() {
        // The callee's address is first discovered through an ordinary
        // operand (the store), so its table index is lower than the call
        // argument's. The argument rewrite must still hit the argument,
        // not the prepended function pointer.
        let mut builder = builder("x86_64-unknown-linux");
        let i32p = Type::make_ptr(Type::I32);
        let foo = builder.declare_function(Signature::new(
            "foo",
            Linkage::External,
            &[i32p.clone()],
            Type::Unit,
        ));
        let fp = builder.make_global(GlobalVariableData::new(
            "fp".into(),
            Type::make_ptr(Type::make_func(vec![i32p.clone()], Type::Unit)),
            Linkage::Public,
            false,
            None,
        ));
        let g = builder.make_global(GlobalVariableData::new(
            "g".into(),
            Type::I32,
            Linkage::Public,
            false,
            None,
        ));
        let caller =
            builder.declare_function(Signature::new("caller", Linkage::Public, &[], Type::Unit));
        let mut fb = builder.func_builder(caller);
        let entry = fb.append_block();
        fb.switch_to_block(entry);
        let fp_addr = fb.make_constant_value(Constant::Global(fp));
        let foo_addr = fb.make_constant_value(Constant::FuncAddr(foo));
        fb.store(fp_addr, foo_addr);
        let g_addr = fb.make_constant_value(Constant::Global(g));
        fb.call(foo, &[g_addr]);
        fb.ret(None);

        let mut module = builder.build();
        let reg = randomize_code(&mut module, caller);

        assert_eq!(
            module.globals.init_data(reg.table.unwrap()),
            Some(&Constant::Struct(vec![
                Constant::Global(fp),
                Constant::FuncAddr(foo),
                Constant::Global(g),
            ]))
        );

        let fd = &module.funcs[caller];
        let slot_of = |value: ValueId| -> i64 {
            let Value::Inst { insn: load, .. } = fd.dfg.value(value) else {
                panic!("expected a load result");
            };
            let gep_arg = fd.dfg.insn(*load).args()[0];
            let Value::Inst { insn: gep, .. } = fd.dfg.value(gep_arg) else {
                panic!("expected a gep result");
            };
            fd.dfg
                .value_as_const_int(fd.dfg.insn(*gep).args()[2])
                .unwrap()
        };

        let insns: Vec<_> = fd
            .layout
            .iter_block()
            .flat_map(|block| fd.layout.iter_insn(block))
            .collect();
        let call = insns
            .iter()
            .copied()
            .find(|insn| matches!(fd.dfg.insn(*insn), InsnData::CallIndirect { .. }))
            .unwrap();

        let args = fd.dfg.insn(call).args();
        assert_eq!(args.len(), 2);
        // Operand 0 is the callee pointer loaded from foo's slot; the
        // argument still loads g's slot.
        assert_eq!(slot_of(args[0]), 1);
        assert_eq!(slot_of(args[1]), 2);

        // The store's value operand was rewritten through foo's slot too.
        let store = insns
            .iter()
            .copied()
            .find(|insn| matches!(fd.dfg.insn(*insn), InsnData::Store { .. }))
            .unwrap();
        assert_eq!(slot_of(fd.dfg.insn(store).args()[1]), 1);
    }

    #[test]
    fn intrinsic_callees_are_left_direct() {
        let mut builder = builder("x86_64-unknown-linux");
        let intrinsic = builder.declare_intrinsic(Signature::new(
            "stacksave",
            Linkage::External,
            &[],
            Type::make_ptr(Type::I8),
        ));
        let caller =
            builder.declare_function(Signature::new("caller", Linkage::Public, &[], Type::Unit));
        let mut fb = builder.func_builder(caller);
        let entry = fb.append_block();
        fb.switch_to_block(entry);
        fb.call(intrinsic, &[]);
        fb.ret(None);

        let mut module = builder.build();
        let reg = randomize_code(&mut module, caller);

        assert_eq!(reg.table, None);
        let f = &module.funcs[caller];
        assert_eq!(f.dfg.call_sites_of(intrinsic), 1);
    }

    #[test]
    fn linkonce_odr_becomes_public_and_protectors_are_stripped() {
        let mut builder = builder("x86_64-unknown-linux");
        let f = builder.declare_function(Signature::new(
            "templated",
            Linkage::LinkOnceOdr,
            &[],
            Type::Unit,
        ));
        let mut fb = builder.func_builder(f);
        let entry = fb.append_block();
        fb.switch_to_block(entry);
        fb.ret(None);

        let mut module = builder.build();
        module.func_attributes[f].stack_protect = true;
        module.func_attributes[f].stack_protect_req = true;

        randomize_code(&mut module, f);

        assert_eq!(module.funcs[f].sig.linkage(), Linkage::Public);
        assert!(!module.func_attributes[f].stack_protect);
        assert!(!module.func_attributes[f].stack_protect_req);
    }

    #[test]
    fn phi_rewrites_load_on_the_incoming_edge() {
        let mut builder = builder("x86_64-unknown-linux");
        let g = builder.make_global(GlobalVariableData::new(
            "g".into(),
            Type::I64,
            Linkage::Public,
            false,
            None,
        ));
        let f = builder.declare_function(Signature::new(
            "select_addr",
            Linkage::Public,
            &[Type::I1],
            Type::make_ptr(Type::I64),
        ));
        let mut fb = builder.func_builder(f);
        let entry = fb.append_block();
        let then_bb = fb.append_block();
        let join = fb.append_block();

        fb.switch_to_block(entry);
        let cond = fb.arg_value(0);
        fb.branch(cond, then_bb, join);

        fb.switch_to_block(then_bb);
        fb.jump(join);

        fb.switch_to_block(join);
        let g_addr = fb.make_constant_value(Constant::Global(g));
        let null = fb.make_constant_value(Constant::Null(Type::make_ptr(Type::I64)));
        let merged = fb.phi(
            Type::make_ptr(Type::I64),
            &[(g_addr, then_bb), (null, entry)],
        );
        fb.ret(Some(merged));

        let mut module = builder.build();
        randomize_code(&mut module, f);

        // The load lands before the terminator of `then_bb`, not in the
        // join block ahead of the phi.
        let fd = &module.funcs[f];
        let then_insns: Vec<_> = fd.layout.iter_insn(then_bb).collect();
        assert_eq!(then_insns.len(), 3);
        assert!(matches!(fd.dfg.insn(then_insns[0]), InsnData::Gep { .. }));
        assert!(matches!(fd.dfg.insn(then_insns[1]), InsnData::Load { .. }));
        assert!(fd.dfg.insn(then_insns[2]).is_terminator());

        let join_insns: Vec<_> = fd.layout.iter_insn(join).collect();
        assert!(fd.dfg.insn(join_insns[0]).is_phi());

        // The phi's incoming value on the then-edge is the inserted load.
        let loaded = fd.dfg.insn_result(then_insns[1]).unwrap();
        let InsnData::Phi { args, .. } = fd.dfg.insn(join_insns[0]) else {
            unreachable!();
        };
        assert!(args.contains(&(loaded, then_bb)));
    }
}
