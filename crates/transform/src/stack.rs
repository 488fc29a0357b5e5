//! Stack randomization.
//!
//! Every call site gets a bracket: the single-byte pad global is loaded,
//! widened, scaled by the ABI stack alignment, and subtracted from the
//! saved stack pointer before the call; the saved pointer is reinstalled
//! right after. The pad value is owned by the runtime, so frame placement
//! becomes a per-call decision without leaking stack space.

use stabilizer_ir::{
    Constant, Function, FuncRef, GlobalVariableData, GlobalVariableRef, Immediate, Insn, InsnData,
    Linkage, Module, Signature, Type,
};
use smallvec::smallvec;
use tracing::debug;

/// Intrinsic returning the current stack pointer.
pub const STACKSAVE: &str = "stacksave";

/// Intrinsic installing a previously saved stack pointer.
pub const STACKRESTORE: &str = "stackrestore";

/// Required stack alignment; the pad byte is scaled by this.
pub const STACK_ALIGN: u64 = 16;

/// Creates the function's single-byte pad global, named after it.
pub fn make_stack_pad(module: &mut Module, func: FuncRef) -> GlobalVariableRef {
    let symbol = format!("{}.stack_pad", module.funcs[func].sig.name());
    module.globals.make_gv(GlobalVariableData::new(
        symbol,
        Type::I8,
        Linkage::Private,
        false,
        Some(Constant::Int(Immediate::I8(0))),
    ))
}

/// Brackets every call site in `func` with a padded stack-save/restore
/// pair. Returns the number of call sites rewritten.
pub fn randomize_stack(module: &mut Module, func: FuncRef, pad: GlobalVariableRef) -> usize {
    let (stacksave, stackrestore) = stack_intrinsics(module);

    // Snapshot the call sites first; the bracket inserts calls of its own.
    let calls: Vec<Insn> = {
        let f = &module.funcs[func];
        f.layout
            .iter_block()
            .flat_map(|block| f.layout.iter_insn(block))
            .filter(|insn| f.dfg.insn(*insn).is_call())
            .collect()
    };

    debug!(
        func = module.funcs[func].sig.name(),
        call_sites = calls.len(),
        "bracketing call sites with stack pads"
    );

    let intptr = module.intptr_ty();
    let i8p = Type::make_ptr(Type::I8);
    let ptr_width = module.ptr_width;

    for call in &calls {
        let f = &mut module.funcs[func];
        let call = *call;

        let pad_addr = f.dfg.make_constant_value(Constant::Global(pad), i8p.clone());
        let align = f.dfg.make_imm_value(Immediate::iptr(STACK_ALIGN, ptr_width));

        let pad_byte = emit_before(
            f,
            call,
            InsnData::Load {
                args: [pad_addr],
                ty: Type::I8,
            },
        )
        .unwrap();
        let wide_pad = emit_before(
            f,
            call,
            InsnData::Cast {
                code: stabilizer_ir::CastOp::Zext,
                args: [pad_byte],
                ty: intptr.clone(),
            },
        )
        .unwrap();
        let pad_size = emit_before(
            f,
            call,
            InsnData::Binary {
                code: stabilizer_ir::BinaryOp::Mul,
                args: [wide_pad, align],
            },
        )
        .unwrap();

        let saved = emit_before(
            f,
            call,
            InsnData::Call {
                func: stacksave,
                args: smallvec![],
                ret_ty: i8p.clone(),
            },
        )
        .unwrap();
        let saved_int = emit_before(
            f,
            call,
            InsnData::Cast {
                code: stabilizer_ir::CastOp::PtrToInt,
                args: [saved],
                ty: intptr.clone(),
            },
        )
        .unwrap();
        let adjusted_int = emit_before(
            f,
            call,
            InsnData::Binary {
                code: stabilizer_ir::BinaryOp::Sub,
                args: [saved_int, pad_size],
            },
        )
        .unwrap();
        let adjusted = emit_before(
            f,
            call,
            InsnData::Cast {
                code: stabilizer_ir::CastOp::IntToPtr,
                args: [adjusted_int],
                ty: i8p.clone(),
            },
        )
        .unwrap();

        emit_before(
            f,
            call,
            InsnData::Call {
                func: stackrestore,
                args: smallvec![adjusted],
                ret_ty: Type::Unit,
            },
        );

        // Reinstall the original pointer right after the call returns.
        let restore = f.dfg.make_insn(InsnData::Call {
            func: stackrestore,
            args: smallvec![saved],
            ret_ty: Type::Unit,
        });
        f.layout.insert_insn_after(restore, call);
    }

    calls.len()
}

/// Declarations of the stack-save/restore intrinsics, created on demand.
fn stack_intrinsics(module: &mut Module) -> (FuncRef, FuncRef) {
    let i8p = Type::make_ptr(Type::I8);
    let stacksave = module.declare_intrinsic(Signature::new(
        STACKSAVE,
        Linkage::External,
        &[],
        i8p.clone(),
    ));
    let stackrestore = module.declare_intrinsic(Signature::new(
        STACKRESTORE,
        Linkage::External,
        &[i8p],
        Type::Unit,
    ));
    (stacksave, stackrestore)
}

fn emit_before(func: &mut Function, before: Insn, data: InsnData) -> Option<stabilizer_ir::ValueId> {
    let insn = func.dfg.make_insn(data);
    func.layout.insert_insn_before(insn, before);
    let result = func.dfg.make_result(insn)?;
    let value = func.dfg.make_value(result);
    func.dfg.attach_result(insn, value);
    Some(value)
}

#[cfg(test)]
mod tests {
    use stabilizer_ir::builder::ModuleBuilder;
    use stabilizer_triple::TargetTriple;

    use super::*;

    #[test]
    fn call_site_is_bracketed() {
        let mut builder = ModuleBuilder::new(TargetTriple::parse("x86_64-unknown-linux").unwrap());
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
        let pad = make_stack_pad(&mut module, caller);
        assert_eq!(randomize_stack(&mut module, caller, pad), 1);

        assert!(module.globals.gv_by_symbol("caller.stack_pad").is_some());

        let stacksave = module.func_by_name(STACKSAVE).unwrap();
        let stackrestore = module.func_by_name(STACKRESTORE).unwrap();
        assert!(module.is_intrinsic(stacksave));

        let f = &module.funcs[caller];
        let insns: Vec<_> = f.layout.iter_insn(entry).collect();
        let calls_to = |target| {
            insns
                .iter()
                .filter(|i| f.dfg.insn(**i).callee() == Some(target))
                .count()
        };
        assert_eq!(calls_to(stacksave), 1);
        assert_eq!(calls_to(stackrestore), 2);
        assert_eq!(calls_to(callee), 1);

        // The second restore reinstalls the pointer saved by stacksave,
        // and it comes after the original call.
        let call_pos = insns
            .iter()
            .position(|i| f.dfg.insn(*i).callee() == Some(callee))
            .unwrap();
        let save_pos = insns
            .iter()
            .position(|i| f.dfg.insn(*i).callee() == Some(stacksave))
            .unwrap();
        let saved_value = f.dfg.insn_result(insns[save_pos]).unwrap();
        let post_restore = insns[call_pos + 1];
        let restored_with = f.dfg.insn(post_restore).args();
        assert_eq!(f.dfg.insn(post_restore).callee(), Some(stackrestore));
        assert_eq!(restored_with.as_slice(), &[saved_value]);
    }

    #[test]
    fn function_without_calls_is_untouched() {
        let mut builder = ModuleBuilder::new(TargetTriple::parse("x86_64-unknown-linux").unwrap());
        let leaf =
            builder.declare_function(Signature::new("leaf", Linkage::Public, &[], Type::Unit));
        let mut fb = builder.func_builder(leaf);
        let entry = fb.append_block();
        fb.switch_to_block(entry);
        fb.ret(None);

        let mut module = builder.build();
        let pad = make_stack_pad(&mut module, leaf);
        assert_eq!(randomize_stack(&mut module, leaf, pad), 0);

        let f = &module.funcs[leaf];
        assert_eq!(f.layout.iter_insn(entry).count(), 1);
    }
}
