//! Floating-point extraction.
//!
//! Integer/float conversions and float literals both make the back end
//! materialize constants in a per-function constant pool, reached through
//! PC-relative loads the randomizer cannot see. Conversions are pulled out
//! into tiny converter functions that stay at fixed addresses; literals are
//! hoisted into named read-only globals so the reference becomes an
//! ordinary load that later rewriting can redirect.

use smallvec::smallvec;
use stabilizer_ir::{
    CastOp, Constant, FuncRef, GlobalVariableData, Insn, InsnData, Linkage, Module, Signature,
    Type, Value, builder::FunctionBuilder,
};
use stabilizer_triple::Architecture;
use tracing::debug;

/// Replaces the conversion instructions in `func` with converter calls and
/// hoists float-literal operands into `fconst` globals.
pub fn extract_float_operations(module: &mut Module, func: FuncRef) {
    let powerpc = module.triple.architecture == Architecture::PowerPc;

    let insns: Vec<Insn> = {
        let f = &module.funcs[func];
        f.layout
            .iter_block()
            .flat_map(|block| f.layout.iter_insn(block))
            .collect()
    };

    for insn in insns {
        let data = module.funcs[func].dfg.insn(insn).clone();

        match data {
            InsnData::Cast { code, args, ty }
                if code.is_int_float_conversion() || (code == CastOp::FpTrunc && powerpc) =>
            {
                let in_ty = module.funcs[func].dfg.value_ty(args[0]);
                let converter = float_converter(module, code, &in_ty, &ty);
                module.funcs[func].dfg.replace_insn(
                    insn,
                    InsnData::Call {
                        func: converter,
                        args: smallvec![args[0]],
                        ret_ty: ty,
                    },
                );
            }
            data => {
                hoist_float_literals(module, func, insn, &data);
            }
        }
    }
}

/// Replaces every float-bearing constant operand of `insn` with a load
/// from a fresh read-only global. Loads for phi operands land on the
/// incoming edge's terminator, never between phis.
fn hoist_float_literals(module: &mut Module, func: FuncRef, insn: Insn, data: &InsnData) {
    for (slot, value) in data.args().iter().enumerate() {
        let (constant, ty) = match module.funcs[func].dfg.value(*value) {
            Value::Constant { constant, ty } if constant.contains_float() => {
                (constant.clone(), ty.clone())
            }
            _ => continue,
        };

        let gv = module.globals.make_gv_uniqued(
            "fconst",
            GlobalVariableData::constant(String::new(), ty.clone(), Linkage::Private, constant),
        );

        let point = if data.is_phi() {
            let incoming = data.phi_incoming_block(slot);
            module.funcs[func]
                .layout
                .last_insn_of(incoming)
                .expect("phi predecessor must end in a terminator")
        } else {
            insn
        };

        let f = &mut module.funcs[func];
        let addr = f
            .dfg
            .make_constant_value(Constant::Global(gv), Type::make_ptr(ty.clone()));
        let load = f.dfg.make_insn(InsnData::Load {
            args: [addr],
            ty: ty.clone(),
        });
        f.layout.insert_insn_before(load, point);
        let result = f.dfg.make_result(load).unwrap();
        let result = f.dfg.make_value(result);
        f.dfg.attach_result(load, result);

        f.dfg.rewrite_insn_arg(insn, slot, result);
    }
}

/// Returns the module's converter function for the given conversion,
/// synthesizing it on first request. The name encodes the opcode and the
/// operand types, so each distinct conversion is built exactly once.
///
/// Asking for a converter with a non-conversion opcode is a programmer
/// error and aborts.
pub fn float_converter(module: &mut Module, code: CastOp, in_ty: &Type, out_ty: &Type) -> FuncRef {
    match code {
        CastOp::FpToUi | CastOp::FpToSi | CastOp::UiToFp | CastOp::SiToFp | CastOp::FpTrunc => {}
        _ => panic!(
            "invalid float conversion: opcode `{}`, in `{in_ty}`, out `{out_ty}`",
            code.as_str()
        ),
    }

    let name = format!("{}.{in_ty}.{out_ty}", code.as_str());
    if let Some(existing) = module.func_by_name(&name) {
        return existing;
    }

    debug!(converter = %name, "synthesizing float converter");
    let converter = module.declare_function(Signature::new(
        &name,
        Linkage::Private,
        &[in_ty.clone()],
        out_ty.clone(),
    ));

    let mut fb = FunctionBuilder::new(module, converter);
    let entry = fb.append_block();
    fb.switch_to_block(entry);
    let arg = fb.arg_value(0);
    let converted = fb.cast(code, arg, out_ty.clone());
    fb.ret(Some(converted));

    converter
}
