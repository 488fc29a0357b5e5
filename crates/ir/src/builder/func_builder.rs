use smallvec::SmallVec;

use crate::{
    constant::{Constant, FloatImm},
    dfg::Block,
    func_cursor::{CursorLocation, FuncCursor, InsnInserter},
    insn::{BinaryOp, CastOp, InsnData, UnaryOp},
    module::{FuncRef, Module},
    types::Type,
    value::{Immediate, ValueId},
};

/// Builds a function body one instruction at a time.
///
/// The builder keeps an insertion cursor; each emitted instruction becomes
/// the new cursor position, so straight-line emission appends in order.
pub struct FunctionBuilder<'a> {
    module: &'a mut Module,
    func: FuncRef,
    loc: CursorLocation,
}

macro_rules! impl_unary_insn {
    ($name:ident, $code:path) => {
        pub fn $name(&mut self, lhs: ValueId) -> ValueId {
            let data = InsnData::Unary {
                code: $code,
                args: [lhs],
            };
            self.insert_insn(data).1.unwrap()
        }
    };
}

macro_rules! impl_binary_insn {
    ($name:ident, $code:path) => {
        pub fn $name(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
            let data = InsnData::Binary {
                code: $code,
                args: [lhs, rhs],
            };
            self.insert_insn(data).1.unwrap()
        }
    };
}

impl<'a> FunctionBuilder<'a> {
    pub fn new(module: &'a mut Module, func: FuncRef) -> Self {
        Self {
            module,
            func,
            loc: CursorLocation::NoWhere,
        }
    }

    pub fn func_ref(&self) -> FuncRef {
        self.func
    }

    pub fn module(&mut self) -> &mut Module {
        self.module
    }

    pub fn append_block(&mut self) -> Block {
        let func = &mut self.module.funcs[self.func];
        let block = func.dfg.make_block();
        func.layout.append_block(block);
        block
    }

    pub fn switch_to_block(&mut self, block: Block) {
        self.loc = CursorLocation::BlockBottom(block);
    }

    pub fn arg_value(&self, idx: usize) -> ValueId {
        self.module.funcs[self.func].arg_values[idx]
    }

    pub fn make_imm_value<Imm>(&mut self, imm: Imm) -> ValueId
    where
        Imm: Into<Immediate>,
    {
        self.module.funcs[self.func].dfg.make_imm_value(imm)
    }

    pub fn make_float_value(&mut self, imm: FloatImm) -> ValueId {
        let ty = imm.ty();
        self.make_constant_value_with_ty(Constant::Float(imm), ty)
    }

    /// Materializes a constant, computing its type against the module.
    pub fn make_constant_value(&mut self, constant: Constant) -> ValueId {
        let ty = constant.ty(self.module);
        self.make_constant_value_with_ty(constant, ty)
    }

    fn make_constant_value_with_ty(&mut self, constant: Constant, ty: Type) -> ValueId {
        self.module.funcs[self.func]
            .dfg
            .make_constant_value(constant, ty)
    }

    impl_unary_insn!(not, UnaryOp::Not);
    impl_unary_insn!(neg, UnaryOp::Neg);

    impl_binary_insn!(add, BinaryOp::Add);
    impl_binary_insn!(sub, BinaryOp::Sub);
    impl_binary_insn!(mul, BinaryOp::Mul);
    impl_binary_insn!(udiv, BinaryOp::Udiv);
    impl_binary_insn!(sdiv, BinaryOp::Sdiv);
    impl_binary_insn!(and, BinaryOp::And);
    impl_binary_insn!(or, BinaryOp::Or);
    impl_binary_insn!(eq, BinaryOp::Eq);
    impl_binary_insn!(ne, BinaryOp::Ne);

    pub fn cast(&mut self, code: CastOp, value: ValueId, ty: Type) -> ValueId {
        let data = InsnData::Cast {
            code,
            args: [value],
            ty,
        };
        self.insert_insn(data).1.unwrap()
    }

    pub fn load(&mut self, addr: ValueId, ty: Type) -> ValueId {
        let data = InsnData::Load {
            args: [addr],
            ty,
        };
        self.insert_insn(data).1.unwrap()
    }

    pub fn store(&mut self, addr: ValueId, value: ValueId) {
        let data = InsnData::Store {
            args: [addr, value],
        };
        self.insert_insn(data);
    }

    pub fn gep(&mut self, args: &[ValueId]) -> ValueId {
        let data = InsnData::Gep { args: args.into() };
        self.insert_insn(data).1.unwrap()
    }

    pub fn call(&mut self, func: FuncRef, args: &[ValueId]) -> Option<ValueId> {
        let ret_ty = self.module.funcs[func].sig.ret_ty().clone();
        let data = InsnData::Call {
            func,
            args: args.into(),
            ret_ty,
        };
        self.insert_insn(data).1
    }

    pub fn call_indirect(&mut self, callee: ValueId, args: &[ValueId], ret_ty: Type) -> Option<ValueId> {
        let mut all_args: SmallVec<[ValueId; 4]> = SmallVec::new();
        all_args.push(callee);
        all_args.extend(args.iter().copied());
        let data = InsnData::CallIndirect {
            args: all_args,
            ret_ty,
        };
        self.insert_insn(data).1
    }

    pub fn jump(&mut self, dest: Block) {
        self.insert_insn(InsnData::Jump { dest });
    }

    pub fn branch(&mut self, cond: ValueId, non_zero: Block, zero: Block) {
        self.insert_insn(InsnData::Branch {
            args: [cond],
            dests: [non_zero, zero],
        });
    }

    pub fn phi(&mut self, ty: Type, incoming: &[(ValueId, Block)]) -> ValueId {
        let data = InsnData::Phi {
            args: incoming.into(),
            ty,
        };
        self.insert_insn(data).1.unwrap()
    }

    pub fn ret(&mut self, value: Option<ValueId>) {
        self.insert_insn(InsnData::Return { args: value });
    }

    fn insert_insn(&mut self, data: InsnData) -> (crate::insn::Insn, Option<ValueId>) {
        let func = &mut self.module.funcs[self.func];
        let mut cursor = InsnInserter::at_location(self.loc);
        let insn = cursor.insert_insn_data(func, data);
        let result = cursor.make_result(func, insn);
        self.loc = CursorLocation::At(insn);
        (insn, result)
    }
}

#[cfg(test)]
mod tests {
    use stabilizer_triple::TargetTriple;

    use super::*;
    use crate::{builder::ModuleBuilder, function::Signature, linkage::Linkage};

    #[test]
    fn build_straight_line_function() {
        let triple = TargetTriple::parse("x86_64-unknown-linux").unwrap();
        let mut builder = ModuleBuilder::new(triple);
        let func = builder.declare_function(Signature::new(
            "double_it",
            Linkage::Public,
            &[Type::I32],
            Type::I32,
        ));

        let mut fb = builder.func_builder(func);
        let entry = fb.append_block();
        fb.switch_to_block(entry);
        let arg = fb.arg_value(0);
        let two = fb.make_imm_value(2i32);
        let result = fb.mul(arg, two);
        fb.ret(Some(result));

        let module = builder.build();
        let func = &module.funcs[func];
        let insns: Vec<_> = func
            .layout
            .iter_insn(func.layout.entry_block().unwrap())
            .collect();
        assert_eq!(insns.len(), 2);
        assert!(func.dfg.insn(insns[1]).is_terminator());
        assert_eq!(func.dfg.value_ty(result), Type::I32);
    }
}
