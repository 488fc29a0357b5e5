//! IR instruction definitions.

use smallvec::SmallVec;

use crate::{
    dfg::{Block, DataFlowGraph},
    module::FuncRef,
    types::Type,
    value::ValueId,
};

/// An opaque reference to [`InsnData`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Copy, Hash)]
pub struct Insn(pub u32);
cranelift_entity::entity_impl!(Insn);

/// An instruction data definition.
///
/// Every value operand is an addressable slot: [`InsnData::visit_args_mut`]
/// walks the slots in a stable order, and [`InsnData::rewrite_arg`]
/// retargets a single slot by its position in that order. Phi incoming
/// values are slots like any other; their paired incoming block is
/// recovered with [`InsnData::phi_incoming_block`].
#[derive(Debug, Clone)]
pub enum InsnData {
    /// Unary instruction.
    Unary { code: UnaryOp, args: [ValueId; 1] },

    /// Binary instruction.
    Binary { code: BinaryOp, args: [ValueId; 2] },

    /// Cast operation, including the integer/float conversions.
    Cast {
        code: CastOp,
        args: [ValueId; 1],
        ty: Type,
    },

    /// Load a value of type `ty` from a pointer.
    Load { args: [ValueId; 1], ty: Type },

    /// Store `args[1]` to the pointer `args[0]`.
    Store { args: [ValueId; 2] },

    /// Compute an element pointer. `args[0]` is the base pointer; the
    /// remaining operands are indices. The first index steps over the base
    /// pointer itself, subsequent indices select aggregate members.
    Gep { args: SmallVec<[ValueId; 4]> },

    /// Direct call. The callee is a function reference, not a value
    /// operand; use [`InsnData::callee`] to observe or retarget it.
    Call {
        func: FuncRef,
        args: SmallVec<[ValueId; 4]>,
        ret_ty: Type,
    },

    /// Indirect call through a function pointer in `args[0]`.
    CallIndirect {
        args: SmallVec<[ValueId; 4]>,
        ret_ty: Type,
    },

    /// Unconditional jump.
    Jump { dest: Block },

    /// Conditional branch: `dests[0]` on non-zero, `dests[1]` on zero.
    Branch {
        args: [ValueId; 1],
        dests: [Block; 2],
    },

    /// Phi node over (incoming value, incoming block) pairs.
    Phi {
        args: SmallVec<[(ValueId, Block); 4]>,
        ty: Type,
    },

    /// Return, with an optional value.
    Return { args: Option<ValueId> },
}

impl InsnData {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Jump { .. } | Self::Branch { .. } | Self::Return { .. }
        )
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call { .. } | Self::CallIndirect { .. })
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, Self::Phi { .. })
    }

    /// The target of a direct call.
    pub fn callee(&self) -> Option<FuncRef> {
        match self {
            Self::Call { func, .. } => Some(*func),
            _ => None,
        }
    }

    pub fn visit_args(&self, f: &mut dyn FnMut(ValueId)) {
        match self {
            Self::Unary { args, .. } | Self::Cast { args, .. } | Self::Load { args, .. } => {
                f(args[0])
            }
            Self::Binary { args, .. } | Self::Store { args } => {
                args.iter().copied().for_each(f);
            }
            Self::Gep { args } | Self::Call { args, .. } | Self::CallIndirect { args, .. } => {
                args.iter().copied().for_each(f);
            }
            Self::Branch { args, .. } => f(args[0]),
            Self::Phi { args, .. } => args.iter().for_each(|(value, _)| f(*value)),
            Self::Return { args } => {
                if let Some(value) = args {
                    f(*value)
                }
            }
            Self::Jump { .. } => {}
        }
    }

    pub fn visit_args_mut(&mut self, f: &mut dyn FnMut(&mut ValueId)) {
        match self {
            Self::Unary { args, .. } | Self::Cast { args, .. } | Self::Load { args, .. } => {
                f(&mut args[0])
            }
            Self::Binary { args, .. } | Self::Store { args } => {
                args.iter_mut().for_each(f);
            }
            Self::Gep { args } | Self::Call { args, .. } | Self::CallIndirect { args, .. } => {
                args.iter_mut().for_each(f);
            }
            Self::Branch { args, .. } => f(&mut args[0]),
            Self::Phi { args, .. } => args.iter_mut().for_each(|(value, _)| f(value)),
            Self::Return { args } => {
                if let Some(value) = args {
                    f(value)
                }
            }
            Self::Jump { .. } => {}
        }
    }

    /// Value operands in visit order.
    pub fn args(&self) -> SmallVec<[ValueId; 4]> {
        let mut args = SmallVec::new();
        self.visit_args(&mut |value| args.push(value));
        args
    }

    /// Retargets the `slot`-th value operand (visit order) to `new`.
    pub fn rewrite_arg(&mut self, slot: usize, new: ValueId) {
        let mut idx = 0;
        let mut rewritten = false;
        self.visit_args_mut(&mut |value| {
            if idx == slot {
                *value = new;
                rewritten = true;
            }
            idx += 1;
        });
        assert!(rewritten, "operand slot {slot} out of range");
    }

    /// The incoming block paired with the `slot`-th operand of a phi.
    pub fn phi_incoming_block(&self, slot: usize) -> Block {
        match self {
            Self::Phi { args, .. } => args[slot].1,
            _ => panic!("phi incoming block requested for a non-phi instruction"),
        }
    }

    /// The type of the instruction's result, or `None` for instructions
    /// that produce no value.
    pub fn result_type(&self, dfg: &DataFlowGraph) -> Option<Type> {
        match self {
            Self::Unary { args, .. } => Some(dfg.value_ty(args[0])),
            Self::Binary { code, args } => Some(code.result_type(dfg, args)),
            Self::Cast { ty, .. } | Self::Load { ty, .. } => Some(ty.clone()),
            Self::Gep { args } => Some(gep_result_type(dfg, args)),
            Self::Call { ret_ty, .. } | Self::CallIndirect { ret_ty, .. } => {
                (*ret_ty != Type::Unit).then(|| ret_ty.clone())
            }
            Self::Phi { ty, .. } => Some(ty.clone()),
            Self::Store { .. } | Self::Jump { .. } | Self::Branch { .. } | Self::Return { .. } => {
                None
            }
        }
    }
}

/// Computes the pointer type produced by a `Gep`.
///
/// Struct member selection requires a constant index; anything else is a
/// malformed instruction and aborts.
fn gep_result_type(dfg: &DataFlowGraph, args: &[ValueId]) -> Type {
    let base_ty = dfg.value_ty(args[0]);
    let mut current = base_ty
        .deref()
        .unwrap_or_else(|| panic!("gep base must be a pointer, got `{base_ty}`"))
        .clone();

    for index in &args[2..] {
        current = match current {
            Type::Struct(fields) => {
                let idx = dfg
                    .value_as_const_int(*index)
                    .expect("struct member index must be a constant integer");
                fields
                    .get(idx as usize)
                    .unwrap_or_else(|| panic!("struct member index {idx} out of bounds"))
                    .clone()
            }
            Type::Array { elem, .. } => *elem,
            ty => panic!("cannot index into `{ty}`"),
        };
    }

    Type::make_ptr(current)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Not => "not",
            Self::Neg => "neg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Udiv,
    Sdiv,
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Gt,
    Slt,
    Sgt,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Udiv => "udiv",
            Self::Sdiv => "sdiv",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Slt => "slt",
            Self::Sgt => "sgt",
        }
    }

    fn result_type(self, dfg: &DataFlowGraph, args: &[ValueId; 2]) -> Type {
        match self {
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Udiv
            | Self::Sdiv
            | Self::And
            | Self::Or
            | Self::Xor => dfg.value_ty(args[0]),
            _ => Type::I1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    Sext,
    Zext,
    Trunc,
    Bitcast,
    PtrToInt,
    IntToPtr,
    FpToSi,
    FpToUi,
    SiToFp,
    UiToFp,
    FpTrunc,
    FpExt,
}

impl CastOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sext => "sext",
            Self::Zext => "zext",
            Self::Trunc => "trunc",
            Self::Bitcast => "bitcast",
            Self::PtrToInt => "ptrtoint",
            Self::IntToPtr => "inttoptr",
            Self::FpToSi => "fptosi",
            Self::FpToUi => "fptoui",
            Self::SiToFp => "sitofp",
            Self::UiToFp => "uitofp",
            Self::FpTrunc => "fptrunc",
            Self::FpExt => "fpext",
        }
    }

    /// Returns `true` for the four integer/float conversions that are
    /// always extracted into converter functions.
    pub fn is_int_float_conversion(self) -> bool {
        matches!(
            self,
            Self::FpToSi | Self::FpToUi | Self::SiToFp | Self::UiToFp
        )
    }
}
