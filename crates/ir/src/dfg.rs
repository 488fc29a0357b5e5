//! Data flow graph: arenas for blocks, values, and instructions, plus the
//! interning caches and use tracking the transform relies on.

use std::collections::BTreeSet;

use cranelift_entity::{packed_option::PackedOption, PrimaryMap, SecondaryMap};
use rustc_hash::FxHashMap;

use crate::{
    constant::Constant,
    insn::{Insn, InsnData},
    module::FuncRef,
    types::Type,
    value::{Immediate, Value, ValueId},
};

/// An opaque reference to a basic block.
#[derive(Clone, PartialEq, Eq, Copy, Hash, PartialOrd, Ord)]
pub struct Block(pub u32);
cranelift_entity::entity_impl!(Block, "block");

/// Block data holds no ordering information; block and instruction order
/// live in [`crate::Layout`].
#[derive(Debug, Clone, Default)]
pub struct BlockData {}

#[derive(Debug)]
pub struct DataFlowGraph {
    #[doc(hidden)]
    pub blocks: PrimaryMap<Block, BlockData>,
    #[doc(hidden)]
    pub values: PrimaryMap<ValueId, Value>,
    insns: PrimaryMap<Insn, InsnData>,
    insn_results: SecondaryMap<Insn, PackedOption<ValueId>>,
    immediates: FxHashMap<Immediate, ValueId>,
    constants: FxHashMap<Constant, ValueId>,
    users: SecondaryMap<ValueId, BTreeSet<Insn>>,
}

impl DataFlowGraph {
    pub fn new() -> Self {
        Self {
            blocks: PrimaryMap::default(),
            values: PrimaryMap::default(),
            insns: PrimaryMap::default(),
            insn_results: SecondaryMap::default(),
            immediates: FxHashMap::default(),
            constants: FxHashMap::default(),
            users: SecondaryMap::default(),
        }
    }

    pub fn make_block(&mut self) -> Block {
        self.blocks.push(BlockData::default())
    }

    pub fn make_value(&mut self, value: Value) -> ValueId {
        self.values.push(value)
    }

    pub fn make_insn(&mut self, data: InsnData) -> Insn {
        let insn = self.insns.push(data);
        self.attach_user(insn);
        insn
    }

    /// Returns the interned value for an integer immediate.
    pub fn make_imm_value<Imm>(&mut self, imm: Imm) -> ValueId
    where
        Imm: Into<Immediate>,
    {
        let imm: Immediate = imm.into();
        if let Some(&value) = self.immediates.get(&imm) {
            return value;
        }

        let ty = imm.ty();
        let value = self.make_value(Value::Immediate { imm, ty });
        self.immediates.insert(imm, value);
        value
    }

    /// Returns the interned value for a materialized constant. Two equal
    /// constants share one value, so distinctness of collected constants is
    /// value identity.
    pub fn make_constant_value(&mut self, constant: Constant, ty: Type) -> ValueId {
        if let Some(&value) = self.constants.get(&constant) {
            return value;
        }

        let value = self.make_value(Value::Constant {
            constant: constant.clone(),
            ty,
        });
        self.constants.insert(constant, value);
        value
    }

    pub fn insn(&self, insn: Insn) -> &InsnData {
        &self.insns[insn]
    }

    /// Replaces the data of `insn` in place, keeping its identity and
    /// result value. Use tracking is updated for both the old and the new
    /// operands.
    pub fn replace_insn(&mut self, insn: Insn, data: InsnData) {
        self.untrack_insn(insn);
        self.insns[insn] = data;
        self.attach_user(insn);
    }

    /// Retargets a single operand slot of `insn` (visit order) to `new`.
    pub fn rewrite_insn_arg(&mut self, insn: Insn, slot: usize, new: ValueId) {
        self.untrack_insn(insn);
        self.insns[insn].rewrite_arg(slot, new);
        self.attach_user(insn);
    }

    pub fn value(&self, value: ValueId) -> &Value {
        &self.values[value]
    }

    pub fn value_ty(&self, value: ValueId) -> Type {
        match &self.values[value] {
            Value::Inst { ty, .. }
            | Value::Arg { ty, .. }
            | Value::Immediate { ty, .. }
            | Value::Constant { ty, .. }
            | Value::Undef { ty } => ty.clone(),
        }
    }

    /// The constant integer behind a value, if it is one.
    pub fn value_as_const_int(&self, value: ValueId) -> Option<i64> {
        match &self.values[value] {
            Value::Immediate { imm, .. } => Some(imm.as_i64()),
            Value::Constant {
                constant: Constant::Int(imm),
                ..
            } => Some(imm.as_i64()),
            _ => None,
        }
    }

    pub fn attach_user(&mut self, insn: Insn) {
        let data = &self.insns[insn];
        let mut used = Vec::new();
        data.visit_args(&mut |value| used.push(value));
        for value in used {
            self.users[value].insert(insn);
        }
    }

    pub fn untrack_insn(&mut self, insn: Insn) {
        let data = &self.insns[insn];
        let mut used = Vec::new();
        data.visit_args(&mut |value| used.push(value));
        for value in used {
            self.users[value].remove(&insn);
        }
    }

    /// Instructions using `value`.
    pub fn users(&self, value: ValueId) -> impl Iterator<Item = &Insn> {
        self.users[value].iter()
    }

    pub fn users_num(&self, value: ValueId) -> usize {
        self.users[value].len()
    }

    /// Creates (but does not attach) the result value of `insn`.
    pub fn make_result(&mut self, insn: Insn) -> Option<Value> {
        let ty = self.insns[insn].result_type(self)?;
        Some(Value::Inst { insn, ty })
    }

    pub fn attach_result(&mut self, insn: Insn, value: ValueId) {
        debug_assert!(self.insn_results[insn].is_none());
        self.insn_results[insn] = value.into();
    }

    pub fn insn_result(&self, insn: Insn) -> Option<ValueId> {
        self.insn_results[insn].expand()
    }

    /// Rewrites every use of `value` to `alias`.
    pub fn change_to_alias(&mut self, value: ValueId, alias: ValueId) {
        let users = std::mem::take(&mut self.users[value]);
        for insn in &users {
            self.insns[*insn].visit_args_mut(&mut |arg| {
                if *arg == value {
                    *arg = alias;
                }
            });
        }
        self.users[alias].extend(users);
    }

    /// Redirects every reference to `old` to `new`: direct call targets and
    /// function addresses embedded in materialized constants.
    pub fn replace_func_refs(&mut self, old: FuncRef, new: FuncRef) {
        for data in self.insns.values_mut() {
            if let InsnData::Call { func, .. } = data {
                if *func == old {
                    *func = new;
                }
            }
        }

        let mut rewritten = Vec::new();
        for (value, data) in self.values.iter_mut() {
            if let Value::Constant { constant, .. } = data {
                let before = constant.clone();
                if constant.replace_func(old, new) {
                    rewritten.push((value, before, constant.clone()));
                }
            }
        }

        // Re-key the interning cache for the rewritten constants.
        for (value, before, after) in rewritten {
            if self.constants.get(&before) == Some(&value) {
                self.constants.remove(&before);
            }
            self.constants.entry(after).or_insert(value);
        }
    }

    /// Number of direct call sites targeting `func`.
    pub fn call_sites_of(&self, func: FuncRef) -> usize {
        self.insns
            .values()
            .filter(|data| data.callee() == Some(func))
            .count()
    }
}

impl Default for DataFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}
