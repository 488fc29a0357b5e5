//! Instruction insertion cursors.

use crate::{dfg::Block, function::Function, insn::Insn, insn::InsnData, value::ValueId};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorLocation {
    At(Insn),
    BlockTop(Block),
    BlockBottom(Block),
    #[default]
    NoWhere,
}

/// A movable insertion point inside a function.
///
/// Inserting at `At(insn)` places the new instruction after `insn`;
/// `BlockTop`/`BlockBottom` prepend and append within the block.
pub trait FuncCursor {
    fn at_location(loc: CursorLocation) -> Self;
    fn set_location(&mut self, loc: CursorLocation);
    fn loc(&self) -> CursorLocation;

    fn insert_insn(&mut self, func: &mut Function, insn: Insn) {
        match self.loc() {
            CursorLocation::At(at) => func.layout.insert_insn_after(insn, at),
            CursorLocation::BlockTop(block) => func.layout.prepend_insn(insn, block),
            CursorLocation::BlockBottom(block) => func.layout.append_insn(insn, block),
            CursorLocation::NoWhere => panic!("cursor loc points to `NoWhere`"),
        }
    }

    fn insert_insn_data(&mut self, func: &mut Function, data: InsnData) -> Insn {
        let insn = func.dfg.make_insn(data);
        self.insert_insn(func, insn);
        insn
    }

    fn make_result(&mut self, func: &mut Function, insn: Insn) -> Option<ValueId> {
        let value = func.dfg.make_result(insn)?;
        let value = func.dfg.make_value(value);
        func.dfg.attach_result(insn, value);
        Some(value)
    }

    fn block(&self, func: &Function) -> Option<Block> {
        match self.loc() {
            CursorLocation::At(insn) => Some(func.layout.insn_block(insn)),
            CursorLocation::BlockTop(block) | CursorLocation::BlockBottom(block) => Some(block),
            CursorLocation::NoWhere => None,
        }
    }

    fn proceed(&mut self, func: &Function) {
        let next = match self.loc() {
            CursorLocation::At(insn) => func.layout.next_insn_of(insn).map_or_else(
                || CursorLocation::BlockBottom(func.layout.insn_block(insn)),
                CursorLocation::At,
            ),
            CursorLocation::BlockTop(block) => func
                .layout
                .first_insn_of(block)
                .map_or(CursorLocation::BlockBottom(block), CursorLocation::At),
            CursorLocation::BlockBottom(block) => func
                .layout
                .next_block_of(block)
                .map_or(CursorLocation::NoWhere, CursorLocation::BlockTop),
            CursorLocation::NoWhere => CursorLocation::NoWhere,
        };
        self.set_location(next);
    }
}

/// The plain cursor used by builders and passes.
#[derive(Debug)]
pub struct InsnInserter {
    loc: CursorLocation,
}

impl FuncCursor for InsnInserter {
    fn at_location(loc: CursorLocation) -> Self {
        Self { loc }
    }

    fn set_location(&mut self, loc: CursorLocation) {
        self.loc = loc;
    }

    fn loc(&self) -> CursorLocation {
        self.loc
    }
}
