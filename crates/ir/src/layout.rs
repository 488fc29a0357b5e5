//! Function layout: the order of blocks within a function and of
//! instructions within a block, kept as doubly-linked lists over entity
//! maps so insertion next to an existing node is O(1).

use cranelift_entity::SecondaryMap;

use crate::{dfg::Block, insn::Insn};

#[derive(Debug, Clone, Default)]
pub struct Layout {
    blocks: SecondaryMap<Block, BlockNode>,
    insns: SecondaryMap<Insn, InsnNode>,
    entry_block: Option<Block>,
    last_block: Option<Block>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_block(&self) -> Option<Block> {
        self.entry_block
    }

    pub fn last_block(&self) -> Option<Block> {
        self.last_block
    }

    /// A function whose layout holds no blocks is a declaration.
    pub fn is_empty(&self) -> bool {
        self.entry_block.is_none()
    }

    pub fn is_block_inserted(&self, block: Block) -> bool {
        Some(block) == self.entry_block || self.blocks[block] != BlockNode::default()
    }

    pub fn is_insn_inserted(&self, insn: Insn) -> bool {
        self.insns[insn] != InsnNode::default()
    }

    pub fn first_insn_of(&self, block: Block) -> Option<Insn> {
        debug_assert!(self.is_block_inserted(block));
        self.blocks[block].first_insn
    }

    pub fn last_insn_of(&self, block: Block) -> Option<Insn> {
        debug_assert!(self.is_block_inserted(block));
        self.blocks[block].last_insn
    }

    pub fn prev_insn_of(&self, insn: Insn) -> Option<Insn> {
        debug_assert!(self.is_insn_inserted(insn));
        self.insns[insn].prev
    }

    pub fn next_insn_of(&self, insn: Insn) -> Option<Insn> {
        debug_assert!(self.is_insn_inserted(insn));
        self.insns[insn].next
    }

    pub fn insn_block(&self, insn: Insn) -> Block {
        debug_assert!(self.is_insn_inserted(insn));
        self.insns[insn].block.unwrap()
    }

    pub fn next_block_of(&self, block: Block) -> Option<Block> {
        debug_assert!(self.is_block_inserted(block));
        self.blocks[block].next
    }

    pub fn iter_block(&self) -> impl Iterator<Item = Block> + '_ {
        std::iter::successors(self.entry_block, |block| self.blocks[*block].next)
    }

    pub fn iter_insn(&self, block: Block) -> impl Iterator<Item = Insn> + '_ {
        debug_assert!(self.is_block_inserted(block));
        std::iter::successors(self.blocks[block].first_insn, |insn| self.insns[*insn].next)
    }

    pub fn append_block(&mut self, block: Block) {
        debug_assert!(!self.is_block_inserted(block));

        let mut node = BlockNode::default();
        if let Some(last) = self.last_block {
            self.blocks[last].next = Some(block);
            node.prev = Some(last);
        } else {
            self.entry_block = Some(block);
        }

        self.blocks[block] = node;
        self.last_block = Some(block);
    }

    pub fn append_insn(&mut self, insn: Insn, block: Block) {
        debug_assert!(self.is_block_inserted(block));
        debug_assert!(!self.is_insn_inserted(insn));

        let block_node = &mut self.blocks[block];
        let mut node = InsnNode::with_block(block);

        if let Some(last) = block_node.last_insn {
            node.prev = Some(last);
            self.insns[last].next = Some(insn);
        } else {
            block_node.first_insn = Some(insn);
        }

        block_node.last_insn = Some(insn);
        self.insns[insn] = node;
    }

    pub fn prepend_insn(&mut self, insn: Insn, block: Block) {
        debug_assert!(self.is_block_inserted(block));
        debug_assert!(!self.is_insn_inserted(insn));

        let block_node = &mut self.blocks[block];
        let mut node = InsnNode::with_block(block);

        if let Some(first) = block_node.first_insn {
            node.next = Some(first);
            self.insns[first].prev = Some(insn);
        } else {
            block_node.last_insn = Some(insn);
        }

        block_node.first_insn = Some(insn);
        self.insns[insn] = node;
    }

    pub fn insert_insn_before(&mut self, insn: Insn, before: Insn) {
        debug_assert!(self.is_insn_inserted(before));
        debug_assert!(!self.is_insn_inserted(insn));

        let block = self.insns[before].block.unwrap();
        let mut node = InsnNode::with_block(block);

        match self.insns[before].prev {
            Some(prev) => {
                node.prev = Some(prev);
                self.insns[prev].next = Some(insn);
            }
            None => self.blocks[block].first_insn = Some(insn),
        }
        node.next = Some(before);
        self.insns[before].prev = Some(insn);
        self.insns[insn] = node;
    }

    pub fn insert_insn_after(&mut self, insn: Insn, after: Insn) {
        debug_assert!(self.is_insn_inserted(after));
        debug_assert!(!self.is_insn_inserted(insn));

        let block = self.insns[after].block.unwrap();
        let mut node = InsnNode::with_block(block);

        match self.insns[after].next {
            Some(next) => {
                node.next = Some(next);
                self.insns[next].prev = Some(insn);
            }
            None => self.blocks[block].last_insn = Some(insn),
        }
        node.prev = Some(after);
        self.insns[after].next = Some(insn);
        self.insns[insn] = node;
    }

    pub fn remove_insn(&mut self, insn: Insn) {
        debug_assert!(self.is_insn_inserted(insn));

        let node = self.insns[insn].clone();
        let block_node = &mut self.blocks[node.block.unwrap()];
        match (node.prev, node.next) {
            (Some(prev), Some(next)) => {
                self.insns[prev].next = Some(next);
                self.insns[next].prev = Some(prev);
            }
            (Some(prev), None) => {
                self.insns[prev].next = None;
                block_node.last_insn = Some(prev);
            }
            (None, Some(next)) => {
                self.insns[next].prev = None;
                block_node.first_insn = Some(next);
            }
            (None, None) => {
                block_node.first_insn = None;
                block_node.last_insn = None;
            }
        }

        self.insns[insn] = InsnNode::default();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BlockNode {
    prev: Option<Block>,
    next: Option<Block>,
    first_insn: Option<Insn>,
    last_insn: Option<Insn>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct InsnNode {
    block: Option<Block>,
    prev: Option<Insn>,
    next: Option<Insn>,
}

impl InsnNode {
    fn with_block(block: Block) -> Self {
        Self {
            block: Some(block),
            prev: None,
            next: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dfg::DataFlowGraph,
        insn::{BinaryOp, InsnData},
    };

    fn dummy_insn(dfg: &mut DataFlowGraph) -> Insn {
        let lhs = dfg.make_imm_value(1i32);
        let rhs = dfg.make_imm_value(2i32);
        dfg.make_insn(InsnData::Binary {
            code: BinaryOp::Add,
            args: [lhs, rhs],
        })
    }

    #[test]
    fn block_order() {
        let mut dfg = DataFlowGraph::new();
        let mut layout = Layout::new();

        let b1 = dfg.make_block();
        let b2 = dfg.make_block();
        layout.append_block(b1);
        layout.append_block(b2);

        assert_eq!(layout.entry_block(), Some(b1));
        assert_eq!(layout.last_block(), Some(b2));
        assert_eq!(layout.iter_block().collect::<Vec<_>>(), vec![b1, b2]);
    }

    #[test]
    fn insn_insertion_around_existing() {
        let mut dfg = DataFlowGraph::new();
        let mut layout = Layout::new();
        let block = dfg.make_block();
        layout.append_block(block);

        let i1 = dummy_insn(&mut dfg);
        let i2 = dummy_insn(&mut dfg);
        layout.append_insn(i1, block);
        layout.append_insn(i2, block);

        // i1 -> i3 -> i2
        let i3 = dummy_insn(&mut dfg);
        layout.insert_insn_after(i3, i1);
        assert_eq!(layout.iter_insn(block).collect::<Vec<_>>(), vec![i1, i3, i2]);

        // i0 -> i1 -> i3 -> i2
        let i0 = dummy_insn(&mut dfg);
        layout.insert_insn_before(i0, i1);
        assert_eq!(layout.first_insn_of(block), Some(i0));
        assert_eq!(
            layout.iter_insn(block).collect::<Vec<_>>(),
            vec![i0, i1, i3, i2]
        );
    }

    #[test]
    fn insn_removal_relinks_neighbors() {
        let mut dfg = DataFlowGraph::new();
        let mut layout = Layout::new();
        let block = dfg.make_block();
        layout.append_block(block);

        let i1 = dummy_insn(&mut dfg);
        let i2 = dummy_insn(&mut dfg);
        let i3 = dummy_insn(&mut dfg);
        layout.append_insn(i1, block);
        layout.append_insn(i2, block);
        layout.append_insn(i3, block);

        layout.remove_insn(i2);
        assert_eq!(layout.iter_insn(block).collect::<Vec<_>>(), vec![i1, i3]);
        assert_eq!(layout.next_insn_of(i1), Some(i3));
        assert_eq!(layout.prev_insn_of(i3), Some(i1));

        layout.remove_insn(i1);
        layout.remove_insn(i3);
        assert_eq!(layout.first_insn_of(block), None);
        assert_eq!(layout.last_insn_of(block), None);
    }
}
