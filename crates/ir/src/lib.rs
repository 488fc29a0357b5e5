pub mod builder;
pub mod constant;
pub mod dfg;
pub mod func_cursor;
pub mod function;
pub mod global_variable;
pub mod insn;
pub mod layout;
pub mod linkage;
pub mod module;
pub mod types;
pub mod value;

pub use constant::{Constant, FloatImm, SymbolRef};
pub use dfg::{Block, BlockData, DataFlowGraph};
pub use function::{Function, Signature};
pub use global_variable::{GlobalVariableData, GlobalVariableRef, GlobalVariableStore};
pub use insn::{BinaryOp, CastOp, Insn, InsnData, UnaryOp};
pub use layout::Layout;
pub use linkage::Linkage;
pub use module::{FuncAttribute, FuncRef, Module, CTOR_TABLE_SYMBOL};
pub use types::Type;
pub use value::{Immediate, Value, ValueId};
