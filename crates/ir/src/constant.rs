//! Materialized constants.
//!
//! A constant is a closed tree over a small set of node kinds: literals,
//! null pointers, symbol addresses, aggregates, and pointer casts. Walks
//! over this tree are plain structural recursion.

use std::fmt;

use crate::{
    global_variable::GlobalVariableRef,
    module::{FuncRef, Module},
    types::Type,
    value::Immediate,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// An integer literal.
    Int(Immediate),

    /// A floating-point literal.
    Float(FloatImm),

    /// A null pointer of the given pointer type.
    Null(Type),

    /// The address of a global variable.
    Global(GlobalVariableRef),

    /// The address of a function.
    FuncAddr(FuncRef),

    Array(Vec<Constant>),

    Struct(Vec<Constant>),

    /// A constant pointer cast to the given pointer type.
    PtrCast(Box<Constant>, Type),
}

impl Constant {
    pub fn ptr_cast(inner: Constant, ty: Type) -> Self {
        Self::PtrCast(inner.into(), ty)
    }

    /// The type of the constant. Symbol addresses need the module to
    /// resolve the pointee type.
    pub fn ty(&self, module: &Module) -> Type {
        match self {
            Self::Int(imm) => imm.ty(),
            Self::Float(FloatImm::F32(_)) => Type::F32,
            Self::Float(FloatImm::F64(_)) => Type::F64,
            Self::Null(ty) => ty.clone(),
            Self::Global(gv) => Type::make_ptr(module.globals.ty(*gv).clone()),
            Self::FuncAddr(func) => {
                let sig = &module.funcs[*func].sig;
                Type::make_ptr(Type::make_func(sig.args().to_vec(), sig.ret_ty().clone()))
            }
            Self::Array(elems) => {
                let elem_ty = elems.first().map(|e| e.ty(module)).unwrap_or_default();
                Type::make_array(elem_ty, elems.len())
            }
            Self::Struct(fields) => Type::Struct(fields.iter().map(|f| f.ty(module)).collect()),
            Self::PtrCast(_, ty) => ty.clone(),
        }
    }

    /// Returns `true` if the constant is or contains a floating-point
    /// literal.
    pub fn contains_float(&self) -> bool {
        match self {
            Self::Float(_) => true,
            Self::Int(_) | Self::Null(_) | Self::Global(_) | Self::FuncAddr(_) => false,
            Self::Array(elems) | Self::Struct(elems) => elems.iter().any(Self::contains_float),
            Self::PtrCast(inner, _) => inner.contains_float(),
        }
    }

    /// Invokes `f` for every global or function address contained in the
    /// constant, in tree order.
    pub fn walk_symbols(&self, f: &mut dyn FnMut(SymbolRef)) {
        match self {
            Self::Global(gv) => f(SymbolRef::Global(*gv)),
            Self::FuncAddr(func) => f(SymbolRef::Func(*func)),
            Self::Int(_) | Self::Float(_) | Self::Null(_) => {}
            Self::Array(elems) | Self::Struct(elems) => {
                for elem in elems {
                    elem.walk_symbols(f);
                }
            }
            Self::PtrCast(inner, _) => inner.walk_symbols(f),
        }
    }

    /// Redirects every embedded address of `old` to `new`. Returns `true`
    /// if anything changed.
    pub fn replace_func(&mut self, old: FuncRef, new: FuncRef) -> bool {
        match self {
            Self::FuncAddr(func) if *func == old => {
                *func = new;
                true
            }
            Self::Array(elems) | Self::Struct(elems) => {
                let mut changed = false;
                for elem in elems {
                    changed |= elem.replace_func(old, new);
                }
                changed
            }
            Self::PtrCast(inner, _) => inner.replace_func(old, new),
            _ => false,
        }
    }
}

impl From<Immediate> for Constant {
    fn from(imm: Immediate) -> Self {
        Self::Int(imm)
    }
}

impl From<FloatImm> for Constant {
    fn from(imm: FloatImm) -> Self {
        Self::Float(imm)
    }
}

/// A reference to a symbol-addressed entity embedded in a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolRef {
    Global(GlobalVariableRef),
    Func(FuncRef),
}

/// A floating-point literal, keyed by its bit pattern so constants remain
/// hashable and NaN payloads survive a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatImm {
    F32(u32),
    F64(u64),
}

impl FloatImm {
    pub fn from_f32(value: f32) -> Self {
        Self::F32(value.to_bits())
    }

    pub fn from_f64(value: f64) -> Self {
        Self::F64(value.to_bits())
    }

    pub fn ty(&self) -> Type {
        match self {
            Self::F32(_) => Type::F32,
            Self::F64(_) => Type::F64,
        }
    }
}

impl fmt::Display for FloatImm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::F32(bits) => write!(f, "{}", f32::from_bits(*bits)),
            Self::F64(bits) => write!(f, "{}", f64::from_bits(*bits)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_detection_recurses_through_aggregates() {
        let c = Constant::Struct(vec![
            Constant::Int(Immediate::I32(1)),
            Constant::Array(vec![Constant::Float(FloatImm::from_f64(2.5))]),
        ]);
        assert!(c.contains_float());

        let c = Constant::Array(vec![Constant::Int(Immediate::I8(0))]);
        assert!(!c.contains_float());
    }

    #[test]
    fn float_imm_is_bit_keyed() {
        assert_eq!(FloatImm::from_f64(1.5), FloatImm::from_f64(1.5));
        assert_ne!(FloatImm::from_f64(0.0), FloatImm::from_f64(-0.0));
    }
}
