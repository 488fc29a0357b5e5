//! Function and signature definitions.

use std::fmt;

use smallvec::SmallVec;

use crate::{
    dfg::DataFlowGraph,
    layout::Layout,
    linkage::Linkage,
    types::Type,
    value::{Value, ValueId},
};

#[derive(Debug)]
pub struct Function {
    /// Signature of the function.
    pub sig: Signature,
    pub arg_values: SmallVec<[ValueId; 8]>,

    pub dfg: DataFlowGraph,
    pub layout: Layout,
}

impl Function {
    pub fn new(sig: Signature) -> Self {
        let mut dfg = DataFlowGraph::new();
        let arg_values = sig
            .args()
            .iter()
            .enumerate()
            .map(|(idx, arg_ty)| {
                dfg.make_value(Value::Arg {
                    ty: arg_ty.clone(),
                    idx,
                })
            })
            .collect();

        Self {
            sig,
            arg_values,
            dfg,
            layout: Layout::default(),
        }
    }

    /// A function without a body is a declaration.
    pub fn is_declaration(&self) -> bool {
        self.layout.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Name of the function.
    name: String,

    /// Linkage of the function.
    linkage: Linkage,

    args: SmallVec<[Type; 8]>,
    ret_ty: Type,
}

impl Signature {
    pub fn new(name: &str, linkage: Linkage, args: &[Type], ret_ty: Type) -> Self {
        Self {
            name: name.to_string(),
            linkage,
            args: args.into(),
            ret_ty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    pub fn set_linkage(&mut self, linkage: Linkage) {
        self.linkage = linkage;
    }

    pub fn args(&self) -> &[Type] {
        &self.args
    }

    pub fn ret_ty(&self) -> &Type {
        &self.ret_ty
    }

    #[doc(hidden)]
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// The same parameter and return types under a different name and
    /// linkage.
    pub fn clone_as(&self, name: &str, linkage: Linkage) -> Self {
        Self {
            name: name.to_string(),
            linkage,
            args: self.args.clone(),
            ret_ty: self.ret_ty.clone(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "func {} %{}(", self.linkage, self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ") -> {}", self.ret_ty)
    }
}
