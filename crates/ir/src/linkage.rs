use std::{fmt, str::FromStr};

/// Linkage of symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Linkage {
    /// The symbol is defined in the module and visible outside of it.
    Public,

    #[default]
    /// The symbol is defined in the module and not visible outside of it.
    Private,

    /// The symbol is defined outside of the module.
    External,

    /// The symbol is defined in the module, but the linker may merge it
    /// with an identical definition from another module.
    LinkOnceOdr,
}

impl Linkage {
    pub fn has_definition(self) -> bool {
        !matches!(self, Self::External)
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
            Self::External => write!(f, "external"),
            Self::LinkOnceOdr => write!(f, "linkonce_odr"),
        }
    }
}

impl FromStr for Linkage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "external" => Ok(Self::External),
            "linkonce_odr" => Ok(Self::LinkOnceOdr),
            _ => Err(()),
        }
    }
}
