//! Global variables.

use cranelift_entity::PrimaryMap;
use rustc_hash::FxHashMap;

use crate::{constant::Constant, linkage::Linkage, types::Type};

/// An opaque reference to [`GlobalVariableData`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Copy, Hash)]
pub struct GlobalVariableRef(pub u32);
cranelift_entity::entity_impl!(GlobalVariableRef);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVariableData {
    pub symbol: String,
    pub ty: Type,
    pub linkage: Linkage,
    pub is_const: bool,
    pub init: Option<Constant>,
}

impl GlobalVariableData {
    pub fn new(
        symbol: String,
        ty: Type,
        linkage: Linkage,
        is_const: bool,
        init: Option<Constant>,
    ) -> Self {
        Self {
            symbol,
            ty,
            linkage,
            is_const,
            init,
        }
    }

    pub fn constant(symbol: String, ty: Type, linkage: Linkage, init: Constant) -> Self {
        Self {
            symbol,
            ty,
            linkage,
            is_const: true,
            init: Some(init),
        }
    }
}

/// The module's global variables, keyed by entity handle and addressable by
/// symbol.
///
/// The arena never reuses a handle; a removed global simply stops being
/// reachable through the symbol map and iteration.
#[derive(Debug, Default)]
pub struct GlobalVariableStore {
    gv_data: PrimaryMap<GlobalVariableRef, GlobalVariableData>,
    symbols: FxHashMap<String, GlobalVariableRef>,
}

impl GlobalVariableStore {
    pub fn make_gv(&mut self, gv_data: GlobalVariableData) -> GlobalVariableRef {
        match self.symbols.entry(gv_data.symbol.to_string()) {
            std::collections::hash_map::Entry::Occupied(_) => {
                panic!("duplicate global symbol `{}`", gv_data.symbol);
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                let gv = self.gv_data.push(gv_data);
                entry.insert(gv);
                gv
            }
        }
    }

    /// Creates a global under `base`, suffixing the symbol if `base` is
    /// already taken.
    pub fn make_gv_uniqued(&mut self, base: &str, mut gv_data: GlobalVariableData) -> GlobalVariableRef {
        let mut symbol = base.to_string();
        let mut suffix = 0usize;
        while self.symbols.contains_key(&symbol) {
            suffix += 1;
            symbol = format!("{base}.{suffix}");
        }
        gv_data.symbol = symbol;
        self.make_gv(gv_data)
    }

    pub fn gv_data(&self, gv: GlobalVariableRef) -> &GlobalVariableData {
        &self.gv_data[gv]
    }

    pub fn gv_by_symbol(&self, symbol: &str) -> Option<GlobalVariableRef> {
        self.symbols.get(symbol).copied()
    }

    pub fn init_data(&self, gv: GlobalVariableRef) -> Option<&Constant> {
        self.gv_data[gv].init.as_ref()
    }

    pub fn set_init(&mut self, gv: GlobalVariableRef, init: Constant) {
        self.gv_data[gv].init = Some(init);
    }

    pub fn is_const(&self, gv: GlobalVariableRef) -> bool {
        self.gv_data[gv].is_const
    }

    pub fn ty(&self, gv: GlobalVariableRef) -> &Type {
        &self.gv_data[gv].ty
    }

    pub fn symbol(&self, gv: GlobalVariableRef) -> &str {
        &self.gv_data[gv].symbol
    }

    /// Gives `gv` a new symbol. Panics if the symbol is already taken by a
    /// live global.
    pub fn rename(&mut self, gv: GlobalVariableRef, symbol: &str) {
        assert!(
            !self.symbols.contains_key(symbol),
            "duplicate global symbol `{symbol}`"
        );
        self.symbols.remove(&self.gv_data[gv].symbol);
        self.gv_data[gv].symbol = symbol.to_string();
        self.symbols.insert(symbol.to_string(), gv);
    }

    /// Unlinks `gv` from the store. Its handle stays allocated but the
    /// global no longer appears in iteration or symbol lookup.
    pub fn remove_gv(&mut self, gv: GlobalVariableRef) {
        self.symbols.remove(&self.gv_data[gv].symbol);
    }

    pub fn is_live(&self, gv: GlobalVariableRef) -> bool {
        self.symbols.get(&self.gv_data[gv].symbol) == Some(&gv)
    }

    pub fn iter(&self) -> impl Iterator<Item = GlobalVariableRef> + '_ {
        self.gv_data
            .keys()
            .filter(|gv| self.is_live(*gv))
    }

    pub fn iter_mut_data(&mut self) -> impl Iterator<Item = &mut GlobalVariableData> {
        let symbols = &self.symbols;
        self.gv_data
            .iter_mut()
            .filter(move |(gv, data)| symbols.get(&data.symbol) == Some(gv))
            .map(|(_, data)| data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Immediate;

    fn int_gv(symbol: &str) -> GlobalVariableData {
        GlobalVariableData::constant(
            symbol.to_string(),
            Type::I32,
            Linkage::Private,
            Constant::Int(Immediate::I32(7)),
        )
    }

    #[test]
    fn symbol_lookup() {
        let mut store = GlobalVariableStore::default();
        let gv = store.make_gv(int_gv("seven"));

        assert_eq!(store.gv_by_symbol("seven"), Some(gv));
        assert_eq!(store.ty(gv), &Type::I32);
        assert!(store.is_const(gv));
    }

    #[test]
    fn uniqued_symbols_get_suffixes() {
        let mut store = GlobalVariableStore::default();
        let a = store.make_gv_uniqued("fconst", int_gv("fconst"));
        let b = store.make_gv_uniqued("fconst", int_gv("fconst"));

        assert_eq!(store.symbol(a), "fconst");
        assert_eq!(store.symbol(b), "fconst.1");
    }

    #[test]
    fn removal_hides_the_global() {
        let mut store = GlobalVariableStore::default();
        let gv = store.make_gv(int_gv("doomed"));
        store.remove_gv(gv);

        assert_eq!(store.gv_by_symbol("doomed"), None);
        assert_eq!(store.iter().count(), 0);
    }

    #[test]
    fn rename_moves_the_symbol() {
        let mut store = GlobalVariableStore::default();
        let gv = store.make_gv(int_gv("before"));
        store.rename(gv, "after");

        assert_eq!(store.gv_by_symbol("before"), None);
        assert_eq!(store.gv_by_symbol("after"), Some(gv));
    }
}
