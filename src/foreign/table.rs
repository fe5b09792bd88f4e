//! Macro definition table.
//!
//! Entries keep insertion order so that translated macros come out in the
//! order the header defined them.

use indexmap::IndexMap;
use std::fmt;

use super::token::Token;

/// Names the preprocessor defines on its own.
pub const PREDEFINED_MACROS: &[&str] = &[
    "MODULE",
    "MODULE_STRING",
    "FILE",
    "LINE",
    "MACHINE",
    "FUNCTION_NAME",
    "FUNCTION_ARITY",
    "OTP_RELEASE",
];

/// Arity of one macro definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Object-style `-define(NAME, Body).`
    None,
    /// Function-style `-define(NAME(P1, ..., Pn), Body).`
    Fixed(usize),
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::None => write!(f, "none"),
            Arity::Fixed(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    pub params: Vec<String>,
    pub body: Vec<Token>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MacroEntry {
    Undefined,
    Predefined,
    Defined(Vec<(Arity, MacroDef)>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MacroTable {
    entries: IndexMap<String, MacroEntry>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding only the predefined names.
    pub fn with_predefined() -> Self {
        let mut table = Self::new();
        for name in PREDEFINED_MACROS {
            table.entries.insert(name.to_string(), MacroEntry::Predefined);
        }
        table
    }

    /// Adds a definition. A second definition with the same arity replaces
    /// the first in place and returns `true`.
    pub fn define(&mut self, name: &str, arity: Arity, def: MacroDef) -> bool {
        let entry = self
            .entries
            .entry(name.to_string())
            .or_insert(MacroEntry::Undefined);

        if let MacroEntry::Defined(defs) = entry {
            if let Some(slot) = defs.iter_mut().find(|(a, _)| *a == arity) {
                slot.1 = def;
                return true;
            }
            defs.push((arity, def));
            return false;
        }

        let replaced = matches!(entry, MacroEntry::Predefined);
        *entry = MacroEntry::Defined(vec![(arity, def)]);
        replaced
    }

    pub fn undefine(&mut self, name: &str) {
        self.entries
            .insert(name.to_string(), MacroEntry::Undefined);
    }

    pub fn get(&self, name: &str) -> Option<&MacroEntry> {
        self.entries.get(name)
    }

    /// Definition with exactly this arity, if the name is currently defined.
    pub fn lookup(&self, name: &str, arity: Arity) -> Option<&MacroDef> {
        match self.entries.get(name)? {
            MacroEntry::Defined(defs) => defs.iter().find(|(a, _)| *a == arity).map(|(_, d)| d),
            _ => None,
        }
    }

    pub fn is_predefined(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(MacroEntry::Predefined))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MacroEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(line: usize) -> MacroDef {
        MacroDef {
            params: vec![],
            body: vec![],
            line,
        }
    }

    #[test]
    fn test_definitions_keep_order() {
        let mut table = MacroTable::new();
        table.define("B", Arity::Fixed(1), def(1));
        table.define("A", Arity::None, def(2));
        table.define("B", Arity::None, def(3));
        let names: Vec<_> = table.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        match table.get("B") {
            Some(MacroEntry::Defined(defs)) => {
                assert_eq!(defs[0].0, Arity::Fixed(1));
                assert_eq!(defs[1].0, Arity::None);
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_redefinition_replaces_in_place() {
        let mut table = MacroTable::new();
        assert!(!table.define("A", Arity::Fixed(1), def(1)));
        assert!(table.define("A", Arity::Fixed(1), def(7)));
        assert_eq!(table.lookup("A", Arity::Fixed(1)).map(|d| d.line), Some(7));
    }

    #[test]
    fn test_undef_and_predefined() {
        let mut table = MacroTable::with_predefined();
        assert!(table.is_predefined("MODULE"));
        table.define("X", Arity::None, def(1));
        table.undefine("X");
        assert_eq!(table.get("X"), Some(&MacroEntry::Undefined));
        assert!(table.lookup("X", Arity::None).is_none());
    }
}
