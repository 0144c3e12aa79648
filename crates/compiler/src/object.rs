//! Object-table data model
//!
//! One `Frame` per defined function, one `VectorEntry` per declared
//! vector, and the process-wide side sets of literals that need
//! rip-relative data labels. Frames open on `FUNC_START`, seal on
//! `FUNC_END`, and are never mutated afterwards.

use crate::ast::HoistedSymbols;
use blang_core::SymbolTable;
use blang_core::types::{Datum, TypeTag, is_parameter_slot, is_temporary};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Insertion-ordered string-keyed map; vectors and temporaries preserve
/// the order entries were recorded in.
#[derive(Debug, Clone, Default)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        OrderedMap {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }
}

/// Declared vector: size, ordered element storage, and per-index byte
/// offsets filled in by the back end's layout.
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub symbol: String,
    pub size: usize,
    pub data: OrderedMap<Datum>,
    pub offsets: OrderedMap<usize>,
}

impl VectorEntry {
    pub const MAX_SIZE: usize = 999;

    pub fn new(symbol: impl Into<String>, size: usize) -> Self {
        VectorEntry {
            symbol: symbol.into(),
            size,
            data: OrderedMap::new(),
            offsets: OrderedMap::new(),
        }
    }

    pub fn set_address_offset(&mut self, index: &str, offset: usize) {
        self.offsets.insert(index, offset);
    }
}

/// The per-function record: parameters in call order (pointer parameters
/// keep their `*` spelling), locals, the temporary map, and label
/// addresses inside the instruction range.
#[derive(Debug, Clone)]
pub struct Frame {
    pub symbol: String,
    pub parameters: Vec<String>,
    pub locals: SymbolTable,
    /// Locals declared through `LOCL *name`.
    pub pointers: HashSet<String>,
    /// `_tN`/`_pN` -> last recorded right-hand side, verbatim.
    pub temporaries: OrderedMap<String>,
    pub labels: HashSet<String>,
    pub label_addresses: HashMap<String, usize>,
    /// Half-open `[start, end)` instruction range.
    pub range: [usize; 2],
    /// Accumulated stack allocation in bytes.
    pub allocation: u64,
    /// `(operand, resolved value)` of the single permitted return.
    pub ret: Option<(String, String)>,
}

impl Frame {
    pub const MAX_DEPTH: usize = 999;

    pub fn new(symbol: impl Into<String>) -> Self {
        Frame {
            symbol: symbol.into(),
            parameters: Vec::new(),
            locals: SymbolTable::new(),
            pointers: HashSet::new(),
            temporaries: OrderedMap::new(),
            labels: HashSet::new(),
            label_addresses: HashMap::new(),
            range: [0, 0],
            allocation: 0,
            ret: None,
        }
    }

    /// Parse the parenthesised parameter suffix off a function label,
    /// e.g. `__convert(s,v,*k)`.
    pub fn set_parameters_from_symbolic_label(&mut self, label: &str) {
        let Some(open) = label.find('(') else {
            return;
        };
        let Some(close) = label.rfind(')') else {
            return;
        };
        if open + 1 >= close {
            return;
        }
        for parameter in label[open + 1..close].split(',') {
            let parameter = parameter.trim();
            if !parameter.is_empty() {
                self.parameters.push(parameter.to_string());
            }
        }
    }

    pub fn is_pointer_parameter(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p == &format!("*{}", name))
    }

    pub fn is_scalar_parameter(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p == name)
    }

    pub fn is_parameter(&self, name: &str) -> bool {
        self.is_scalar_parameter(name) || self.is_pointer_parameter(name)
    }

    pub fn is_pointer(&self, name: &str) -> bool {
        self.pointers.contains(name) || self.locals.is_pointer(name) || self.is_pointer_parameter(name)
    }

    /// Follow a `_tN`/`_pN` chain back to its root right-hand side.
    pub fn resolve_temporary(&self, name: &str) -> Option<String> {
        let mut current = self.temporaries.get(name)?.clone();
        let mut hops = 0;
        while (is_temporary(&current) || is_parameter_slot(&current)) && hops < Frame::MAX_DEPTH {
            match self.temporaries.get(&current) {
                Some(next) => current = next.clone(),
                None => break,
            }
            hops += 1;
        }
        Some(current)
    }
}

/// Strip the label decoration back to the function name:
/// `__exp(x,y)` -> `exp`.
pub fn label_as_human_readable(label: &str) -> String {
    let bare = label.strip_prefix("__").unwrap_or(label);
    match bare.find('(') {
        Some(open) => bare[..open].to_string(),
        None => bare.to_string(),
    }
}

/// Everything the back ends read after the type-checking pass.
#[derive(Debug)]
pub struct ObjectTable {
    pub functions: HashMap<String, Frame>,
    pub vectors: HashMap<String, VectorEntry>,
    /// Distinct immediates that need rip-relative read-only data.
    pub strings: BTreeSet<String>,
    pub floats: BTreeSet<String>,
    pub doubles: BTreeSet<String>,
    pub globals: SymbolTable,
    pub hoisted: HoistedSymbols,
    /// Human-readable names of every compiled function label.
    pub labels: HashSet<String>,
    /// Function label -> instruction index of its `LABEL`.
    pub address_table: HashMap<String, usize>,
    /// Logical argument stack mirrored across PUSH/POP.
    pub stack: Vec<String>,
}

impl ObjectTable {
    pub fn new(hoisted: HoistedSymbols, globals: SymbolTable) -> Self {
        ObjectTable {
            functions: HashMap::new(),
            vectors: HashMap::new(),
            strings: BTreeSet::new(),
            floats: BTreeSet::new(),
            doubles: BTreeSet::new(),
            globals,
            hoisted,
            labels: HashSet::new(),
            address_table: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Save literals that will need a `%rip` address in the data section.
    pub fn insert_address_storage(&mut self, datum: &Datum) {
        match datum.tag {
            TypeTag::Float => {
                self.floats.insert(datum.value.clone());
            }
            TypeTag::Double => {
                self.doubles.insert(datum.value.clone());
            }
            TypeTag::StringT => {
                self.strings.insert(datum.value.clone());
            }
            _ => {}
        }
    }
}
