//! Primitive storage types and the `Datum` triple
//!
//! A datum is `(value, type, size)` where `value` keeps the lexical
//! spelling from the source (`5`, `'97'`, `hello`, `__WORD__`). The
//! serialized form `(value:type:size)` is how immediates travel inside
//! ITA operands, and `Datum::parse` is the exact inverse of
//! `Datum::format`.

use std::fmt;

/// Width of B's universal cell on all supported targets.
pub const WORD_SIZE: usize = 8;

/// Spelling used for a word-typed value whose contents are unknown.
pub const WORD_SPELLING: &str = "__WORD__";

/// Spelling used for an uninitialized (auto) cell.
pub const NULL_SPELLING: &str = "null";

/// Storage type tags for literals, vectors, and locals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    Word,
    Int,
    Long,
    Float,
    Double,
    Byte,
    Char,
    StringT,
}

impl TypeTag {
    /// Storage width in bytes. Strings are sized by their contents and
    /// return 0 here; use `Datum::size` for a concrete string datum.
    pub fn width(self) -> usize {
        match self {
            TypeTag::Null => 0,
            TypeTag::Byte | TypeTag::Char => 1,
            TypeTag::Int | TypeTag::Float => 4,
            TypeTag::Long | TypeTag::Double => 8,
            TypeTag::Word => WORD_SIZE,
            TypeTag::StringT => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Word => "word",
            TypeTag::Int => "int",
            TypeTag::Long => "long",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::Byte => "byte",
            TypeTag::Char => "char",
            TypeTag::StringT => "string",
        }
    }

    pub fn from_name(name: &str) -> Option<TypeTag> {
        Some(match name {
            "null" => TypeTag::Null,
            "word" => TypeTag::Word,
            "int" => TypeTag::Int,
            "long" => TypeTag::Long,
            "float" => TypeTag::Float,
            "double" => TypeTag::Double,
            "byte" => TypeTag::Byte,
            "char" => TypeTag::Char,
            "string" => TypeTag::StringT,
            _ => return None,
        })
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            TypeTag::Word | TypeTag::Int | TypeTag::Long | TypeTag::Byte | TypeTag::Char
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A typed immediate: lexical spelling, storage tag, and byte size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Datum {
    pub value: String,
    pub tag: TypeTag,
    pub size: usize,
}

impl Datum {
    pub fn new(value: impl Into<String>, tag: TypeTag, size: usize) -> Self {
        Datum {
            value: value.into(),
            tag,
            size,
        }
    }

    /// The uninitialized cell bound by `auto x;`.
    pub fn null() -> Self {
        Datum::new(NULL_SPELLING, TypeTag::Null, 0)
    }

    /// A word-wide cell with unknown contents (parameters, pointers).
    pub fn word() -> Self {
        Datum::new(WORD_SPELLING, TypeTag::Word, WORD_SIZE)
    }

    pub fn int(spelling: impl Into<String>) -> Self {
        Datum::new(spelling, TypeTag::Int, 4)
    }

    pub fn string(contents: impl Into<String>) -> Self {
        let contents = contents.into();
        let size = contents.len();
        Datum::new(contents, TypeTag::StringT, size)
    }

    /// Canonical serialized form, `(value:type:size)`.
    pub fn format(&self) -> String {
        format!("({}:{}:{})", self.value, self.tag, self.size)
    }

    /// Parse a serialized datum back out of ITA operand text.
    ///
    /// The value spelling may itself contain `:` (string contents), so the
    /// type and size fields are taken from the last two separators.
    pub fn parse(text: &str) -> Option<Datum> {
        let inner = text.strip_prefix('(')?.strip_suffix(')')?;
        let size_sep = inner.rfind(':')?;
        let (rest, size_text) = inner.split_at(size_sep);
        let size: usize = size_text[1..].parse().ok()?;
        let tag_sep = rest.rfind(':')?;
        let (value, tag_text) = rest.split_at(tag_sep);
        let tag = TypeTag::from_name(&tag_text[1..])?;
        Some(Datum::new(value, tag, size))
    }

    /// Does this operand text look like a serialized datum?
    pub fn is_serialized(text: &str) -> bool {
        Datum::parse(text).is_some()
    }

    /// Classify a numeric literal spelling.
    ///
    /// Integers that fit `i32` are `int`, wider ones `long`. Decimal
    /// spellings default to `float`; past seven significant digits a
    /// 32-bit float would lose precision, so they widen to `double`.
    pub fn from_number_spelling(spelling: &str) -> Option<Datum> {
        if spelling.contains('.') || spelling.contains('e') || spelling.contains('E') {
            let digits = spelling
                .chars()
                .filter(|c| c.is_ascii_digit())
                .skip_while(|c| *c == '0')
                .count();
            let (tag, size) = if digits > 7 {
                (TypeTag::Double, 8)
            } else {
                (TypeTag::Float, 4)
            };
            spelling.parse::<f64>().ok()?;
            return Some(Datum::new(spelling, tag, size));
        }
        let value: i64 = spelling.parse().ok()?;
        if i32::try_from(value).is_ok() {
            Some(Datum::new(spelling, TypeTag::Int, 4))
        } else {
            Some(Datum::new(spelling, TypeTag::Long, 8))
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// `_tN` temporary name check.
pub fn is_temporary(name: &str) -> bool {
    name.strip_prefix("_t")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// `_pN` parameter slot name check.
pub fn is_parameter_slot(name: &str) -> bool {
    name.strip_prefix("_p")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Unary rvalue text has the shape `<op> operand` or `<op>operand` with a
/// leading operator spelling.
pub fn is_unary_expression(rvalue: &str) -> bool {
    unary_operator_of(rvalue).is_some()
}

/// Extract the operator spelling off the front of a unary rvalue.
pub fn unary_operator_of(rvalue: &str) -> Option<&'static str> {
    // longest spellings first so `--` does not match as `-`
    const UNARY: [&str; 8] = ["++", "--", "!", "~", "-", "+", "&", "*"];
    let trimmed = rvalue.trim_start();
    if Datum::is_serialized(trimmed) {
        return None;
    }
    UNARY
        .into_iter()
        .find(|op| trimmed.starts_with(op) && trimmed.len() > op.len())
}

/// The operand part of a unary rvalue, with the operator stripped.
pub fn unary_operand_of(rvalue: &str) -> &str {
    match unary_operator_of(rvalue) {
        Some(op) => rvalue.trim_start()[op.len()..].trim(),
        None => rvalue.trim(),
    }
}

/// Binary rvalue text has the shape `lhs <op> rhs`: exactly one infix
/// operator spelling between two fully-resolved operands, separated by
/// spaces (the form the temporary builder emits into `MOV`).
pub fn binary_parts_of(rvalue: &str) -> Option<(&str, &str, &str)> {
    const BINARY: [&str; 20] = [
        "||", "&&", "==", "!=", "<=", ">=", "<<", ">>", "<", ">", "|", "^", "&", "+", "-", "*",
        "/", "%", "?", ":",
    ];
    // scan for ` op ` outside the parenthesized datum spellings
    let bytes = rvalue.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b' ' if depth == 0 => {
                let rest = &rvalue[i + 1..];
                for op in BINARY {
                    if let Some(rhs) = rest.strip_prefix(op)
                        && let Some(rhs) = rhs.strip_prefix(' ')
                    {
                        return Some((rvalue[..i].trim(), op, rhs.trim()));
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

pub fn is_binary_expression(rvalue: &str) -> bool {
    binary_parts_of(rvalue).is_some()
}

/// `name[idx]` → `name`; plain names pass through.
pub fn vector_base(lvalue: &str) -> &str {
    match lvalue.find('[') {
        Some(open) => &lvalue[..open],
        None => lvalue,
    }
}

/// `name[idx]` → `idx`, when the lvalue is subscripted.
pub fn vector_index(lvalue: &str) -> Option<&str> {
    let open = lvalue.find('[')?;
    let close = lvalue.rfind(']')?;
    (open + 1 < close).then(|| &lvalue[open + 1..close])
}

pub fn is_vector_lvalue(lvalue: &str) -> bool {
    lvalue.contains('[') && lvalue.contains(']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datum_round_trip() {
        let cases = [
            Datum::int("5"),
            Datum::new("'97'", TypeTag::Byte, 1),
            Datum::string("too bad"),
            Datum::string("a:b:c"),
            Datum::word(),
            Datum::null(),
        ];
        for datum in cases {
            assert_eq!(Datum::parse(&datum.format()), Some(datum));
        }
    }

    #[test]
    fn datum_format_shape() {
        assert_eq!(Datum::int("5").format(), "(5:int:4)");
        assert_eq!(Datum::new("'57'", TypeTag::Byte, 1).format(), "('57':byte:1)");
    }

    #[test]
    fn number_classification() {
        assert_eq!(Datum::from_number_spelling("5").unwrap().tag, TypeTag::Int);
        assert_eq!(
            Datum::from_number_spelling("4294967296").unwrap().tag,
            TypeTag::Long
        );
        assert_eq!(
            Datum::from_number_spelling("1.5").unwrap().tag,
            TypeTag::Float
        );
        assert_eq!(
            Datum::from_number_spelling("3.14159265358979").unwrap().tag,
            TypeTag::Double
        );
        assert!(Datum::from_number_spelling("nope").is_none());
    }

    #[test]
    fn unary_text_helpers() {
        assert_eq!(unary_operator_of("-- x"), Some("--"));
        assert_eq!(unary_operand_of("-- x"), "x");
        assert_eq!(unary_operator_of("& m"), Some("&"));
        assert_eq!(unary_operator_of("x"), None);
        // a serialized negative literal is not a unary expression
        assert_eq!(unary_operator_of("(5:int:4)"), None);
    }

    #[test]
    fn binary_text_helpers() {
        assert_eq!(
            binary_parts_of("(6:int:4) + (6:int:4)"),
            Some(("(6:int:4)", "+", "(6:int:4)"))
        );
        assert_eq!(binary_parts_of("_t1 * _t2"), Some(("_t1", "*", "_t2")));
        assert_eq!(binary_parts_of("x"), None);
        assert_eq!(binary_parts_of("CMP x"), None);
    }

    #[test]
    fn temporaries_and_slots() {
        assert!(is_temporary("_t12"));
        assert!(!is_temporary("_t"));
        assert!(!is_temporary("_tx"));
        assert!(is_parameter_slot("_p1"));
        assert!(!is_parameter_slot("p1"));
    }

    #[test]
    fn vector_spellings() {
        assert_eq!(vector_base("mess[3]"), "mess");
        assert_eq!(vector_index("mess[3]"), Some("3"));
        assert_eq!(vector_base("mess"), "mess");
        assert!(vector_index("mess").is_none());
    }
}
