//! Coordinate attributes embedded in file and folder names.
//!
//! The scanning software encodes coordinates as `--<LETTER><digits>` tokens,
//! e.g. `image--L0000--S00--U01--V02--X03--Y04--C00.ome.tif`. Older software
//! writes two digits, newer software pads up to four.
//!
//! Folder names repeat coordinates of their parents, and file names may hold
//! both template and resolved values for the same letter. In every case the
//! right-most occurrence is authoritative.
//!
//! # Example
//!
//! ```
//! use matrixscan::attributes::{attribute, attributes};
//!
//! let path = "/exp/slide--S00/chamber--U07--V03/field--X01--Y00/image--X09.tif";
//! assert_eq!(attribute(path, "u"), Some(7));
//! assert_eq!(attribute(path, "Q"), None);
//!
//! let attrs = attributes(path);
//! assert_eq!(attrs.x(), Some(9));
//! assert_eq!(attrs.raw('V'), Some("03"));
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Digit group widths accepted after the code letter.
const DIGITS: &str = "[0-9]{2,4}";

fn all_codes() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!("--([A-Z])({DIGITS})")).ok())
        .as_ref()
}

/// Code letter named by `name`, upper-cased.
fn code_letter(name: &str) -> Option<char> {
    let mut chars = name.chars();
    let code = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !code.is_ascii_uppercase() {
        return None;
    }
    Some(code)
}

/// Last digit group following `--<name>` in `path`, as written.
///
/// `name` is a single letter; lower case is accepted. Returns `None` when the
/// code does not occur or `name` is not a letter.
pub fn attribute_as_str(path: &str, name: &str) -> Option<String> {
    let code = code_letter(name)?;
    attributes(path).raw(code).map(str::to_string)
}

/// Last digit group following `--<name>` in `path`, as an integer.
pub fn attribute(path: &str, name: &str) -> Option<u32> {
    attribute_as_str(path, name).and_then(|digits| digits.parse().ok())
}

/// Scan `path` once for every code letter.
pub fn attributes(path: &str) -> Attributes {
    let mut attrs = Attributes::default();
    let Some(re) = all_codes() else {
        return attrs;
    };
    for caps in re.captures_iter(path) {
        let code = caps[1].as_bytes()[0];
        let raw = caps[2].to_string();
        // Two to four digits always fit.
        let value = raw.parse().unwrap_or_default();
        attrs.slots[(code - b'A') as usize] = Some(Attribute { raw, value });
    }
    attrs
}

// =============================================================================
// Attribute
// =============================================================================

/// One coordinate: the zero-padded digits and their value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub raw: String,
    pub value: u32,
}

// =============================================================================
// Attributes
// =============================================================================

/// All coordinates found in a path, indexed by code letter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Attributes {
    slots: [Option<Attribute>; 26],
}

macro_rules! code_accessors {
    ($($name:ident => $code:literal),* $(,)?) => {
        $(
            #[doc = concat!("Integer value of `", $code, "`.")]
            #[inline]
            pub fn $name(&self) -> Option<u32> {
                self.value($code)
            }
        )*
    };
}

impl Attributes {
    fn slot(&self, code: char) -> Option<&Attribute> {
        let code = code.to_ascii_uppercase();
        if !code.is_ascii_uppercase() {
            return None;
        }
        self.slots[(code as u8 - b'A') as usize].as_ref()
    }

    /// Attribute for `code` (case-insensitive).
    pub fn get(&self, code: char) -> Option<&Attribute> {
        self.slot(code)
    }

    /// Integer value for `code`.
    pub fn value(&self, code: char) -> Option<u32> {
        self.slot(code).map(|a| a.value)
    }

    /// Digits for `code` exactly as they appear in the path.
    pub fn raw(&self, code: char) -> Option<&str> {
        self.slot(code).map(|a| a.raw.as_str())
    }

    /// Present codes in alphabetical order.
    pub fn iter(&self) -> impl Iterator<Item = (char, &Attribute)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|a| ((b'A' + i as u8) as char, a)))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    code_accessors! {
        u => 'U',
        v => 'V',
        x => 'X',
        y => 'Y',
        z => 'Z',
        c => 'C',
        l => 'L',
        s => 'S',
        j => 'J',
        e => 'E',
        o => 'O',
        t => 'T',
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (code, attr) in self.iter() {
            write!(f, "--{}{}", code, attr.raw)?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
