//! Text forms of values and resource names, as used in table descriptions
//!
//! Value literals follow the resource XML conventions: `@null`, `@empty`,
//! `@0x7f010000`, `@style/Base`, `?attr/colorAccent`, `#ff00ff`, `true`, `0x10`,
//! `-3`, `1.5`, `16dp`, `50%`, and anything else is a string (a leading `\`
//! forces a string).

use phf::phf_map;
use winnow::ascii::{dec_int, digit0, digit1, hex_uint};
use winnow::combinator::{alt, opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::errors::TableError;
use crate::value::{Value, ValueType};

/// Unparsed form of a value, before names and strings are resolved against a table
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Fully encoded value
    Value(Value),

    /// String that still has to be added to the string pool
    String(String),

    /// Symbolic reference (`@type/name`) or attribute (`?attr/name`) to be looked up by name
    Name { name: String, attribute: bool },
}

/// Parts of a `[package:][type/]entry` resource name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameParts<'a> {
    pub package: Option<&'a str>,
    pub type_name: Option<&'a str>,
    pub entry: &'a str,
}

/// Complex unit suffixes: (type, unit code)
static UNITS: phf::Map<&'static str, (ValueType, u32)> = phf_map! {
    "px" => (ValueType::Dimension, 0),
    "dp" => (ValueType::Dimension, 1),
    "dip" => (ValueType::Dimension, 1),
    "sp" => (ValueType::Dimension, 2),
    "pt" => (ValueType::Dimension, 3),
    "in" => (ValueType::Dimension, 4),
    "mm" => (ValueType::Dimension, 5),
    "%" => (ValueType::Fraction, 0),
    "%p" => (ValueType::Fraction, 1),
};

const RADIX_23P0: u32 = 0;
const RADIX_16P7: u32 = 1;
const RADIX_8P15: u32 = 2;
const RADIX_0P23: u32 = 3;

/// Parse a `[@|?][package:][type/]entry` resource name
pub fn parse_resource_name(name: &str) -> Result<NameParts<'_>, TableError> {
    let trimmed = name.strip_prefix(['@', '?']).unwrap_or(name);

    let (package, rest) = match trimmed.split_once(':') {
        Some((package, rest)) => (Some(package), rest),
        None => (None, trimmed),
    };
    let (type_name, entry) = match rest.split_once('/') {
        Some((type_name, entry)) => (Some(type_name), entry),
        None => (None, rest),
    };

    let valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '$'))
    };

    if !valid(entry) || !package.is_none_or(valid) || !type_name.is_none_or(valid) {
        return Err(TableError::InvalidName(name.to_owned()));
    }

    Ok(NameParts {
        package,
        type_name,
        entry,
    })
}

/// Parse the text form of a value
pub fn parse_literal(text: &str) -> Result<Literal, TableError> {
    if let Some(escaped) = text.strip_prefix('\\') {
        return Ok(Literal::String(escaped.to_owned()));
    }

    match text {
        "@null" => return Ok(Literal::Value(Value::reference(0))),
        "@empty" => return Ok(Literal::Value(Value::empty())),
        "@undefined" => return Ok(Literal::Value(Value::undefined())),
        "true" => return Ok(Literal::Value(Value::boolean(true))),
        "false" => return Ok(Literal::Value(Value::boolean(false))),
        _ => {}
    }

    if let Some(rest) = text.strip_prefix('@') {
        return reference_literal(text, rest, false);
    }
    if let Some(rest) = text.strip_prefix('?') {
        return reference_literal(text, rest, true);
    }
    if let Some(rest) = text.strip_prefix('#') {
        return parse_color(rest)
            .map(Literal::Value)
            .ok_or_else(|| TableError::InvalidValue(text.to_owned()));
    }

    if let Some(value) = parse_number(text) {
        return Ok(Literal::Value(value));
    }

    Ok(Literal::String(text.to_owned()))
}

fn reference_literal(text: &str, rest: &str, attribute: bool) -> Result<Literal, TableError> {
    let id = preceded(alt(("0x", "0X")), hex_uint::<_, u32, ErrMode<ContextError>>).parse(rest);
    if let Ok(id) = id {
        return Ok(Literal::Value(if attribute {
            Value::attribute(id)
        } else {
            Value::reference(id)
        }));
    }

    parse_resource_name(text)?;
    Ok(Literal::Name {
        name: rest.to_owned(),
        attribute,
    })
}

/// `#rgb`, `#argb`, `#rrggbb` and `#aarrggbb`, alpha defaults to opaque
fn parse_color(digits: &str) -> Option<Value> {
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let raw = u32::from_str_radix(digits, 16).ok()?;

    // expand a 4-bit channel to 8 bits
    let nibble = |shift: u32| ((raw >> shift) & 0xf) * 0x11;

    let value = match digits.len() {
        3 => Value::new(
            ValueType::ColorRgb4,
            0xff00_0000 | (nibble(8) << 16) | (nibble(4) << 8) | nibble(0),
        ),
        4 => Value::new(
            ValueType::ColorArgb4,
            (nibble(12) << 24) | (nibble(8) << 16) | (nibble(4) << 8) | nibble(0),
        ),
        6 => Value::new(ValueType::ColorRgb8, 0xff00_0000 | raw),
        8 => Value::new(ValueType::ColorArgb8, raw),
        _ => return None,
    };
    Some(value)
}

fn parse_number(text: &str) -> Option<Value> {
    let hex = preceded(alt(("0x", "0X")), hex_uint::<_, u32, ErrMode<ContextError>>).parse(text);
    if let Ok(v) = hex {
        return Some(Value::new(ValueType::Hex, v));
    }

    if let Ok(v) = dec_int::<_, i32, ErrMode<ContextError>>.parse(text) {
        return Some(Value::int(v));
    }

    let (number, unit) = number_with_unit.parse(text).ok()?;
    let number: f32 = number.parse().ok()?;

    match unit {
        "" => Some(Value::new(ValueType::Float, number.to_bits())),
        unit => {
            let (data_type, unit) = *UNITS.get(unit)?;
            let number = if data_type == ValueType::Fraction {
                number / 100.0
            } else {
                number
            };
            Some(Value::new(data_type, float_to_complex(number) | unit))
        }
    }
}

fn number_with_unit<'i>(input: &mut &'i str) -> ModalResult<(&'i str, &'i str)> {
    (
        (opt(one_of(['-', '+'])), digit1, opt(('.', digit0))).take(),
        take_while(0.., |c: char| c.is_ascii_alphabetic() || c == '%'),
    )
        .parse_next(input)
}

/// Encode `value` in the complex format, leaving the unit bits clear
///
/// [Source Code](https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/ResourceTypes.cpp;l=7016)
pub fn float_to_complex(value: f32) -> u32 {
    let negative = value < 0.0;
    let magnitude = value.abs();

    let bits = (magnitude as f64 * (1u64 << 23) as f64 + 0.5) as u64;

    let (radix, shift) = if bits & 0x7f_ffff == 0 {
        (RADIX_23P0, 23)
    } else if bits & 0xffff_ffff_ff80_0000 == 0 {
        (RADIX_0P23, 0)
    } else if bits & 0xffff_ffff_8000_0000 == 0 {
        (RADIX_8P15, 8)
    } else if bits & 0xffff_ff80_0000_0000 == 0 {
        (RADIX_16P7, 16)
    } else {
        (RADIX_23P0, 23)
    };

    let mut mantissa = ((bits >> shift) as u32) & Value::COMPLEX_MANTISSA_MASK;
    if negative {
        mantissa = mantissa.wrapping_neg() & Value::COMPLEX_MANTISSA_MASK;
    }

    (radix << Value::COMPLEX_RADIX_SHIFT) | (mantissa << Value::COMPLEX_MANTISSA_SHIFT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(text: &str) -> Value {
        match parse_literal(text).unwrap() {
            Literal::Value(v) => v,
            other => panic!("{text:?} parsed as {other:?}"),
        }
    }

    #[test]
    fn special_references() {
        assert_eq!(value("@null"), Value::reference(0));
        assert_eq!(value("@empty"), Value::empty());
        assert_eq!(value("@0x7f020001"), Value::reference(0x7f020001));
        assert_eq!(value("?0x01010098"), Value::attribute(0x01010098));
    }

    #[test]
    fn named_references() {
        assert_eq!(
            parse_literal("@style/Theme.Base").unwrap(),
            Literal::Name {
                name: "style/Theme.Base".to_owned(),
                attribute: false
            }
        );
        assert_eq!(
            parse_literal("?android:attr/colorAccent").unwrap(),
            Literal::Name {
                name: "android:attr/colorAccent".to_owned(),
                attribute: true
            }
        );
        assert!(parse_literal("@style/").is_err());
    }

    #[test]
    fn colors() {
        assert_eq!(value("#f00"), Value::new(ValueType::ColorRgb4, 0xffff0000));
        assert_eq!(value("#8f00"), Value::new(ValueType::ColorArgb4, 0x88ff0000));
        assert_eq!(value("#00ff00"), Value::new(ValueType::ColorRgb8, 0xff00ff00));
        assert_eq!(value("#80000000"), Value::new(ValueType::ColorArgb8, 0x80000000));
        assert!(parse_literal("#12345").is_err());
        assert!(parse_literal("#xyz").is_err());
    }

    #[test]
    fn numbers() {
        assert_eq!(value("true"), Value::boolean(true));
        assert_eq!(value("0x10"), Value::new(ValueType::Hex, 0x10));
        assert_eq!(value("-3"), Value::int(-3));
        assert_eq!(value("1.5"), Value::new(ValueType::Float, 1.5f32.to_bits()));
    }

    #[test]
    fn complex_units() {
        assert_eq!(value("16dp"), Value::new(ValueType::Dimension, 0x1001));
        assert_eq!(value("1.5dp").data, 0x00c0_0021);
        assert_eq!(value("50%"), Value::new(ValueType::Fraction, 0x4000_0030));
        assert_eq!(value("-2px").complex_to_float(), -2.0);
        assert_eq!(value("12sp").to_raw_string(), "12sp");
    }

    #[test]
    fn strings() {
        assert_eq!(parse_literal("Hello").unwrap(), Literal::String("Hello".to_owned()));
        assert_eq!(parse_literal("12 apples").unwrap(), Literal::String("12 apples".to_owned()));
        assert_eq!(parse_literal("\\@null").unwrap(), Literal::String("@null".to_owned()));
        assert_eq!(parse_literal("").unwrap(), Literal::String(String::new()));
    }

    #[test]
    fn resource_names() {
        assert_eq!(
            parse_resource_name("@android:style/Theme").unwrap(),
            NameParts {
                package: Some("android"),
                type_name: Some("style"),
                entry: "Theme"
            }
        );
        assert_eq!(parse_resource_name("colorAccent").unwrap().entry, "colorAccent");
        assert!(parse_resource_name("string/").is_err());
        assert!(parse_resource_name("bad name").is_err());
    }
}
