use crate::string_pool::StringPool;

/// Type of the data value
///
/// See: https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=237
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// The `data` is either 0 or 1, specifying this resource is either undefined or empty, respectively.
    #[default]
    Null,

    /// The `data` holds a resource identifier of another resource table entry.
    Reference,

    /// The `data` holds an attribute resource identifier.
    Attribute,

    /// The `data` holds an index into the table's string pool.
    String,

    /// The `data` holds a single-precision floating point number.
    Float,

    /// The `data` holds a complex number encoding a dimension value, such as "100in".
    Dimension,

    /// The `data` holds a complex number encoding a fraction of a container.
    Fraction,

    /// The `data` holds a dynamic resource identifier.
    DynamicReference,

    /// The `data` holds an attribute resource identifier, which needs to be resolved at runtime.
    DynamicAttribute,

    /// The `data` is a raw integer value of the form n..n.
    Dec,

    /// The `data` is a raw integer value of the form 0xn..n.
    Hex,

    /// The `data` is either 0 or 1, for input "false" or "true" respectively.
    Boolean,

    /// The `data` is a raw integer value of the form #aarrggbb.
    ColorArgb8,

    /// The `data` is a raw integer value of the form #rrggbb.
    ColorRgb8,

    /// The `data` is a raw integer value of the form #argb.
    ColorArgb4,

    /// The `data` is a raw integer value of the form #rgb.
    ColorRgb4,

    /// Unknown type value
    Unknown(u8),
}

impl ValueType {
    /// Numeric type tag as seen across the handle boundary
    pub fn code(&self) -> u8 {
        match self {
            ValueType::Null => 0x00,
            ValueType::Reference => 0x01,
            ValueType::Attribute => 0x02,
            ValueType::String => 0x03,
            ValueType::Float => 0x04,
            ValueType::Dimension => 0x05,
            ValueType::Fraction => 0x06,
            ValueType::DynamicReference => 0x07,
            ValueType::DynamicAttribute => 0x08,
            ValueType::Dec => 0x10,
            ValueType::Hex => 0x11,
            ValueType::Boolean => 0x12,
            ValueType::ColorArgb8 => 0x1c,
            ValueType::ColorRgb8 => 0x1d,
            ValueType::ColorArgb4 => 0x1e,
            ValueType::ColorRgb4 => 0x1f,
            ValueType::Unknown(v) => *v,
        }
    }

    /// Integer-like types, `TYPE_FIRST_INT..=TYPE_LAST_INT`
    #[inline]
    pub fn is_int(&self) -> bool {
        (0x10..=0x1f).contains(&self.code())
    }

    #[inline]
    pub fn is_color(&self) -> bool {
        (0x1c..=0x1f).contains(&self.code())
    }
}

impl From<u8> for ValueType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => ValueType::Null,
            0x01 => ValueType::Reference,
            0x02 => ValueType::Attribute,
            0x03 => ValueType::String,
            0x04 => ValueType::Float,
            0x05 => ValueType::Dimension,
            0x06 => ValueType::Fraction,
            0x07 => ValueType::DynamicReference,
            0x08 => ValueType::DynamicAttribute,
            0x10 => ValueType::Dec,
            0x11 => ValueType::Hex,
            0x12 => ValueType::Boolean,
            0x1c => ValueType::ColorArgb8,
            0x1d => ValueType::ColorRgb8,
            0x1e => ValueType::ColorArgb4,
            0x1f => ValueType::ColorRgb4,
            v => ValueType::Unknown(v),
        }
    }
}

/// A typed 32-bit value, the payload of every table entry and bag element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Value {
    pub data_type: ValueType,
    pub data: u32,
}

impl Value {
    /// `data` of a null value meaning "not defined"
    pub const DATA_NULL_UNDEFINED: u32 = 0;
    /// `data` of a null value meaning "explicitly empty"
    pub const DATA_NULL_EMPTY: u32 = 1;

    pub const COMPLEX_UNIT_MASK: u32 = 0x0f;
    pub const COMPLEX_RADIX_SHIFT: u32 = 4;
    pub const COMPLEX_MANTISSA_SHIFT: u32 = 8;
    pub const COMPLEX_MANTISSA_MASK: u32 = 0x00ff_ffff;

    const RADIX_MULTS: [f64; 4] = [1.0 / 256.0, 1.0 / 32768.0, 1.0 / 8388608.0, 1.0 / 2147483648.0];
    const DIMENSION_UNITS: [&str; 6] = ["px", "dip", "sp", "pt", "in", "mm"];
    const FRACTION_UNITS: [&str; 2] = ["%", "%p"];

    #[inline]
    pub const fn new(data_type: ValueType, data: u32) -> Value {
        Value { data_type, data }
    }

    /// Value that is not defined at all
    #[inline]
    pub const fn undefined() -> Value {
        Value::new(ValueType::Null, Self::DATA_NULL_UNDEFINED)
    }

    /// Value explicitly defined as empty (`@empty`)
    #[inline]
    pub const fn empty() -> Value {
        Value::new(ValueType::Null, Self::DATA_NULL_EMPTY)
    }

    #[inline]
    pub const fn reference(resid: u32) -> Value {
        Value::new(ValueType::Reference, resid)
    }

    #[inline]
    pub const fn attribute(resid: u32) -> Value {
        Value::new(ValueType::Attribute, resid)
    }

    #[inline]
    pub const fn int(v: i32) -> Value {
        Value::new(ValueType::Dec, v as u32)
    }

    #[inline]
    pub const fn boolean(v: bool) -> Value {
        Value::new(ValueType::Boolean, if v { 0xffff_ffff } else { 0 })
    }

    /// Returns `true` for a null value that is not explicitly `@empty`
    #[inline]
    pub fn is_undefined(&self) -> bool {
        self.data_type == ValueType::Null && self.data != Self::DATA_NULL_EMPTY
    }

    /// Returns `true` for the `@null` reference (reference to id 0)
    #[inline]
    pub fn is_null_reference(&self) -> bool {
        self.data_type == ValueType::Reference && self.data == 0
    }

    #[inline(always)]
    pub fn complex_to_float(&self) -> f64 {
        // mantissa is the signed upper 24 bits
        ((self.data & 0xffff_ff00) as i32) as f64
            * Self::RADIX_MULTS[((self.data >> Self::COMPLEX_RADIX_SHIFT) & 3) as usize]
    }

    #[inline(always)]
    fn fmt_package(&self) -> &str {
        if self.data >> 24 == 1 { "android:" } else { "" }
    }

    /// Human-readable form of the value, strings are looked up in `string_pool`
    pub fn to_string(&self, string_pool: &StringPool) -> String {
        match self.data_type {
            ValueType::String => string_pool.get(self.data).map(str::to_owned).unwrap_or_default(),
            _ => self.to_raw_string(),
        }
    }

    /// Like [`Value::to_string`] but prints string values as their pool index
    pub fn to_raw_string(&self) -> String {
        match self.data_type {
            ValueType::Null if self.data == Self::DATA_NULL_EMPTY => "@empty".to_owned(),
            ValueType::Null => "@undefined".to_owned(),
            ValueType::Reference if self.data == 0 => "@null".to_owned(),
            ValueType::Reference | ValueType::DynamicReference => {
                format!("@{}0x{:08x}", self.fmt_package(), self.data)
            }
            ValueType::Attribute | ValueType::DynamicAttribute => {
                format!("?{}0x{:08x}", self.fmt_package(), self.data)
            }
            ValueType::String => format!("<string #{}>", self.data),
            ValueType::Float => f32::from_bits(self.data).to_string(),
            ValueType::Dimension => {
                let idx = (self.data & Self::COMPLEX_UNIT_MASK) as usize;
                let unit = Self::DIMENSION_UNITS.get(idx).unwrap_or(&"");
                format!("{}{}", self.complex_to_float(), unit)
            }
            ValueType::Fraction => {
                let idx = (self.data & Self::COMPLEX_UNIT_MASK) as usize;
                let unit = Self::FRACTION_UNITS.get(idx).unwrap_or(&"");
                format!("{}{}", self.complex_to_float() * 100f64, unit)
            }
            ValueType::Dec => format!("{}", self.data as i32),
            ValueType::Hex => format!("0x{:08x}", self.data),
            ValueType::Boolean => {
                if self.data == 0 {
                    "false".to_owned()
                } else {
                    "true".to_owned()
                }
            }
            ValueType::ColorArgb8
            | ValueType::ColorRgb8
            | ValueType::ColorArgb4
            | ValueType::ColorRgb4 => format!("#{:08x}", self.data),
            ValueType::Unknown(_) => format!("<0x{:x}, type {:?}>", self.data, self.data_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes() {
        for code in [0x00u8, 0x01, 0x03, 0x05, 0x10, 0x12, 0x1c, 0x1f, 0x42] {
            assert_eq!(ValueType::from(code).code(), code);
        }
        assert!(ValueType::Boolean.is_int());
        assert!(ValueType::ColorRgb4.is_color());
        assert!(!ValueType::String.is_int());
    }

    #[test]
    fn nulls() {
        assert!(Value::undefined().is_undefined());
        assert!(!Value::empty().is_undefined());
        assert!(Value::reference(0).is_null_reference());
        assert!(!Value::reference(0x7f010000).is_null_reference());
    }

    #[test]
    fn complex_values() {
        // 16dp
        assert_eq!(Value::new(ValueType::Dimension, 0x1001).to_raw_string(), "16dip");
        // 1.5dp
        assert_eq!(Value::new(ValueType::Dimension, 0x00c0_0021).to_raw_string(), "1.5dip");
        // -2px
        let negative = Value::new(ValueType::Dimension, ((-2i32 as u32) & 0xffffff) << 8);
        assert_eq!(negative.complex_to_float(), -2.0);
        // 50%
        assert_eq!(Value::new(ValueType::Fraction, 0x4000_0030).to_raw_string(), "50%");
    }

    #[test]
    fn formatting() {
        assert_eq!(Value::reference(0x01010000).to_raw_string(), "@android:0x01010000");
        assert_eq!(Value::attribute(0x7f010001).to_raw_string(), "?0x7f010001");
        assert_eq!(Value::int(-3).to_raw_string(), "-3");
        assert_eq!(Value::boolean(true).to_raw_string(), "true");
        assert_eq!(Value::new(ValueType::ColorRgb8, 0xff00ff00).to_raw_string(), "#ff00ff00");

        let mut pool = StringPool::default();
        let idx = pool.intern("hello");
        assert_eq!(Value::new(ValueType::String, idx).to_string(&pool), "hello");
    }
}
