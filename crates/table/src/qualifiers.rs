use std::fmt::{self, Display};

use phf::phf_map;
use winnow::ascii::dec_uint;
use winnow::combinator::{alt, delimited, preceded, separated_pair, terminated};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::config::ResTableConfig as C;

/// One qualifier of a resource directory name, e.g. `land` or `sw600dp`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Qualifier {
    Mcc(u16),
    Mnc(u16),
    Language([u8; 2]),
    Region([u8; 2]),
    Gender(u8),
    LayoutDir(u8),
    SmallestWidth(u16),
    Width(u16),
    Height(u16),
    ScreenSize(u8),
    ScreenLong(u8),
    ScreenRound(u8),
    WideColorGamut(u8),
    Hdr(u8),
    Orientation(u8),
    UiModeType(u8),
    UiModeNight(u8),
    Density(u16),
    Touchscreen(u8),
    KeysHidden(u8),
    Keyboard(u8),
    NavHidden(u8),
    Navigation(u8),
    ScreenPixels(u16, u16),
    Version(u16),
}

/// Fixed-name qualifiers
static KEYWORDS: phf::Map<&'static str, Qualifier> = phf_map! {
    "neuter" => Qualifier::Gender(C::GRAMMATICAL_GENDER_NEUTER),
    "feminine" => Qualifier::Gender(C::GRAMMATICAL_GENDER_FEMININE),
    "masculine" => Qualifier::Gender(C::GRAMMATICAL_GENDER_MASCULINE),

    "ldltr" => Qualifier::LayoutDir(C::LAYOUTDIR_LTR),
    "ldrtl" => Qualifier::LayoutDir(C::LAYOUTDIR_RTL),

    "small" => Qualifier::ScreenSize(C::SCREENSIZE_SMALL),
    "normal" => Qualifier::ScreenSize(C::SCREENSIZE_NORMAL),
    "large" => Qualifier::ScreenSize(C::SCREENSIZE_LARGE),
    "xlarge" => Qualifier::ScreenSize(C::SCREENSIZE_XLARGE),

    "notlong" => Qualifier::ScreenLong(C::SCREENLONG_NO),
    "long" => Qualifier::ScreenLong(C::SCREENLONG_YES),

    "notround" => Qualifier::ScreenRound(C::SCREENROUND_NO),
    "round" => Qualifier::ScreenRound(C::SCREENROUND_YES),

    "nowidecg" => Qualifier::WideColorGamut(C::WIDE_COLOR_GAMUT_NO),
    "widecg" => Qualifier::WideColorGamut(C::WIDE_COLOR_GAMUT_YES),

    "lowdr" => Qualifier::Hdr(C::HDR_NO),
    "highdr" => Qualifier::Hdr(C::HDR_YES),

    "port" => Qualifier::Orientation(C::ORIENTATION_PORT),
    "land" => Qualifier::Orientation(C::ORIENTATION_LAND),
    "square" => Qualifier::Orientation(C::ORIENTATION_SQUARE),

    "desk" => Qualifier::UiModeType(C::UI_MODE_TYPE_DESK),
    "car" => Qualifier::UiModeType(C::UI_MODE_TYPE_CAR),
    "television" => Qualifier::UiModeType(C::UI_MODE_TYPE_TELEVISION),
    "appliance" => Qualifier::UiModeType(C::UI_MODE_TYPE_APPLIANCE),
    "watch" => Qualifier::UiModeType(C::UI_MODE_TYPE_WATCH),
    "vrheadset" => Qualifier::UiModeType(C::UI_MODE_TYPE_VR_HEADSET),

    "notnight" => Qualifier::UiModeNight(C::UI_MODE_NIGHT_NO),
    "night" => Qualifier::UiModeNight(C::UI_MODE_NIGHT_YES),

    "ldpi" => Qualifier::Density(C::DENSITY_LOW),
    "mdpi" => Qualifier::Density(C::DENSITY_MEDIUM),
    "tvdpi" => Qualifier::Density(C::DENSITY_TV),
    "hdpi" => Qualifier::Density(C::DENSITY_HIGH),
    "xhdpi" => Qualifier::Density(C::DENSITY_XHIGH),
    "xxhdpi" => Qualifier::Density(C::DENSITY_XXHIGH),
    "xxxhdpi" => Qualifier::Density(C::DENSITY_XXXHIGH),
    "anydpi" => Qualifier::Density(C::DENSITY_ANY),
    "nodpi" => Qualifier::Density(C::DENSITY_NONE),

    "notouch" => Qualifier::Touchscreen(C::TOUCHSCREEN_NOTOUCH),
    "stylus" => Qualifier::Touchscreen(C::TOUCHSCREEN_STYLUS),
    "finger" => Qualifier::Touchscreen(C::TOUCHSCREEN_FINGER),

    "keysexposed" => Qualifier::KeysHidden(C::KEYSHIDDEN_NO),
    "keyshidden" => Qualifier::KeysHidden(C::KEYSHIDDEN_YES),
    "keyssoft" => Qualifier::KeysHidden(C::KEYSHIDDEN_SOFT),

    "nokeys" => Qualifier::Keyboard(C::KEYBOARD_NOKEYS),
    "qwerty" => Qualifier::Keyboard(C::KEYBOARD_QWERTY),
    "12key" => Qualifier::Keyboard(C::KEYBOARD_12KEY),

    "navexposed" => Qualifier::NavHidden(C::NAVHIDDEN_NO),
    "navhidden" => Qualifier::NavHidden(C::NAVHIDDEN_YES),

    "nonav" => Qualifier::Navigation(C::NAVIGATION_NONAV),
    "dpad" => Qualifier::Navigation(C::NAVIGATION_DPAD),
    "trackball" => Qualifier::Navigation(C::NAVIGATION_TRACKBALL),
    "wheel" => Qualifier::Navigation(C::NAVIGATION_WHEEL),
};

/// Parse one `-`-separated token of a qualifier string
pub(crate) fn parse_qualifier(token: &str) -> Option<Qualifier> {
    if let Some(qualifier) = KEYWORDS.get(token) {
        return Some(*qualifier);
    }

    alt((
        preceded("mcc", dec_uint).map(Qualifier::Mcc),
        preceded("mnc", dec_uint).map(Qualifier::Mnc),
        delimited("sw", dec_uint, "dp").map(Qualifier::SmallestWidth),
        delimited("w", dec_uint, "dp").map(Qualifier::Width),
        delimited("h", dec_uint, "dp").map(Qualifier::Height),
        terminated(dec_uint, "dpi").map(Qualifier::Density),
        separated_pair(dec_uint, 'x', dec_uint).map(|(w, h)| Qualifier::ScreenPixels(w, h)),
        preceded('v', dec_uint).map(Qualifier::Version),
        preceded('r', region),
        language,
    ))
    .parse(token)
    .ok()
}

fn region(input: &mut &str) -> ModalResult<Qualifier> {
    alt((
        take_while(2, |c: char| c.is_ascii_uppercase()),
        take_while(3, |c: char| c.is_ascii_digit()),
    ))
    .map(|code: &str| Qualifier::Region(encode_lang_or_country(code, b'0')))
    .parse_next(input)
}

fn language(input: &mut &str) -> ModalResult<Qualifier> {
    take_while(2..=3, |c: char| c.is_ascii_lowercase())
        .map(|code: &str| Qualifier::Language(encode_lang_or_country(code, b'a')))
        .parse_next(input)
}

/// Pack a two or three letter code into two bytes
///
/// Two letter codes are stored as-is. Three letter codes are packed 5 bits per letter,
/// relative to `base`, with the high bit set:
///
/// ```text
///   {1, t, t, t, t, t, s, s, s, s, s, f, f, f, f, f}
/// ```
pub(crate) fn encode_lang_or_country(code: &str, base: u8) -> [u8; 2] {
    let bytes = code.as_bytes();
    match bytes.len() {
        2 => [bytes[0], bytes[1]],
        3 => {
            let first = bytes[0].wrapping_sub(base) & 0x1f;
            let second = bytes[1].wrapping_sub(base) & 0x1f;
            let third = bytes[2].wrapping_sub(base) & 0x1f;
            [0x80 | (third << 2) | (second >> 3), (second << 5) | first]
        }
        _ => [0, 0],
    }
}

/// Inverse of [`encode_lang_or_country`]
pub(crate) fn decode_lang_or_country(raw: [u8; 2], base: u8) -> String {
    if raw == [0, 0] {
        return String::new();
    }

    if raw[0] & 0x80 == 0 {
        return String::from_utf8_lossy(&raw).into_owned();
    }

    let first = raw[1] & 0x1f;
    let second = ((raw[1] & 0xe0) >> 5) | ((raw[0] & 0x03) << 3);
    let third = (raw[0] & 0x7c) >> 2;

    [first + base, second + base, third + base]
        .iter()
        .map(|&b| b as char)
        .collect()
}

impl Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((name, _)) = KEYWORDS.entries().find(|(_, q)| *q == self) {
            return f.write_str(name);
        }

        match self {
            Qualifier::Mcc(v) => write!(f, "mcc{}", v),
            Qualifier::Mnc(v) => write!(f, "mnc{}", v),
            Qualifier::Language(raw) => f.write_str(&decode_lang_or_country(*raw, b'a')),
            Qualifier::Region(raw) => write!(f, "r{}", decode_lang_or_country(*raw, b'0')),
            Qualifier::SmallestWidth(v) => write!(f, "sw{}dp", v),
            Qualifier::Width(v) => write!(f, "w{}dp", v),
            Qualifier::Height(v) => write!(f, "h{}dp", v),
            Qualifier::Density(v) => write!(f, "{}dpi", v),
            Qualifier::ScreenPixels(w, h) => write!(f, "{}x{}", w, h),
            Qualifier::Version(v) => write!(f, "v{}", v),
            // enumerated values outside of the known set
            Qualifier::Gender(v)
            | Qualifier::LayoutDir(v)
            | Qualifier::ScreenSize(v)
            | Qualifier::ScreenLong(v)
            | Qualifier::ScreenRound(v)
            | Qualifier::WideColorGamut(v)
            | Qualifier::Hdr(v)
            | Qualifier::Orientation(v)
            | Qualifier::UiModeType(v)
            | Qualifier::UiModeNight(v)
            | Qualifier::Touchscreen(v)
            | Qualifier::KeysHidden(v)
            | Qualifier::Keyboard(v)
            | Qualifier::NavHidden(v)
            | Qualifier::Navigation(v) => write!(f, "unknown_{:#x}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords() {
        assert_eq!(parse_qualifier("land"), Some(Qualifier::Orientation(2)));
        assert_eq!(parse_qualifier("xxhdpi"), Some(Qualifier::Density(480)));
        assert_eq!(parse_qualifier("night"), Some(Qualifier::UiModeNight(0x20)));
    }

    #[test]
    fn numeric_qualifiers() {
        assert_eq!(parse_qualifier("mcc310"), Some(Qualifier::Mcc(310)));
        assert_eq!(parse_qualifier("sw600dp"), Some(Qualifier::SmallestWidth(600)));
        assert_eq!(parse_qualifier("w820dp"), Some(Qualifier::Width(820)));
        assert_eq!(parse_qualifier("h480dp"), Some(Qualifier::Height(480)));
        assert_eq!(parse_qualifier("180dpi"), Some(Qualifier::Density(180)));
        assert_eq!(parse_qualifier("800x480"), Some(Qualifier::ScreenPixels(800, 480)));
        assert_eq!(parse_qualifier("v33"), Some(Qualifier::Version(33)));
        assert_eq!(parse_qualifier("v"), None);
    }

    #[test]
    fn languages_and_regions() {
        assert_eq!(parse_qualifier("en"), Some(Qualifier::Language(*b"en")));
        assert_eq!(parse_qualifier("rGB"), Some(Qualifier::Region(*b"GB")));
        assert_eq!(parse_qualifier("EN"), None);
        assert_eq!(parse_qualifier("english"), None);

        let Some(Qualifier::Language(raw)) = parse_qualifier("fil") else {
            panic!("expected a language");
        };
        assert_eq!(raw[0] & 0x80, 0x80);
        assert_eq!(decode_lang_or_country(raw, b'a'), "fil");

        let Some(Qualifier::Region(raw)) = parse_qualifier("r419") else {
            panic!("expected a region");
        };
        assert_eq!(decode_lang_or_country(raw, b'0'), "419");
    }

    #[test]
    fn display() {
        assert_eq!(Qualifier::Density(160).to_string(), "mdpi");
        assert_eq!(Qualifier::Density(180).to_string(), "180dpi");
        assert_eq!(Qualifier::Region(*b"US").to_string(), "rUS");
        assert_eq!(Qualifier::Orientation(9).to_string(), "unknown_0x9");
    }
}
