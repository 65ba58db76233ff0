use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;

use bitflags::bitflags;

use crate::errors::TableError;
use crate::qualifiers::{self, Qualifier};

bitflags! {
    /// Bitmask of configuration dimensions, matching Android's `ActivityInfo.CONFIG_*` values.
    ///
    /// Used both as the "changing configurations" of a value (which dimensions the resource
    /// varies over) and as the result of [`ResTableConfig::diff`].
    ///
    /// [Source Code](https://cs.android.com/android/platform/superproject/main/+/main:frameworks/native/include/android/configuration.h;l=57)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConfigChanges: u32 {
        const MCC = 0x0001;
        const MNC = 0x0002;
        const LOCALE = 0x0004;
        const TOUCHSCREEN = 0x0008;
        const KEYBOARD = 0x0010;
        const KEYBOARD_HIDDEN = 0x0020;
        const NAVIGATION = 0x0040;
        const ORIENTATION = 0x0080;
        const DENSITY = 0x0100;
        const SCREEN_SIZE = 0x0200;
        const VERSION = 0x0400;
        const SCREEN_LAYOUT = 0x0800;
        const UI_MODE = 0x1000;
        const SMALLEST_SCREEN_SIZE = 0x2000;
        const LAYOUTDIR = 0x4000;
        const SCREEN_ROUND = 0x8000;
        const COLOR_MODE = 0x10000;
        const GRAMMATICAL_GENDER = 0x20000;

        /// Additional flag indicating an entry is public
        const SPEC_PUBLIC = 0x4000_0000;
    }
}

/// Describes a particular device configuration, or the qualifiers a resource value was defined for.
///
/// Fields are stored decoded rather than as the packed unions of the binary format. A zero
/// field means "any" (the qualifier is not set).
///
/// [Source code](https://cs.android.com/android/platform/superproject/+/android-latest-release:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=967)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResTableConfig {
    /// Mobile country code (from SIM)
    pub mcc: u16,

    /// Mobile network code (from SIM)
    pub mnc: u16,

    /// Two ascii letters (ISO-639-1) or a packed ISO-639-2 three letter code
    pub language: [u8; 2],

    /// Two ascii letters region code or a packed UN M.49 code
    pub country: [u8; 2],

    pub grammatical_inflection: u8,

    /// Screen size, screen long and layout direction bits
    pub screen_layout: u8,

    pub smallest_screen_width_dp: u16,
    pub screen_width_dp: u16,
    pub screen_height_dp: u16,

    /// Round/notround bits
    pub screen_layout2: u8,

    /// Wide color gamut and HDR bits
    pub color_mode: u8,

    pub orientation: u8,

    /// UI mode type and night bits
    pub ui_mode: u8,

    pub density: u16,
    pub touchscreen: u8,
    pub keyboard: u8,
    pub navigation: u8,

    /// Keys hidden and navigation hidden bits
    pub input_flags: u8,

    pub screen_width: u16,
    pub screen_height: u16,

    pub sdk_version: u16,

    /// Must always be 0 in compiled tables, kept for completeness
    pub minor_version: u16,
}

impl ResTableConfig {
    pub const DENSITY_DEFAULT: u16 = 0;
    pub const DENSITY_LOW: u16 = 120;
    pub const DENSITY_MEDIUM: u16 = 160;
    pub const DENSITY_TV: u16 = 213;
    pub const DENSITY_HIGH: u16 = 240;
    pub const DENSITY_XHIGH: u16 = 320;
    pub const DENSITY_XXHIGH: u16 = 480;
    pub const DENSITY_XXXHIGH: u16 = 640;
    pub const DENSITY_ANY: u16 = 0xfffe;
    pub const DENSITY_NONE: u16 = 0xffff;

    pub const MASK_SCREENSIZE: u8 = 0x0f;
    pub const SCREENSIZE_SMALL: u8 = 0x01;
    pub const SCREENSIZE_NORMAL: u8 = 0x02;
    pub const SCREENSIZE_LARGE: u8 = 0x03;
    pub const SCREENSIZE_XLARGE: u8 = 0x04;

    pub const MASK_SCREENLONG: u8 = 0x30;
    pub const SCREENLONG_NO: u8 = 0x10;
    pub const SCREENLONG_YES: u8 = 0x20;

    pub const MASK_LAYOUTDIR: u8 = 0xc0;
    pub const LAYOUTDIR_LTR: u8 = 0x40;
    pub const LAYOUTDIR_RTL: u8 = 0x80;

    pub const MASK_SCREENROUND: u8 = 0x03;
    pub const SCREENROUND_NO: u8 = 0x01;
    pub const SCREENROUND_YES: u8 = 0x02;

    pub const MASK_WIDE_COLOR_GAMUT: u8 = 0x03;
    pub const WIDE_COLOR_GAMUT_NO: u8 = 0x01;
    pub const WIDE_COLOR_GAMUT_YES: u8 = 0x02;

    pub const MASK_HDR: u8 = 0x0c;
    pub const HDR_NO: u8 = 0x04;
    pub const HDR_YES: u8 = 0x08;

    pub const ORIENTATION_PORT: u8 = 0x01;
    pub const ORIENTATION_LAND: u8 = 0x02;
    pub const ORIENTATION_SQUARE: u8 = 0x03;

    pub const MASK_UI_MODE_TYPE: u8 = 0x0f;
    pub const UI_MODE_TYPE_NORMAL: u8 = 0x01;
    pub const UI_MODE_TYPE_DESK: u8 = 0x02;
    pub const UI_MODE_TYPE_CAR: u8 = 0x03;
    pub const UI_MODE_TYPE_TELEVISION: u8 = 0x04;
    pub const UI_MODE_TYPE_APPLIANCE: u8 = 0x05;
    pub const UI_MODE_TYPE_WATCH: u8 = 0x06;
    pub const UI_MODE_TYPE_VR_HEADSET: u8 = 0x07;

    pub const MASK_UI_MODE_NIGHT: u8 = 0x30;
    pub const UI_MODE_NIGHT_NO: u8 = 0x10;
    pub const UI_MODE_NIGHT_YES: u8 = 0x20;

    pub const TOUCHSCREEN_NOTOUCH: u8 = 0x01;
    pub const TOUCHSCREEN_STYLUS: u8 = 0x02;
    pub const TOUCHSCREEN_FINGER: u8 = 0x03;

    pub const MASK_KEYSHIDDEN: u8 = 0x03;
    pub const KEYSHIDDEN_NO: u8 = 0x01;
    pub const KEYSHIDDEN_YES: u8 = 0x02;
    pub const KEYSHIDDEN_SOFT: u8 = 0x03;

    pub const KEYBOARD_NOKEYS: u8 = 0x01;
    pub const KEYBOARD_QWERTY: u8 = 0x02;
    pub const KEYBOARD_12KEY: u8 = 0x03;

    pub const MASK_NAVHIDDEN: u8 = 0x0c;
    pub const NAVHIDDEN_NO: u8 = 0x04;
    pub const NAVHIDDEN_YES: u8 = 0x08;

    pub const NAVIGATION_NONAV: u8 = 0x01;
    pub const NAVIGATION_DPAD: u8 = 0x02;
    pub const NAVIGATION_TRACKBALL: u8 = 0x03;
    pub const NAVIGATION_WHEEL: u8 = 0x04;

    pub const MASK_GRAMMATICAL_GENDER: u8 = 0x03;
    pub const GRAMMATICAL_GENDER_NEUTER: u8 = 0x01;
    pub const GRAMMATICAL_GENDER_FEMININE: u8 = 0x02;
    pub const GRAMMATICAL_GENDER_MASCULINE: u8 = 0x03;

    #[inline(always)]
    fn screen_size_bits(&self) -> u8 {
        self.screen_layout & Self::MASK_SCREENSIZE
    }

    #[inline(always)]
    fn screen_long_bits(&self) -> u8 {
        self.screen_layout & Self::MASK_SCREENLONG
    }

    #[inline(always)]
    fn layout_dir_bits(&self) -> u8 {
        self.screen_layout & Self::MASK_LAYOUTDIR
    }

    #[inline(always)]
    fn screen_round_bits(&self) -> u8 {
        self.screen_layout2 & Self::MASK_SCREENROUND
    }

    #[inline(always)]
    fn wide_color_gamut_bits(&self) -> u8 {
        self.color_mode & Self::MASK_WIDE_COLOR_GAMUT
    }

    #[inline(always)]
    fn hdr_bits(&self) -> u8 {
        self.color_mode & Self::MASK_HDR
    }

    #[inline(always)]
    fn ui_mode_type_bits(&self) -> u8 {
        self.ui_mode & Self::MASK_UI_MODE_TYPE
    }

    #[inline(always)]
    fn ui_mode_night_bits(&self) -> u8 {
        self.ui_mode & Self::MASK_UI_MODE_NIGHT
    }

    #[inline(always)]
    fn keys_hidden_bits(&self) -> u8 {
        self.input_flags & Self::MASK_KEYSHIDDEN
    }

    #[inline(always)]
    fn nav_hidden_bits(&self) -> u8 {
        self.input_flags & Self::MASK_NAVHIDDEN
    }

    #[inline(always)]
    fn gender_bits(&self) -> u8 {
        self.grammatical_inflection & Self::MASK_GRAMMATICAL_GENDER
    }

    /// Returns `true` if a locale qualifier is set
    #[inline]
    pub fn has_locale(&self) -> bool {
        self.language != [0, 0]
    }

    /// Locale as a `language[-region]` tag, empty if no locale is set
    pub fn locale_tag(&self) -> String {
        if !self.has_locale() {
            return String::new();
        }

        let mut tag = qualifiers::decode_lang_or_country(self.language, b'a');
        if self.country != [0, 0] {
            tag.push('-');
            tag.push_str(&qualifiers::decode_lang_or_country(self.country, b'0'));
        }
        tag
    }

    /// Copy of this configuration with every field cleared except the locale
    pub fn locale_only(&self) -> ResTableConfig {
        ResTableConfig {
            language: self.language,
            country: self.country,
            ..ResTableConfig::default()
        }
    }

    /// Compute the set of dimensions in which `self` and `other` differ
    ///
    /// [Source Code](https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/ResourceTypes.cpp;l=2257)
    pub fn diff(&self, other: &ResTableConfig) -> ConfigChanges {
        let mut diffs = ConfigChanges::empty();

        if self.mcc != other.mcc {
            diffs |= ConfigChanges::MCC;
        }
        if self.mnc != other.mnc {
            diffs |= ConfigChanges::MNC;
        }
        if self.language != other.language || self.country != other.country {
            diffs |= ConfigChanges::LOCALE;
        }
        if self.gender_bits() != other.gender_bits() {
            diffs |= ConfigChanges::GRAMMATICAL_GENDER;
        }
        if self.orientation != other.orientation {
            diffs |= ConfigChanges::ORIENTATION;
        }
        if self.density != other.density {
            diffs |= ConfigChanges::DENSITY;
        }
        if self.touchscreen != other.touchscreen {
            diffs |= ConfigChanges::TOUCHSCREEN;
        }
        if self.keys_hidden_bits() != other.keys_hidden_bits() {
            diffs |= ConfigChanges::KEYBOARD_HIDDEN;
        }
        if self.nav_hidden_bits() != other.nav_hidden_bits() {
            diffs |= ConfigChanges::KEYBOARD_HIDDEN;
        }
        if self.keyboard != other.keyboard {
            diffs |= ConfigChanges::KEYBOARD;
        }
        if self.navigation != other.navigation {
            diffs |= ConfigChanges::NAVIGATION;
        }
        if self.screen_width != other.screen_width || self.screen_height != other.screen_height {
            diffs |= ConfigChanges::SCREEN_SIZE;
        }
        if self.sdk_version != other.sdk_version || self.minor_version != other.minor_version {
            diffs |= ConfigChanges::VERSION;
        }
        if self.layout_dir_bits() != other.layout_dir_bits() {
            diffs |= ConfigChanges::LAYOUTDIR;
        }
        if (self.screen_layout & !Self::MASK_LAYOUTDIR)
            != (other.screen_layout & !Self::MASK_LAYOUTDIR)
        {
            diffs |= ConfigChanges::SCREEN_LAYOUT;
        }
        if self.screen_round_bits() != other.screen_round_bits() {
            diffs |= ConfigChanges::SCREEN_ROUND;
        }
        if self.color_mode != other.color_mode {
            diffs |= ConfigChanges::COLOR_MODE;
        }
        if self.ui_mode != other.ui_mode {
            diffs |= ConfigChanges::UI_MODE;
        }
        if self.smallest_screen_width_dp != other.smallest_screen_width_dp {
            diffs |= ConfigChanges::SMALLEST_SCREEN_SIZE;
        }
        if self.screen_width_dp != other.screen_width_dp
            || self.screen_height_dp != other.screen_height_dp
        {
            diffs |= ConfigChanges::SCREEN_SIZE;
        }

        diffs
    }

    /// Returns `true` if a resource defined for `self` may be used on a device described by
    /// `settings`, i.e. every qualifier set in `self` is equal to or more general than the
    /// requested one.
    ///
    /// Density never disqualifies a candidate, the best density is picked by
    /// [`ResTableConfig::is_better_than`].
    ///
    /// [Source Code](https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/ResourceTypes.cpp;l=2823)
    pub fn matches(&self, settings: &ResTableConfig) -> bool {
        // a qualifier set on both sides must agree
        let conflicts = |mine: u8, theirs: u8| mine != 0 && theirs != 0 && mine != theirs;
        // a size qualifier must not exceed the requested size
        let exceeds = |mine: u16, theirs: u16| mine != 0 && theirs != 0 && mine > theirs;

        if self.mcc != 0 && self.mcc != settings.mcc {
            return false;
        }
        if self.mnc != 0 && self.mnc != settings.mnc {
            return false;
        }

        // locale is an opaque qualifier: language and region compare for equality only
        if self.language != [0, 0] && self.language != settings.language {
            return false;
        }
        if self.country != [0, 0] && self.country != settings.country {
            return false;
        }

        if self.gender_bits() != 0 && self.gender_bits() != settings.gender_bits() {
            return false;
        }

        if conflicts(self.layout_dir_bits(), settings.layout_dir_bits()) {
            return false;
        }
        // any screen size (small, normal, ...) up to the requested one is usable
        if exceeds(self.screen_size_bits() as u16, settings.screen_size_bits() as u16) {
            return false;
        }
        if conflicts(self.screen_long_bits(), settings.screen_long_bits())
            || conflicts(self.screen_round_bits(), settings.screen_round_bits())
            || conflicts(self.hdr_bits(), settings.hdr_bits())
            || conflicts(self.wide_color_gamut_bits(), settings.wide_color_gamut_bits())
            || conflicts(self.ui_mode_type_bits(), settings.ui_mode_type_bits())
            || conflicts(self.ui_mode_night_bits(), settings.ui_mode_night_bits())
        {
            return false;
        }

        if exceeds(self.smallest_screen_width_dp, settings.smallest_screen_width_dp)
            || exceeds(self.screen_width_dp, settings.screen_width_dp)
            || exceeds(self.screen_height_dp, settings.screen_height_dp)
        {
            return false;
        }

        if conflicts(self.orientation, settings.orientation)
            || conflicts(self.touchscreen, settings.touchscreen)
        {
            return false;
        }

        let keys_hidden = self.keys_hidden_bits();
        let settings_keys_hidden = settings.keys_hidden_bits();
        // "keys exposed" also applies when only a soft keyboard is available
        if conflicts(keys_hidden, settings_keys_hidden)
            && !(keys_hidden == Self::KEYSHIDDEN_NO
                && settings_keys_hidden == Self::KEYSHIDDEN_SOFT)
        {
            return false;
        }
        if conflicts(self.nav_hidden_bits(), settings.nav_hidden_bits())
            || conflicts(self.keyboard, settings.keyboard)
            || conflicts(self.navigation, settings.navigation)
        {
            return false;
        }

        if exceeds(self.screen_width, settings.screen_width)
            || exceeds(self.screen_height, settings.screen_height)
            || exceeds(self.sdk_version, settings.sdk_version)
        {
            return false;
        }
        if self.minor_version != 0 && self.minor_version != settings.minor_version {
            return false;
        }

        true
    }

    /// Returns `true` if `self` is a strictly better match than `o` for the `requested`
    /// configuration. Both configurations are expected to [match](ResTableConfig::matches)
    /// the requested one.
    ///
    /// Qualifiers are compared in precedence order; the first qualifier that differs and is
    /// set in the request decides. Density is nearest-match: the candidate with the smallest
    /// absolute difference wins, a tie goes to the higher density and `anydpi` always wins.
    ///
    /// [Source Code](https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/ResourceTypes.cpp;l=2543)
    pub fn is_better_than(&self, o: &ResTableConfig, requested: &ResTableConfig) -> bool {
        if self.mcc != o.mcc && requested.mcc != 0 {
            return self.mcc != 0;
        }
        if self.mnc != o.mnc && requested.mnc != 0 {
            return self.mnc != 0;
        }

        if requested.language != [0, 0] {
            if self.language != o.language {
                return self.language != [0, 0];
            }
            if self.country != o.country && requested.country != [0, 0] {
                return self.country != [0, 0];
            }
        }

        if self.gender_bits() != o.gender_bits() && requested.gender_bits() != 0 {
            return self.gender_bits() != 0;
        }

        if self.layout_dir_bits() != o.layout_dir_bits() && requested.layout_dir_bits() != 0 {
            return self.layout_dir_bits() > o.layout_dir_bits();
        }

        if self.smallest_screen_width_dp != o.smallest_screen_width_dp
            && requested.smallest_screen_width_dp != 0
        {
            return self.smallest_screen_width_dp > o.smallest_screen_width_dp;
        }

        if let Some(better) = Self::closer_size(
            (self.screen_width_dp, self.screen_height_dp),
            (o.screen_width_dp, o.screen_height_dp),
            (requested.screen_width_dp, requested.screen_height_dp),
        ) {
            return better;
        }

        if self.screen_size_bits() != o.screen_size_bits() && requested.screen_size_bits() != 0 {
            // "normal" is implied for unqualified resources on normal-or-larger screens
            let implied = |size: u8| {
                if size == 0 && requested.screen_size_bits() >= Self::SCREENSIZE_NORMAL {
                    Self::SCREENSIZE_NORMAL
                } else {
                    size
                }
            };
            let mine = implied(self.screen_size_bits());
            let other = implied(o.screen_size_bits());
            if mine == other {
                return self.screen_size_bits() != 0;
            }
            return mine > other;
        }
        if self.screen_long_bits() != o.screen_long_bits() && requested.screen_long_bits() != 0 {
            return self.screen_long_bits() != 0;
        }
        if self.screen_round_bits() != o.screen_round_bits()
            && requested.screen_round_bits() != 0
        {
            return self.screen_round_bits() != 0;
        }

        if self.hdr_bits() != o.hdr_bits() && requested.hdr_bits() != 0 {
            return self.hdr_bits() != 0;
        }
        if self.wide_color_gamut_bits() != o.wide_color_gamut_bits()
            && requested.wide_color_gamut_bits() != 0
        {
            return self.wide_color_gamut_bits() != 0;
        }

        if self.orientation != o.orientation && requested.orientation != 0 {
            return self.orientation != 0;
        }

        if self.ui_mode_type_bits() != o.ui_mode_type_bits() && requested.ui_mode_type_bits() != 0
        {
            return self.ui_mode_type_bits() != 0;
        }
        if self.ui_mode_night_bits() != o.ui_mode_night_bits()
            && requested.ui_mode_night_bits() != 0
        {
            return self.ui_mode_night_bits() != 0;
        }

        if self.density != o.density {
            match Self::compare_density(self.density, o.density, requested.density) {
                Ordering::Greater => return true,
                Ordering::Less => return false,
                Ordering::Equal => {}
            }
        }

        if self.touchscreen != o.touchscreen && requested.touchscreen != 0 {
            return self.touchscreen != 0;
        }

        let keys_hidden = self.keys_hidden_bits();
        let other_keys_hidden = o.keys_hidden_bits();
        let requested_keys_hidden = requested.keys_hidden_bits();
        if keys_hidden != other_keys_hidden && requested_keys_hidden != 0 {
            if keys_hidden == 0 {
                return false;
            }
            if other_keys_hidden == 0 {
                return true;
            }
            // "keys exposed" matches "soft" too, an exact match is more specific
            if requested_keys_hidden == keys_hidden {
                return true;
            }
            if requested_keys_hidden == other_keys_hidden {
                return false;
            }
        }

        if self.keyboard != o.keyboard && requested.keyboard != 0 {
            return self.keyboard != 0;
        }
        if self.nav_hidden_bits() != o.nav_hidden_bits() && requested.nav_hidden_bits() != 0 {
            return self.nav_hidden_bits() != 0;
        }
        if self.navigation != o.navigation && requested.navigation != 0 {
            return self.navigation != 0;
        }

        if let Some(better) = Self::closer_size(
            (self.screen_width, self.screen_height),
            (o.screen_width, o.screen_height),
            (requested.screen_width, requested.screen_height),
        ) {
            return better;
        }

        if self.sdk_version != o.sdk_version && requested.sdk_version != 0 {
            return self.sdk_version > o.sdk_version;
        }
        if self.minor_version != o.minor_version && requested.minor_version != 0 {
            return self.minor_version != 0;
        }

        false
    }

    /// Compare two width/height pairs by their distance to the requested size; `None` if
    /// neither is closer.
    fn closer_size(mine: (u16, u16), other: (u16, u16), requested: (u16, u16)) -> Option<bool> {
        if mine == other {
            return None;
        }

        let mut my_delta = 0i32;
        let mut other_delta = 0i32;
        if requested.0 != 0 {
            my_delta += requested.0 as i32 - mine.0 as i32;
            other_delta += requested.0 as i32 - other.0 as i32;
        }
        if requested.1 != 0 {
            my_delta += requested.1 as i32 - mine.1 as i32;
            other_delta += requested.1 as i32 - other.1 as i32;
        }

        if my_delta != other_delta {
            Some(my_delta < other_delta)
        } else {
            None
        }
    }

    /// Order two candidate densities for a request, `Greater` meaning `mine` is preferred
    ///
    /// Unset densities count as [`ResTableConfig::DENSITY_MEDIUM`], `anydpi` beats everything
    /// and `nodpi` loses against every concrete density.
    pub fn compare_density(mine: u16, other: u16, requested: u16) -> Ordering {
        let effective = |density: u16| {
            if density == Self::DENSITY_DEFAULT {
                Self::DENSITY_MEDIUM
            } else {
                density
            }
        };

        let mine = effective(mine);
        let other = effective(other);
        if mine == other {
            return Ordering::Equal;
        }

        if mine == Self::DENSITY_ANY {
            return Ordering::Greater;
        }
        if other == Self::DENSITY_ANY {
            return Ordering::Less;
        }
        if mine == Self::DENSITY_NONE {
            return Ordering::Less;
        }
        if other == Self::DENSITY_NONE {
            return Ordering::Greater;
        }

        let requested = match requested {
            Self::DENSITY_DEFAULT | Self::DENSITY_ANY | Self::DENSITY_NONE => {
                Self::DENSITY_MEDIUM
            }
            v => v,
        };

        let my_distance = (mine as i32 - requested as i32).abs();
        let other_distance = (other as i32 - requested as i32).abs();

        // nearer wins, on a tie the higher density wins
        other_distance
            .cmp(&my_distance)
            .then_with(|| mine.cmp(&other))
    }

    /// Returns `true` if `self` sets any qualifier `o` does not, in precedence order
    ///
    /// Used when no request is available, e.g. to order configurations for display.
    pub fn is_more_specific_than(&self, o: &ResTableConfig) -> bool {
        let diff = self.diff(o);
        if diff.is_empty() {
            return false;
        }

        let mine = self.specificity();
        let other = o.specificity();
        mine > other
    }

    /// Set qualifiers as a bitmask ordered by precedence, most important first
    fn specificity(&self) -> u32 {
        let fields = [
            self.mcc != 0,
            self.mnc != 0,
            self.has_locale(),
            self.gender_bits() != 0,
            self.layout_dir_bits() != 0,
            self.smallest_screen_width_dp != 0,
            self.screen_width_dp != 0 || self.screen_height_dp != 0,
            self.screen_size_bits() != 0,
            self.screen_long_bits() != 0,
            self.screen_round_bits() != 0,
            self.color_mode != 0,
            self.orientation != 0,
            self.ui_mode != 0,
            self.density != 0,
            self.touchscreen != 0,
            self.input_flags != 0,
            self.keyboard != 0,
            self.navigation != 0,
            self.screen_width != 0 || self.screen_height != 0,
            self.sdk_version != 0,
        ];

        fields
            .iter()
            .fold(0u32, |acc, &set| (acc << 1) | u32::from(set))
    }

    /// Qualifiers set in this configuration, in canonical directory-name order
    pub(crate) fn qualifiers(&self) -> Vec<Qualifier> {
        let mut result = Vec::new();

        if self.mcc != 0 {
            result.push(Qualifier::Mcc(self.mcc));
        }
        if self.mnc != 0 {
            result.push(Qualifier::Mnc(self.mnc));
        }
        if self.has_locale() {
            result.push(Qualifier::Language(self.language));
            if self.country != [0, 0] {
                result.push(Qualifier::Region(self.country));
            }
        }
        if self.gender_bits() != 0 {
            result.push(Qualifier::Gender(self.gender_bits()));
        }
        if self.layout_dir_bits() != 0 {
            result.push(Qualifier::LayoutDir(self.layout_dir_bits()));
        }
        if self.smallest_screen_width_dp != 0 {
            result.push(Qualifier::SmallestWidth(self.smallest_screen_width_dp));
        }
        if self.screen_width_dp != 0 {
            result.push(Qualifier::Width(self.screen_width_dp));
        }
        if self.screen_height_dp != 0 {
            result.push(Qualifier::Height(self.screen_height_dp));
        }
        if self.screen_size_bits() != 0 {
            result.push(Qualifier::ScreenSize(self.screen_size_bits()));
        }
        if self.screen_long_bits() != 0 {
            result.push(Qualifier::ScreenLong(self.screen_long_bits()));
        }
        if self.screen_round_bits() != 0 {
            result.push(Qualifier::ScreenRound(self.screen_round_bits()));
        }
        if self.wide_color_gamut_bits() != 0 {
            result.push(Qualifier::WideColorGamut(self.wide_color_gamut_bits()));
        }
        if self.hdr_bits() != 0 {
            result.push(Qualifier::Hdr(self.hdr_bits()));
        }
        if self.orientation != 0 {
            result.push(Qualifier::Orientation(self.orientation));
        }
        if self.ui_mode_type_bits() != 0 {
            result.push(Qualifier::UiModeType(self.ui_mode_type_bits()));
        }
        if self.ui_mode_night_bits() != 0 {
            result.push(Qualifier::UiModeNight(self.ui_mode_night_bits()));
        }
        if self.density != 0 {
            result.push(Qualifier::Density(self.density));
        }
        if self.touchscreen != 0 {
            result.push(Qualifier::Touchscreen(self.touchscreen));
        }
        if self.keys_hidden_bits() != 0 {
            result.push(Qualifier::KeysHidden(self.keys_hidden_bits()));
        }
        if self.keyboard != 0 {
            result.push(Qualifier::Keyboard(self.keyboard));
        }
        if self.nav_hidden_bits() != 0 {
            result.push(Qualifier::NavHidden(self.nav_hidden_bits()));
        }
        if self.navigation != 0 {
            result.push(Qualifier::Navigation(self.navigation));
        }
        if self.screen_width != 0 || self.screen_height != 0 {
            result.push(Qualifier::ScreenPixels(self.screen_width, self.screen_height));
        }
        if self.sdk_version != 0 {
            result.push(Qualifier::Version(self.sdk_version));
        }

        result
    }

    /// Apply a single parsed qualifier to this configuration
    pub(crate) fn apply(&mut self, qualifier: Qualifier) {
        match qualifier {
            Qualifier::Mcc(v) => self.mcc = v,
            Qualifier::Mnc(v) => self.mnc = v,
            Qualifier::Language(v) => self.language = v,
            Qualifier::Region(v) => self.country = v,
            Qualifier::Gender(v) => {
                self.grammatical_inflection =
                    (self.grammatical_inflection & !Self::MASK_GRAMMATICAL_GENDER) | v
            }
            Qualifier::LayoutDir(v) => {
                self.screen_layout = (self.screen_layout & !Self::MASK_LAYOUTDIR) | v
            }
            Qualifier::SmallestWidth(v) => self.smallest_screen_width_dp = v,
            Qualifier::Width(v) => self.screen_width_dp = v,
            Qualifier::Height(v) => self.screen_height_dp = v,
            Qualifier::ScreenSize(v) => {
                self.screen_layout = (self.screen_layout & !Self::MASK_SCREENSIZE) | v
            }
            Qualifier::ScreenLong(v) => {
                self.screen_layout = (self.screen_layout & !Self::MASK_SCREENLONG) | v
            }
            Qualifier::ScreenRound(v) => {
                self.screen_layout2 = (self.screen_layout2 & !Self::MASK_SCREENROUND) | v
            }
            Qualifier::WideColorGamut(v) => {
                self.color_mode = (self.color_mode & !Self::MASK_WIDE_COLOR_GAMUT) | v
            }
            Qualifier::Hdr(v) => self.color_mode = (self.color_mode & !Self::MASK_HDR) | v,
            Qualifier::Orientation(v) => self.orientation = v,
            Qualifier::UiModeType(v) => {
                self.ui_mode = (self.ui_mode & !Self::MASK_UI_MODE_TYPE) | v
            }
            Qualifier::UiModeNight(v) => {
                self.ui_mode = (self.ui_mode & !Self::MASK_UI_MODE_NIGHT) | v
            }
            Qualifier::Density(v) => self.density = v,
            Qualifier::Touchscreen(v) => self.touchscreen = v,
            Qualifier::KeysHidden(v) => {
                self.input_flags = (self.input_flags & !Self::MASK_KEYSHIDDEN) | v
            }
            Qualifier::Keyboard(v) => self.keyboard = v,
            Qualifier::NavHidden(v) => {
                self.input_flags = (self.input_flags & !Self::MASK_NAVHIDDEN) | v
            }
            Qualifier::Navigation(v) => self.navigation = v,
            Qualifier::ScreenPixels(w, h) => {
                self.screen_width = w;
                self.screen_height = h;
            }
            Qualifier::Version(v) => self.sdk_version = v,
        }
    }
}

/// Format as a resource directory qualifier string, e.g. `en-rUS-land-hdpi-v21`
///
/// The default configuration formats as an empty string.
///
/// [Source Code](https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/ResourceTypes.cpp;l=3368)
impl Display for ResTableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, qualifier) in self.qualifiers().iter().enumerate() {
            if i != 0 {
                f.write_str("-")?;
            }
            write!(f, "{}", qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for ResTableConfig {
    type Err = TableError;

    /// Parse a qualifier string such as `fr-rCA-sw600dp-night-xhdpi-v26`
    ///
    /// An empty string, `default` or `any` yields the default configuration.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut config = ResTableConfig::default();

        let s = s.trim();
        if s.is_empty() || s == "default" || s == "any" {
            return Ok(config);
        }

        for token in s.split('-') {
            let qualifier = qualifiers::parse_qualifier(token)
                .ok_or_else(|| TableError::InvalidQualifier(token.to_owned()))?;
            config.apply(qualifier);
        }

        Ok(config)
    }
}
