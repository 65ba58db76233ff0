use apk_res_table::{Value, ValueType};
use log::debug;
use smallvec::SmallVec;

use crate::asset_manager::{AssetManager, SelectedValue};

/// Maximum number of hops followed when resolving a reference or attribute chain
pub const MAX_REFERENCE_DEPTH: usize = 20;

impl AssetManager {
    /// Follow `reference` values until a concrete value is reached
    ///
    /// On success `value` holds the last hop: its cookie, resource id and
    /// configuration, with the change flags of every hop combined. A reference to
    /// a bag stops at the bag, `@0` becomes the null value. Returns `false` on a
    /// missing target, a cycle or a chain longer than [`MAX_REFERENCE_DEPTH`], in
    /// which case `value` is left untouched.
    pub fn resolve_reference(&self, value: &mut SelectedValue) -> bool {
        let mut current = *value;
        let mut visited: SmallVec<[u32; 8]> = SmallVec::new();

        for _ in 0..MAX_REFERENCE_DEPTH {
            if current.data_type() != ValueType::Reference {
                *value = current;
                return true;
            }

            let resid = current.data();
            if resid == 0 {
                current.value = Value::undefined();
                *value = current;
                return true;
            }

            if visited.contains(&resid) {
                debug!("reference cycle through {:#010x}", resid);
                return false;
            }
            visited.push(resid);

            let Some((next, is_bag)) = self.select_resource(resid, true, None) else {
                debug!("failed to resolve reference to {:#010x}", resid);
                return false;
            };

            let flags = current.flags | next.flags;
            current = SelectedValue { flags, ..next };

            if is_bag {
                *value = current;
                return true;
            }
        }

        debug!("reference chain from {:#010x} is too deep", value.data());
        false
    }
}

#[cfg(test)]
mod tests {
    use apk_res_table::ConfigChanges;

    use crate::apk_assets::PropertyFlags;
    use crate::asset_manager::Cookie;
    use crate::asset_manager::tests::{manager, source};

    use super::*;

    fn resolve(am: &AssetManager, resid: u32) -> Option<SelectedValue> {
        let mut value = SelectedValue::detached(Value::reference(resid));
        am.resolve_reference(&mut value).then_some(value)
    }

    #[test]
    fn follows_chain_to_literal() {
        let base = source("base.json", PropertyFlags::empty(), |b| {
            b.package(0x7f, "app")
                .value(0x7f010000, "color/a", "@color/b")
                .value(0x7f010001, "color/b", "@color/c")
                .value(0x7f010002, "color/c", "#ff0000");
        });
        let overlay = source("overlay.json", PropertyFlags::OVERLAY, |b| {
            b.package(0x7f, "app")
                .value(0x7f010002, "color/c", "#0000ff")
                .value_for(0x7f010002, "color/c", "night", "#00ff00")
                .value(0x7f010001, "color/b", "@0x7f010002");
        });
        let mut am = manager(vec![base, overlay]);
        am.set_configurations(vec!["night".parse().unwrap()], false)
            .unwrap();

        let value = resolve(&am, 0x7f010000).unwrap();
        assert_eq!(value.data_type(), ValueType::ColorRgb8);
        assert_eq!(value.data(), 0xff00ff00);
        assert_eq!(value.resid, 0x7f010002);
        assert_eq!(value.cookie, Cookie(1));
        assert_eq!(value.config.to_string(), "night");
        assert!(value.flags.contains(ConfigChanges::UI_MODE));
    }

    #[test]
    fn cycle_across_sources_fails() {
        let first = source("first.json", PropertyFlags::empty(), |b| {
            b.package(0x7f, "app")
                .value(0x7f010000, "color/a", "@0x7f010001")
                .value(0x7f010001, "color/b", "#ffffff");
        });
        let second = source("second.json", PropertyFlags::empty(), |b| {
            b.package(0x7f, "app")
                .value(0x7f010001, "color/b", "@0x7f010000");
        });
        let am = manager(vec![first, second]);
        assert!(resolve(&am, 0x7f010001).is_none());

        let mut value = SelectedValue::detached(Value::reference(0x7f010000));
        let before = value;
        assert!(!am.resolve_reference(&mut value));
        assert_eq!(value, before);
    }

    #[test]
    fn special_targets() {
        let base = source("base.json", PropertyFlags::empty(), |b| {
            b.package(0x7f, "app")
                .value(0x7f010000, "string/none", "@null")
                .value(0x7f010001, "string/missing", "@0x7f010099")
                .value(0x7f010002, "string/to_style", "@style/Base")
                .value(0x7f010003, "string/plain", "text")
                .bag(0x7f020000, "style/Base", "", &[]);
        });
        let am = manager(vec![base]);

        let null = resolve(&am, 0x7f010000).unwrap();
        assert_eq!(null.data_type(), ValueType::Null);
        assert_eq!(null.data(), Value::DATA_NULL_UNDEFINED);
        assert_eq!(null.resid, 0x7f010000);

        assert!(resolve(&am, 0x7f010001).is_none());

        let style = resolve(&am, 0x7f010002).unwrap();
        assert_eq!(style.value, Value::reference(0x7f020000));
        assert_eq!(style.resid, 0x7f020000);

        let plain = resolve(&am, 0x7f010003).unwrap();
        assert_eq!(am.format_value(&plain), "text");

        let mut literal = SelectedValue::detached(Value::int(5));
        assert!(am.resolve_reference(&mut literal));
        assert_eq!(literal.value, Value::int(5));
    }

    #[test]
    fn long_chain_is_bounded() {
        let base = source("base.json", PropertyFlags::empty(), |b| {
            b.package(0x7f, "app");
            for i in 0..30u32 {
                let resid = 0x7f010000 + i;
                b.value(resid, &format!("integer/i{}", i), &format!("@{:#x}", resid + 1));
            }
            b.value(0x7f01001e, "integer/end", "1");
        });
        let am = manager(vec![base]);

        assert!(resolve(&am, 0x7f01001a).is_some());
        assert!(resolve(&am, 0x7f010000).is_none());
    }
}
