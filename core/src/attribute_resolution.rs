//! Batch retrieval of attributes from XML attributes, styles and a theme
//!
//! [Source Code](https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/AttributeResolution.cpp)

use apk_res_table::parse::{Literal, parse_literal};
use apk_res_table::{StringPool, Value, ValueType};
use log::debug;
use serde::Serialize;

use crate::asset_manager::{AssetManager, Cookie, SelectedValue};
use crate::bag::ResolvedBag;
use crate::errors::ResourceError;
use crate::theme::Theme;

/// Layer a retrieved attribute value was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeSource {
    /// Not defined anywhere
    Undefined,
    /// Value passed by the caller
    Explicit,
    XmlAttribute,
    XmlStyle,
    DefaultStyle,
    Theme,
}

/// Fully resolved value of one requested attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttribute {
    pub attr: u32,
    pub value: SelectedValue,
    pub source: AttributeSource,

    /// Style or XML resource that supplied the value, 0 if unknown
    pub source_resid: u32,

    /// Text of string values
    pub string: Option<String>,
}

impl ResolvedAttribute {
    fn undefined(attr: u32) -> ResolvedAttribute {
        ResolvedAttribute {
            attr,
            value: SelectedValue::detached(Value::undefined()),
            source: AttributeSource::Undefined,
            source_resid: 0,
            string: None,
        }
    }

    /// `@empty` counts as defined, `@undefined` does not
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.value.data_type() != ValueType::Null || self.value.data() == Value::DATA_NULL_EMPTY
    }
}

/// One result per requested attribute, with the positions of the defined ones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeResults {
    pub values: Vec<ResolvedAttribute>,
    pub indices: Vec<usize>,
}

impl AttributeResults {
    fn push(&mut self, attribute: ResolvedAttribute) {
        if attribute.is_defined() {
            self.indices.push(self.values.len());
        }
        self.values.push(attribute);
    }
}

/// Attributes of one XML element, with their own string pool
#[derive(Debug, Clone, Default)]
pub struct XmlAttributeSet {
    /// `style` attribute of the element: a reference, a theme attribute or null
    pub style: Value,

    /// Resource id of the XML file, reported as the source of its attributes
    pub source_resid: u32,

    attributes: Vec<(u32, Value)>,
    strings: StringPool,
}

impl XmlAttributeSet {
    pub fn new() -> XmlAttributeSet {
        XmlAttributeSet::default()
    }

    pub fn push(&mut self, attr: u32, value: Value) -> &mut Self {
        self.attributes.push((attr, value));
        self
    }

    pub fn push_string(&mut self, attr: u32, s: &str) -> &mut Self {
        let idx = self.strings.intern(s);
        self.push(attr, Value::new(ValueType::String, idx))
    }

    /// Build from attribute names and value texts, names are looked up in `am`
    ///
    /// Attribute names default to the `attr` type: `android:textColor`,
    /// `app:attr/tint`, `0x7f010000`. Values use the resource XML notation.
    pub fn from_text(
        am: &AssetManager,
        style: Option<&str>,
        attributes: &[(&str, &str)],
    ) -> Result<XmlAttributeSet, ResourceError> {
        let mut set = XmlAttributeSet::new();

        if let Some(style) = style {
            let value = match parse_value(am, style)? {
                Literal::Value(value) => value,
                _ => {
                    return Err(ResourceError::InvalidArgument(format!(
                        "style {:?} is not a reference",
                        style
                    )));
                }
            };
            set.style = value;
        }

        for (name, text) in attributes {
            let attr = lookup_attribute(am, name)?;
            match parse_value(am, text)? {
                Literal::Value(value) => set.push(attr, value),
                Literal::String(s) => set.push_string(attr, &s),
                Literal::Name { name, .. } => {
                    return Err(ResourceError::InvalidArgument(format!(
                        "unresolved name {}",
                        name
                    )));
                }
            };
        }

        Ok(set)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Last value given for `attr`
    pub fn find(&self, attr: u32) -> Option<Value> {
        self.attributes
            .iter()
            .rev()
            .find(|(id, _)| *id == attr)
            .map(|(_, value)| *value)
    }

    pub fn string(&self, idx: u32) -> Option<&str> {
        self.strings.get(idx)
    }
}

fn lookup_attribute(am: &AssetManager, name: &str) -> Result<u32, ResourceError> {
    if let Ok(Literal::Value(value)) = parse_literal(&format!("?{}", name))
        && value.data_type == ValueType::Attribute
    {
        return Ok(value.data);
    }
    am.get_resource_id(name, Some("attr"), None)
        .ok_or_else(|| ResourceError::InvalidArgument(format!("unknown attribute {}", name)))
}

/// Parse a value text, resolving names to ids through `am`
fn parse_value(am: &AssetManager, text: &str) -> Result<Literal, ResourceError> {
    match parse_literal(text)? {
        Literal::Name { name, attribute } => {
            let default_type = if attribute { Some("attr") } else { None };
            let id = am
                .get_resource_id(&name, default_type, None)
                .ok_or_else(|| ResourceError::InvalidArgument(format!("unknown resource {}", text)))?;
            Ok(Literal::Value(if attribute {
                Value::attribute(id)
            } else {
                Value::reference(id)
            }))
        }
        literal => Ok(literal),
    }
}

/// Style named by a theme attribute, falling back to an explicit style
fn default_style_bag(
    am: &AssetManager,
    theme: &Theme,
    def_style_attr: u32,
    def_style_res: u32,
) -> Option<std::sync::Arc<ResolvedBag>> {
    let mut style = def_style_res;
    if def_style_attr != 0
        && let Some(value) = theme.get_attribute(def_style_attr)
        && value.data_type() == ValueType::Reference
    {
        style = value.data();
    }

    if style == 0 {
        return None;
    }
    am.get_bag(style)
}

fn bag_value(bag: &ResolvedBag, attr: u32) -> Option<(SelectedValue, u32)> {
    bag.find(attr).map(|entry| (bag.selected(entry), entry.style))
}

/// Resolve whatever a layer supplied, or fall back to the theme
fn finish(
    am: &AssetManager,
    theme: Option<&Theme>,
    xml: Option<&XmlAttributeSet>,
    attr: u32,
    found: Option<(SelectedValue, AttributeSource, u32)>,
) -> ResolvedAttribute {
    let mut result = ResolvedAttribute::undefined(attr);
    let mut indirect = false;

    match found.filter(|(value, ..)| !value.value.is_undefined()) {
        Some((mut value, source, source_resid)) => {
            indirect = matches!(
                value.data_type(),
                ValueType::Reference | ValueType::Attribute
            );
            if value.data_type() != ValueType::Null {
                match theme {
                    Some(theme) => theme.resolve_attribute_in(am, &mut value),
                    None => am.resolve_reference(&mut value),
                };
            }
            result.value = value;
            result.source = source;
            result.source_resid = source_resid;
        }
        None => {
            // undefined in every other layer, fall back to the theme
            if let Some((mut value, style)) = theme.and_then(|t| t.lookup(attr)) {
                indirect = value.data_type() == ValueType::Reference;
                am.resolve_reference(&mut value);
                result.value = value;
                result.source = AttributeSource::Theme;
                result.source_resid = style;
            }
        }
    }

    // @null, directly or at the end of a reference chain
    if result.value.value.is_null_reference() || (indirect && result.value.value.is_undefined()) {
        result.value.value = Value::empty();
        result.value.cookie = Cookie::INVALID;
    }

    if result.value.data_type() == ValueType::String {
        result.string = if result.value.cookie.is_valid() {
            am.value_string(&result.value).map(str::to_owned)
        } else {
            xml.and_then(|xml| xml.string(result.value.data()))
                .map(str::to_owned)
        };
    }

    result
}

/// Resolve `attrs` from explicit values, a default style and the theme, in that order
///
/// `values` holds one optional value per attribute; `@undefined` slots are skipped.
pub fn resolve_attrs(
    am: &AssetManager,
    theme: &Theme,
    def_style_attr: u32,
    def_style_res: u32,
    values: Option<&[Value]>,
    attrs: &[u32],
) -> Result<AttributeResults, ResourceError> {
    theme.check_registry(am)?;
    if let Some(values) = values
        && values.len() > attrs.len()
    {
        return Err(ResourceError::InvalidArgument(format!(
            "{} values for {} attributes",
            values.len(),
            attrs.len()
        )));
    }

    let def_style = default_style_bag(am, theme, def_style_attr, def_style_res);

    let mut results = AttributeResults::default();
    for (idx, &attr) in attrs.iter().enumerate() {
        let explicit = values
            .and_then(|values| values.get(idx))
            .filter(|value| !value.is_undefined());

        let found = match explicit {
            Some(value) => Some((SelectedValue::detached(*value), AttributeSource::Explicit, 0)),
            None => def_style
                .as_deref()
                .and_then(|bag| bag_value(bag, attr))
                .map(|(value, style)| (value, AttributeSource::DefaultStyle, style)),
        };

        results.push(finish(am, Some(theme), None, attr, found));
    }

    debug!(
        "resolved {} of {} attribute(s)",
        results.indices.len(),
        attrs.len()
    );
    Ok(results)
}

/// Resolve `attrs` for an XML element
///
/// Precedence: XML attribute, the element's `style`, the default style, the theme.
pub fn apply_style(
    am: &AssetManager,
    theme: &Theme,
    xml: Option<&XmlAttributeSet>,
    def_style_attr: u32,
    def_style_res: u32,
    attrs: &[u32],
) -> Result<AttributeResults, ResourceError> {
    theme.check_registry(am)?;

    let def_style = default_style_bag(am, theme, def_style_attr, def_style_res);

    let xml_style = xml.and_then(|xml| {
        let mut style = SelectedValue::detached(xml.style);
        if style.data_type() == ValueType::Attribute {
            style = theme.get_attribute(style.data())?;
        }
        if style.data_type() == ValueType::Reference && style.data() != 0 {
            am.get_bag(style.data())
        } else {
            None
        }
    });

    let mut results = AttributeResults::default();
    for &attr in attrs {
        let from_xml = xml.and_then(|xml| {
            xml.find(attr).map(|value| {
                (
                    SelectedValue::detached(value),
                    AttributeSource::XmlAttribute,
                    xml.source_resid,
                )
            })
        });

        let found = from_xml
            .or_else(|| {
                xml_style
                    .as_deref()
                    .and_then(|bag| bag_value(bag, attr))
                    .map(|(value, style)| (value, AttributeSource::XmlStyle, style))
            })
            .or_else(|| {
                def_style
                    .as_deref()
                    .and_then(|bag| bag_value(bag, attr))
                    .map(|(value, style)| (value, AttributeSource::DefaultStyle, style))
            });

        results.push(finish(am, Some(theme), xml, attr, found));
    }

    Ok(results)
}

/// Resolve `attrs` from XML attributes alone, without a theme
pub fn retrieve_attributes(
    am: &AssetManager,
    xml: &XmlAttributeSet,
    attrs: &[u32],
) -> AttributeResults {
    let mut results = AttributeResults::default();
    for &attr in attrs {
        let found = xml.find(attr).map(|value| {
            (
                SelectedValue::detached(value),
                AttributeSource::XmlAttribute,
                xml.source_resid,
            )
        });
        results.push(finish(am, None, Some(xml), attr, found));
    }
    results
}

/// Styles consulted for an element: the `style` chain, then the default style chain
pub fn attribute_resolution_stack(
    am: &AssetManager,
    theme: &Theme,
    xml_style: u32,
    def_style_attr: u32,
    def_style_res: u32,
) -> Result<Vec<u32>, ResourceError> {
    theme.check_registry(am)?;

    let mut stack = Vec::new();
    if xml_style != 0 {
        stack.extend(am.get_bag_res_id_stack(xml_style)?);
    }

    let mut def_style = def_style_res;
    if def_style_attr != 0
        && let Some(value) = theme.get_attribute(def_style_attr)
        && value.data_type() == ValueType::Reference
    {
        def_style = value.data();
    }
    if def_style != 0 {
        stack.extend(am.get_bag_res_id_stack(def_style)?);
    }

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use apk_res_table::TableBuilder;

    use crate::apk_assets::PropertyFlags;
    use crate::asset_manager::tests::{manager, source};

    use super::*;

    const TEXT_COLOR: u32 = 0x7f010000;
    const TEXT_SIZE: u32 = 0x7f010001;
    const BACKGROUND: u32 = 0x7f010002;
    const PADDING: u32 = 0x7f010003;
    const BUTTON_STYLE: u32 = 0x7f010004;
    const LABEL: u32 = 0x7f010005;

    const THEME: u32 = 0x7f020000;
    const BUTTON: u32 = 0x7f020001;
    const BUTTON_BASE: u32 = 0x7f020002;
    const RED_BUTTON: u32 = 0x7f020003;

    const RED: u32 = 0x7f030000;
    const HELLO: u32 = 0x7f040000;

    fn app(b: &mut TableBuilder) {
        b.package(0x7f, "app")
            .value(TEXT_COLOR, "attr/textColor", "0")
            .value(TEXT_SIZE, "attr/textSize", "0")
            .value(BACKGROUND, "attr/background", "0")
            .value(PADDING, "attr/padding", "0")
            .value(BUTTON_STYLE, "attr/buttonStyle", "0")
            .value(LABEL, "attr/label", "0")
            .value(RED, "color/red", "#ff0000")
            .value(HELLO, "string/hello", "Hello")
            .bag(
                THEME,
                "style/Theme",
                "",
                &[
                    ("textColor", "#000000"),
                    ("textSize", "12sp"),
                    ("background", "@null"),
                    ("buttonStyle", "@style/Button"),
                    ("label", "@string/hello"),
                ],
            )
            .bag(BUTTON_BASE, "style/ButtonBase", "", &[("padding", "4dp")])
            .bag(
                BUTTON,
                "style/Button",
                "ButtonBase",
                &[("textSize", "14sp"), ("background", "@color/red")],
            )
            .bag(RED_BUTTON, "style/RedButton", "", &[("textColor", "?background")]);
    }

    fn setup() -> (AssetManager, Theme) {
        let am = manager(vec![source("app.json", PropertyFlags::empty(), app)]);
        let mut theme = Theme::new(&am);
        theme.apply_style(&am, THEME, false).unwrap();
        (am, theme)
    }

    const ATTRS: [u32; 5] = [TEXT_COLOR, TEXT_SIZE, BACKGROUND, PADDING, LABEL];

    fn sources(results: &AttributeResults) -> Vec<AttributeSource> {
        results.values.iter().map(|r| r.source).collect()
    }

    #[test]
    fn resolve_attrs_precedence() {
        let (am, theme) = setup();

        let values = [Value::int(7), Value::undefined()];
        let results =
            resolve_attrs(&am, &theme, BUTTON_STYLE, 0, Some(&values), &ATTRS).unwrap();

        assert_eq!(
            sources(&results),
            vec![
                AttributeSource::Explicit,
                AttributeSource::DefaultStyle,
                AttributeSource::DefaultStyle,
                AttributeSource::DefaultStyle,
                AttributeSource::Theme,
            ]
        );
        assert_eq!(results.indices, vec![0, 1, 2, 3, 4]);

        assert_eq!(results.values[0].value.value, Value::int(7));
        assert_eq!(results.values[1].source_resid, BUTTON);
        assert_eq!(results.values[3].source_resid, BUTTON_BASE);

        let background = &results.values[2];
        assert_eq!(background.value.data(), 0xffff0000);
        assert_eq!(background.value.resid, RED);

        let label = &results.values[4];
        assert_eq!(label.string.as_deref(), Some("Hello"));
        assert_eq!(label.source_resid, THEME);
    }

    #[test]
    fn explicit_default_style_and_null() {
        let (am, theme) = setup();

        let results = resolve_attrs(&am, &theme, 0, 0, None, &ATTRS).unwrap();
        assert_eq!(results.indices, vec![0, 1, 2, 4]);

        let background = &results.values[2];
        assert_eq!(background.value.data_type(), ValueType::Null);
        assert_eq!(background.value.data(), Value::DATA_NULL_EMPTY);
        assert!(!background.value.cookie.is_valid());

        let padding = &results.values[3];
        assert_eq!(padding.source, AttributeSource::Undefined);
        assert!(!padding.is_defined());

        let results = resolve_attrs(&am, &theme, 0, BUTTON_BASE, None, &ATTRS).unwrap();
        assert_eq!(results.values[3].source, AttributeSource::DefaultStyle);

        assert!(matches!(
            resolve_attrs(&am, &theme, 0, 0, Some(&[Value::int(1); 6]), &ATTRS),
            Err(ResourceError::InvalidArgument(_))
        ));
    }

    #[test]
    fn apply_style_precedence() {
        let (am, theme) = setup();

        let mut xml = XmlAttributeSet::new();
        xml.style = Value::reference(RED_BUTTON);
        xml.source_resid = 0x7f050000;
        xml.push_string(LABEL, "Inline").push(PADDING, Value::int(3));

        let results = apply_style(&am, &theme, Some(&xml), BUTTON_STYLE, 0, &ATTRS).unwrap();
        assert_eq!(
            sources(&results),
            vec![
                AttributeSource::XmlStyle,
                AttributeSource::DefaultStyle,
                AttributeSource::DefaultStyle,
                AttributeSource::XmlAttribute,
                AttributeSource::XmlAttribute,
            ]
        );

        // ?background resolves through the theme, which has @null
        let text_color = &results.values[0];
        assert_eq!(text_color.value.data_type(), ValueType::Null);
        assert_eq!(text_color.source_resid, RED_BUTTON);

        assert_eq!(results.values[3].source_resid, 0x7f050000);
        assert_eq!(results.values[3].value.value, Value::int(3));
        assert_eq!(results.values[4].string.as_deref(), Some("Inline"));
        assert!(!results.values[4].value.cookie.is_valid());

        let without_xml = apply_style(&am, &theme, None, 0, 0, &ATTRS).unwrap();
        assert_eq!(without_xml.values[0].source, AttributeSource::Theme);
    }

    #[test]
    fn explicit_attribute_values_go_through_the_theme() {
        let (am, theme) = setup();

        let values = [Value::attribute(LABEL), Value::attribute(PADDING)];
        let results =
            resolve_attrs(&am, &theme, 0, 0, Some(&values), &[TEXT_COLOR, TEXT_SIZE]).unwrap();

        let label = &results.values[0];
        assert_eq!(label.source, AttributeSource::Explicit);
        assert_eq!(label.value.resid, HELLO);
        assert_eq!(label.string.as_deref(), Some("Hello"));

        // not in the theme, the indirection is kept
        assert_eq!(results.values[1].value.value, Value::attribute(PADDING));
    }

    #[test]
    fn xml_style_through_theme_attribute() {
        let (am, theme) = setup();

        let mut xml = XmlAttributeSet::new();
        xml.style = Value::attribute(BUTTON_STYLE);
        let results = apply_style(&am, &theme, Some(&xml), 0, 0, &[PADDING]).unwrap();
        assert_eq!(results.values[0].source, AttributeSource::XmlStyle);
        assert_eq!(results.values[0].source_resid, BUTTON_BASE);
    }

    #[test]
    fn retrieve_from_xml_only() {
        let (am, _) = setup();
        let xml = XmlAttributeSet::from_text(
            &am,
            None,
            &[
                ("textColor", "@color/red"),
                ("attr/label", "@string/hello"),
                ("background", "@null"),
                ("textSize", "?textColor"),
            ],
        )
        .unwrap();

        let results = retrieve_attributes(&am, &xml, &ATTRS);
        assert_eq!(results.indices, vec![0, 1, 2, 4]);
        assert_eq!(results.values[0].value.data(), 0xffff0000);
        assert_eq!(results.values[0].value.resid, RED);
        assert_eq!(results.values[1].value.value, Value::attribute(TEXT_COLOR));
        assert_eq!(results.values[2].value.value, Value::empty());
        assert_eq!(results.values[4].string.as_deref(), Some("Hello"));

        assert!(XmlAttributeSet::from_text(&am, None, &[("missing", "1")]).is_err());
        assert!(XmlAttributeSet::from_text(&am, None, &[("label", "@string/missing")]).is_err());
        assert!(XmlAttributeSet::from_text(&am, Some("plain"), &[]).is_err());
    }

    #[test]
    fn resolution_stack() {
        let (am, theme) = setup();

        assert_eq!(
            attribute_resolution_stack(&am, &theme, RED_BUTTON, BUTTON_STYLE, 0).unwrap(),
            vec![RED_BUTTON, BUTTON, BUTTON_BASE]
        );
        assert_eq!(
            attribute_resolution_stack(&am, &theme, 0, 0, BUTTON_BASE).unwrap(),
            vec![BUTTON_BASE]
        );
        assert!(attribute_resolution_stack(&am, &theme, 0, 0, 0).unwrap().is_empty());
    }

    #[test]
    fn wrong_registry() {
        let (am, theme) = setup();
        let other = manager(vec![source("app.json", PropertyFlags::empty(), app)]);
        assert!(matches!(
            resolve_attrs(&other, &theme, 0, 0, None, &ATTRS),
            Err(ResourceError::WrongRegistry)
        ));
        assert!(resolve_attrs(&am, &theme, 0, 0, None, &ATTRS).is_ok());
    }
}
