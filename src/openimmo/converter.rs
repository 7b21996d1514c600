use crate::i18n::Translator;
use crate::models::{fields, FieldValue, ImageAnnex, PropertyRecord};
use crate::openimmo::country::CountryResolver;
use crate::openimmo::mapping::{BUILDING_STATES, FIELD_MAP, HEATING_TYPES};
use anyhow::Result;
use roxmltree::{Document, Node};

/// Converts a parsed OpenImmo document into flat property records.
///
/// Conversion is best effort: missing tags and attributes silently result
/// in absent fields. The only hard stop besides an unrecognized root node
/// (which yields an empty list) is a failing country lookup, since that
/// indicates a broken reference-data store rather than bad input.
pub struct RecordConverter<'a> {
    translator: &'a Translator,
    countries: &'a mut CountryResolver,
}

impl<'a> RecordConverter<'a> {
    pub fn new(translator: &'a Translator, countries: &'a mut CountryResolver) -> Self {
        Self { translator, countries }
    }

    /// Convert all `<immobilie>` elements of the document. Returns one
    /// record per element, with the document-shared provider fields merged
    /// into each. Documents without an `openimmo` or `immoxml` root are
    /// not an error and convert to an empty list.
    pub fn convert(&mut self, document: &Document) -> Result<Vec<PropertyRecord>> {
        let root_name = document.root_element().tag_name().name();
        if !root_name.eq_ignore_ascii_case("openimmo") && !root_name.eq_ignore_ascii_case("immoxml")
        {
            return Ok(Vec::new());
        }

        let shared = fetch_shared_fields(document);

        let mut records = Vec::new();
        for property in elements_named(document.root(), "immobilie") {
            let mut record = self.convert_property(property)?;
            // The provider fields win over anything extracted per record.
            for (column, value) in &shared {
                record.set(*column, value.clone());
            }
            records.push(record);
        }

        Ok(records)
    }

    fn convert_property(&mut self, property: Node) -> Result<PropertyRecord> {
        let mut record = PropertyRecord::new();

        self.fetch_mapped_fields(property, &mut record);
        fetch_images(property, &mut record);
        fetch_equipment(property, &mut record);
        fetch_category(property, &mut record);
        fetch_state(property, &mut record);
        fetch_old_or_new_building(property, &mut record);
        fetch_action(property, &mut record);
        fetch_heating_type(property, &mut record);
        fetch_garage_type(property, &mut record);
        fetch_garage_price(property, &mut record);
        fetch_currency(property, &mut record);
        fetch_language(property, &mut record);
        fetch_geo_coordinates(property, &mut record);
        self.fetch_country(property, &mut record)?;

        replace_boolean_like_strings(&mut record);
        substitute_surplus_decimals(&mut record);

        Ok(record)
    }

    /// Resolve every entry of the declarative tag-path table, then run the
    /// fallback lookups that depend on the directly mapped values.
    fn fetch_mapped_fields(&self, property: Node, record: &mut PropertyRecord) {
        for mapping in FIELD_MAP {
            if let Some(node) = first_grandchild(property, mapping.child, mapping.grandchild) {
                record.set(mapping.column, node_text(node));
            }
        }

        append_street_number(property, record);
        self.set_title_for_pets(record);
        try_second_contact_email(property, record);
        try_second_contact_phone(property, record);
    }

    /// OpenImmo carries the pet allowance as a boolean, but downstream the
    /// value is displayed verbatim, so it is replaced with a localized
    /// label.
    fn set_title_for_pets(&self, record: &mut PropertyRecord) {
        let Some(raw) = record.text(fields::PETS) else {
            return;
        };

        let value = raw.to_lowercase();
        let label = if value == "1" || is_boolean_like_true(&value) {
            self.translator.get("label_allowed")
        } else {
            self.translator.get("label_not_allowed")
        };
        record.set(fields::PETS, label);
    }

    /// Read the ISO country code attribute, uppercase it and resolve it to
    /// the internal identifier. An unknown country resolves to 0 and leaves
    /// the field unset.
    fn fetch_country(&mut self, property: Node, record: &mut PropertyRecord) -> Result<()> {
        let attributes = lowercased_attributes(first_grandchild(property, "geo", "land"));
        let Some(code) = attribute_value(&attributes, "iso_land") else {
            return Ok(());
        };
        if code.is_empty() {
            return Ok(());
        }

        let id = self.countries.resolve(&code.to_uppercase())?;
        record.set_if_non_empty(fields::COUNTRY, i64::from(id));
        Ok(())
    }
}

/// Provider name and OpenImmo anbieter-ID are the same for all records of
/// one document and are fetched once from the `<anbieter>` element.
fn fetch_shared_fields(document: &Document) -> Vec<(&'static str, FieldValue)> {
    let mut shared = Vec::new();

    for (grandchild, column) in [("firma", fields::EMPLOYER), ("openimmo_anid", fields::OPENIMMO_ANID)] {
        if let Some(node) = first_grandchild(document.root(), "anbieter", grandchild) {
            shared.push((column, FieldValue::Text(node_text(node))));
        }
    }

    shared
}

/// Append the `hausnummer` tag to an already extracted, non-empty street.
fn append_street_number(property: Node, record: &mut PropertyRecord) {
    let Some(street) = record.text(fields::STREET) else {
        return;
    };
    if street.is_empty() {
        return;
    }

    if let Some(node) = first_grandchild(property, "geo", "hausnummer") {
        let number = node_text(node);
        if !number.is_empty() {
            let combined = format!("{} {}", record.text(fields::STREET).unwrap_or_default(), number);
            record.set(fields::STREET, combined);
        }
    }
}

fn try_second_contact_email(property: Node, record: &mut PropertyRecord) {
    if record.has(fields::CONTACT_EMAIL) {
        return;
    }
    if let Some(node) = first_grandchild(property, "kontaktperson", "email_direkt") {
        record.set_if_non_empty(fields::CONTACT_EMAIL, node_text(node));
    }
}

fn try_second_contact_phone(property: Node, record: &mut PropertyRecord) {
    if record.has(fields::CONTACT_PHONE) {
        return;
    }
    if let Some(node) = first_grandchild(property, "kontaktperson", "tel_privat") {
        record.set_if_non_empty(fields::CONTACT_PHONE, node_text(node));
    }
}

/// Collect the image annexes of one record: each `<anhang>` pairs a title
/// with a file path. Only the base name of the path is kept; annexes
/// without a file name are dropped.
fn fetch_images(property: Node, record: &mut PropertyRecord) {
    for annex in elements_named(property, "anhang") {
        let caption = elements_named(annex, "anhangtitel")
            .next()
            .map(node_text)
            .unwrap_or_default();

        let file_name = first_grandchild(annex, "daten", "pfad")
            .map(|node| base_name(&node_text(node)))
            .unwrap_or_default();

        if !file_name.is_empty() {
            record.images.push(ImageAnnex {
                caption,
                filename: file_name,
            });
        }
    }
}

/// Equipment flags live in attribute sets on `<ausstattung>` children. The
/// two elevator subtypes are collapsed onto one flag.
fn fetch_equipment(property: Node, record: &mut PropertyRecord) {
    let services = lowercased_attributes(first_grandchild(property, "ausstattung", "serviceleistungen"));
    let elevator = lowercased_attributes(first_grandchild(property, "ausstattung", "fahrstuhl"));
    let kitchen = lowercased_attributes(first_grandchild(property, "ausstattung", "kueche"));

    if let Some(value) = attribute_value(&services, "betreutes_wohnen") {
        record.set_if_non_empty(fields::ASSISTED_LIVING, value);
    }
    if let Some(value) = attribute_value(&kitchen, "ebk") {
        record.set_if_non_empty(fields::FITTED_KITCHEN, value);
    }
    if let Some(value) =
        attribute_value(&elevator, "personen").or_else(|| attribute_value(&elevator, "lasten"))
    {
        record.set_if_non_empty(fields::ELEVATOR, value);
    }
}

/// Derive house type, object type and utilization from the category node.
fn fetch_category(property: Node, record: &mut PropertyRecord) {
    fetch_house_type(property, record);

    let sale_attributes = lowercased_attributes(first_grandchild(property, "objektkategorie", "vermarktungsart"));
    // 'object_type' must be set as soon as any attributes are provided
    // because it is a required field downstream; "0" is the sentinel for
    // an unrecognized sale type.
    if !sale_attributes.is_empty() {
        match attribute_value(&sale_attributes, "kauf") {
            Some(value) => record.set(fields::OBJECT_TYPE, value),
            None => record.set(fields::OBJECT_TYPE, 0i64),
        }
    }

    let utilization_attributes = raw_attributes(first_grandchild(property, "objektkategorie", "nutzungsart"));
    if !utilization_attributes.is_empty() {
        let names: Vec<String> = utilization_attributes.iter().map(|(name, _)| name.clone()).collect();
        record.set(fields::UTILIZATION, format_word_list(&names));
    }
}

/// The house type is the tag name of the first element below `objektart`,
/// combined with that element's attribute values as "Name: Attr1, Attr2".
fn fetch_house_type(property: Node, record: &mut PropertyRecord) {
    let Some(container) = first_grandchild(property, "objektkategorie", "objektart") else {
        return;
    };
    let Some(type_node) = container.children().find(|child| child.is_element()) else {
        return;
    };

    let name = type_node.tag_name().name();
    if name.is_empty() {
        return;
    }

    let attributes = raw_attributes(Some(type_node));
    let value = if attributes.is_empty() {
        name.to_string()
    } else {
        let values: Vec<String> = attributes.iter().map(|(_, value)| value.clone()).collect();
        format!("{}: {}", name, values.join(", "))
    };

    record.set(fields::HOUSE_TYPE, format_word_list(&[value]));
}

/// Map the German condition keyword to its integer state code. Unknown
/// keywords leave the field unset.
fn fetch_state(property: Node, record: &mut PropertyRecord) {
    let attributes = lowercased_attributes(first_grandchild(property, "zustand_angaben", "zustand"));
    let Some(condition) = attribute_value(&attributes, "zustand_art") else {
        return;
    };

    if let Some((_, code)) = BUILDING_STATES.iter().find(|(keyword, _)| *keyword == condition) {
        record.set(fields::STATE, *code);
    }
}

fn fetch_old_or_new_building(property: Node, record: &mut PropertyRecord) {
    let attributes = lowercased_attributes(first_grandchild(property, "zustand_angaben", "alter"));
    match attribute_value(&attributes, "alter_attr") {
        Some("neubau") => record.set(fields::OLD_OR_NEW_BUILDING, 1i64),
        Some("altbau") => record.set(fields::OLD_OR_NEW_BUILDING, 2i64),
        _ => {}
    }
}

/// The deletion flag is only derived when the administrative action node is
/// present at all; it is true when any attribute value is the literal
/// token "delete".
fn fetch_action(property: Node, record: &mut PropertyRecord) {
    let Some(node) = first_grandchild(property, "verwaltung_techn", "aktion") else {
        return;
    };

    let deleted = lowercased_attributes(Some(node))
        .iter()
        .any(|(_, value)| value == "delete");
    record.set(fields::DELETED, deleted);
}

/// Heating types are attribute names on the heating and firing nodes. They
/// translate to a sorted, deduplicated list of integer keys from a fixed
/// vocabulary; unknown names are dropped.
fn fetch_heating_type(property: Node, record: &mut PropertyRecord) {
    let mut names: Vec<String> = Vec::new();
    for grandchild in ["heizungsart", "befeuerung"] {
        for (name, _) in lowercased_attributes(first_grandchild(property, "ausstattung", grandchild)) {
            names.push(name);
        }
    }

    let keys: Vec<String> = HEATING_TYPES
        .iter()
        .filter(|(_, name)| names.iter().any(|candidate| candidate == name))
        .map(|(key, _)| key.to_string())
        .collect();

    record.set_if_non_empty(fields::HEATING_TYPE, keys.join(","));
}

fn fetch_garage_type(property: Node, record: &mut PropertyRecord) {
    let attributes = lowercased_attributes(first_grandchild(property, "ausstattung", "stellplatzart"));
    let names: Vec<String> = attributes.iter().map(|(name, _)| name.clone()).collect();
    if !names.is_empty() {
        record.set_if_non_empty(fields::GARAGE_TYPE, format_word_list(&names));
    }
}

fn fetch_garage_price(property: Node, record: &mut PropertyRecord) {
    // 'stp_*' exists for each defined kind of parking space.
    let attributes = lowercased_attributes(first_grandchild(property, "preise", "stp_garage"));
    if let Some(rent) = attribute_value(&attributes, "stellplatzmiete") {
        record.set_if_non_empty(fields::GARAGE_RENT, rent);
    }
    if let Some(price) = attribute_value(&attributes, "stellplatzkaufpreis") {
        record.set_if_non_empty(fields::GARAGE_PRICE, price);
    }
}

fn fetch_currency(property: Node, record: &mut PropertyRecord) {
    let attributes = lowercased_attributes(first_grandchild(property, "preise", "waehrung"));
    if let Some(code) = attribute_value(&attributes, "iso_waehrung") {
        record.set_if_non_empty(fields::CURRENCY, code.to_uppercase());
    }
}

fn fetch_language(property: Node, record: &mut PropertyRecord) {
    let Some(container) = first_grandchild(property, "verwaltung_objekt", "user_defined_anyfield")
    else {
        return;
    };

    if let Some(language_node) = elements_named(container, "sprache").next() {
        record.set(fields::LANGUAGE, node_text(language_node));
    }
}

/// Exact coordinates are only taken when both latitude and longitude are
/// present and non-empty; a cached flag is set alongside.
fn fetch_geo_coordinates(property: Node, record: &mut PropertyRecord) {
    let attributes = lowercased_attributes(first_grandchild(property, "geo", "geokoordinaten"));
    let longitude = attribute_value(&attributes, "laengengrad").unwrap_or_default();
    let latitude = attribute_value(&attributes, "breitengrad").unwrap_or_default();

    if !is_empty_text(longitude) && !is_empty_text(latitude) {
        record.set(fields::EXACT_COORDINATES_ARE_CACHED, true);
        record.set(fields::EXACT_LONGITUDE, longitude);
        record.set(fields::EXACT_LATITUDE, latitude);
    }
}

/// First global normalization pass: the case-insensitive, optionally
/// quote-wrapped strings "true"/"false" become real booleans.
fn replace_boolean_like_strings(record: &mut PropertyRecord) {
    record.map_values(|_, value| {
        let text = value.as_text()?;
        if is_boolean_like_true(text) {
            Some(FieldValue::Bool(true))
        } else if is_boolean_like_false(text) {
            Some(FieldValue::Bool(false))
        } else {
            None
        }
    });
}

/// Second global normalization pass: numeric values with a zero fractional
/// part become integers. The zip field is exempt because leading zeros
/// must be preserved.
fn substitute_surplus_decimals(record: &mut PropertyRecord) {
    record.map_values(|key, value| {
        if key == fields::ZIP {
            return None;
        }
        let text = value.as_text()?;
        as_surplus_free_integer(text).map(FieldValue::Int)
    });
}

fn is_boolean_like_true(value: &str) -> bool {
    value.trim_matches('"').eq_ignore_ascii_case("true")
}

fn is_boolean_like_false(value: &str) -> bool {
    value.trim_matches('"').eq_ignore_ascii_case("false")
}

fn as_surplus_free_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let number: f64 = trimmed.parse().ok()?;
    if number.is_finite() && number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        Some(number as i64)
    } else {
        None
    }
}

/// Empty in the sense of the "only add non-empty" rules: the empty string
/// and the literal "0" both count as absent.
fn is_empty_text(value: &str) -> bool {
    value.is_empty() || value == "0"
}

/// All element descendants of `scope` with the given (namespace-stripped)
/// tag name, in document order.
fn elements_named<'a, 'input>(
    scope: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a
where
    'input: 'a,
{
    scope
        .descendants()
        .filter(move |node| node.is_element() && node.tag_name().name() == name)
}

/// The first element two levels below `scope` addressed by a child tag and
/// a grandchild tag, mirroring the nesting scheme of OpenImmo. Searches
/// every descendant named `child` and takes the first direct child named
/// `grandchild`.
fn first_grandchild<'a, 'input>(
    scope: Node<'a, 'input>,
    child: &str,
    grandchild: &str,
) -> Option<Node<'a, 'input>> {
    for candidate in scope
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == child)
    {
        let hit = candidate
            .children()
            .find(|node| node.is_element() && node.tag_name().name() == grandchild);
        if hit.is_some() {
            return hit;
        }
    }
    None
}

/// Concatenated text content of a node, like DOM `nodeValue`.
fn node_text(node: Node) -> String {
    node.descendants()
        .filter(|descendant| descendant.is_text())
        .filter_map(|descendant| descendant.text())
        .collect()
}

/// Attribute name/value pairs in document order.
fn raw_attributes(node: Option<Node>) -> Vec<(String, String)> {
    let Some(node) = node else {
        return Vec::new();
    };
    node.attributes()
        .map(|attribute| (attribute.name().to_string(), attribute.value().to_string()))
        .collect()
}

/// Attribute name/value pairs with both sides lowercased, for the checks
/// that are case-insensitive by contract.
fn lowercased_attributes(node: Option<Node>) -> Vec<(String, String)> {
    raw_attributes(node)
        .into_iter()
        .map(|(name, value)| (name.to_lowercase(), value.to_lowercase()))
        .collect()
}

fn attribute_value<'v>(attributes: &'v [(String, String)], name: &str) -> Option<&'v str> {
    attributes
        .iter()
        .find(|(candidate, _)| candidate == name)
        .map(|(_, value)| value.as_str())
}

/// Join the items with ", ", lowercase everything and capitalize the first
/// letter of each word.
fn format_word_list(items: &[String]) -> String {
    let joined = items.join(", ").to_lowercase();

    let mut formatted = String::with_capacity(joined.len());
    let mut at_word_start = true;
    for character in joined.chars() {
        if at_word_start && character.is_alphabetic() {
            formatted.extend(character.to_uppercase());
        } else {
            formatted.push(character);
        }
        at_word_start = character.is_whitespace();
    }
    formatted
}

/// Base file name of a path, tolerating both slash styles.
fn base_name(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or("").trim().to_string()
}
