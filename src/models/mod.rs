use serde::Serialize;
use std::collections::BTreeMap;

/// Database column names filled by the OpenImmo conversion.
///
/// Presence of a key in [`PropertyRecord`] means the tag was found in the
/// source document; downstream required-field validation checks for key
/// presence, so fields are never defaulted in.
pub mod fields {
    pub const STARTTIME: &str = "starttime";
    pub const ENDTIME: &str = "endtime";
    pub const OBJECT_NUMBER: &str = "object_number";
    pub const TITLE: &str = "title";
    pub const STREET: &str = "street";
    pub const ZIP: &str = "zip";
    pub const CITY: &str = "city";
    pub const DISTRICT: &str = "district";
    pub const SHOW_ADDRESS: &str = "show_address";
    pub const NUMBER_OF_ROOMS: &str = "number_of_rooms";
    pub const LIVING_AREA: &str = "living_area";
    pub const TOTAL_AREA: &str = "total_area";
    pub const ESTATE_SIZE: &str = "estate_size";
    pub const RENT_EXCLUDING_BILLS: &str = "rent_excluding_bills";
    pub const EXTRA_CHARGES: &str = "extra_charges";
    pub const HEATING_INCLUDED: &str = "heating_included";
    pub const DEPOSIT: &str = "deposit";
    pub const PROVISION: &str = "provision";
    pub const USABLE_FROM: &str = "usable_from";
    pub const BUYING_PRICE: &str = "buying_price";
    pub const HOA_FEE: &str = "hoa_fee";
    pub const YEAR_RENT: &str = "year_rent";
    pub const RENTED: &str = "rented";
    pub const FLOOR: &str = "floor";
    pub const FLOORS: &str = "floors";
    pub const BEDROOMS: &str = "bedrooms";
    pub const BATHROOMS: &str = "bathrooms";
    pub const PETS: &str = "pets";
    pub const CONSTRUCTION_YEAR: &str = "construction_year";
    pub const BALCONY: &str = "balcony";
    pub const GARDEN: &str = "garden";
    pub const BARRIER_FREE: &str = "barrier_free";
    pub const DESCRIPTION: &str = "description";
    pub const EQUIPMENT: &str = "equipment";
    pub const LOCATION: &str = "location";
    pub const MISC: &str = "misc";
    pub const OPENIMMO_OBID: &str = "openimmo_obid";
    pub const CONTACT_PERSON: &str = "contact_person";
    pub const CONTACT_EMAIL: &str = "contact_email";
    pub const CONTACT_PHONE: &str = "contact_phone";

    pub const EMPLOYER: &str = "employer";
    pub const OPENIMMO_ANID: &str = "openimmo_anid";

    pub const ASSISTED_LIVING: &str = "assisted_living";
    pub const FITTED_KITCHEN: &str = "fitted_kitchen";
    pub const ELEVATOR: &str = "elevator";
    pub const OBJECT_TYPE: &str = "object_type";
    pub const UTILIZATION: &str = "utilization";
    pub const HOUSE_TYPE: &str = "house_type";
    pub const HEATING_TYPE: &str = "heating_type";
    pub const GARAGE_TYPE: &str = "garage_type";
    pub const GARAGE_RENT: &str = "garage_rent";
    pub const GARAGE_PRICE: &str = "garage_price";
    pub const CURRENCY: &str = "currency";
    pub const STATE: &str = "state";
    pub const OLD_OR_NEW_BUILDING: &str = "old_or_new_building";
    pub const DELETED: &str = "deleted";
    pub const LANGUAGE: &str = "language";
    pub const EXACT_COORDINATES_ARE_CACHED: &str = "exact_coordinates_are_cached";
    pub const EXACT_LONGITUDE: &str = "exact_longitude";
    pub const EXACT_LATITUDE: &str = "exact_latitude";
    pub const COUNTRY: &str = "country";
}

/// A single converted field value.
///
/// Values start out as text taken from the XML and are narrowed by the
/// normalization passes that run after conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Whether the value counts as empty for "only add non-empty" rules:
    /// empty text, the text "0", zero and false all count as empty.
    pub fn is_empty_value(&self) -> bool {
        match self {
            FieldValue::Text(value) => value.is_empty() || value == "0",
            FieldValue::Int(value) => *value == 0,
            FieldValue::Bool(value) => !*value,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// One image attachment of a property record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageAnnex {
    pub caption: String,
    /// Base file name inside the extracted archive, without any path.
    pub filename: String,
}

/// The normalized result of converting one `<immobilie>` element.
///
/// Fields are a sparse map: a key is only present if the corresponding tag
/// or attribute was found. Image annexes are kept separately because they
/// go to their own storage downstream.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PropertyRecord {
    fields: BTreeMap<&'static str, FieldValue>,
    pub images: Vec<ImageAnnex>,
}

impl PropertyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value unconditionally (missing tags are handled by simply
    /// not calling this).
    pub fn set(&mut self, key: &'static str, value: impl Into<FieldValue>) {
        self.fields.insert(key, value.into());
    }

    /// Insert a value only if it is non-empty.
    pub fn set_if_non_empty(&mut self, key: &'static str, value: impl Into<FieldValue>) {
        let value = value.into();
        if !value.is_empty_value() {
            self.fields.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(FieldValue::as_text)
    }

    /// A field counts as filled when it is present and, for text values,
    /// non-blank. Used by required-field validation.
    pub fn is_filled(&self, key: &str) -> bool {
        match self.fields.get(key) {
            Some(FieldValue::Text(value)) => !value.trim().is_empty(),
            Some(_) => true,
            None => false,
        }
    }

    pub fn object_number(&self) -> Option<String> {
        self.fields.get(fields::OBJECT_NUMBER).map(|value| match value {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Int(number) => number.to_string(),
            FieldValue::Bool(flag) => flag.to_string(),
        })
    }

    pub fn contact_email(&self) -> Option<&str> {
        self.text(fields::CONTACT_EMAIL)
    }

    pub fn set_contact_email(&mut self, address: &str) {
        self.set(fields::CONTACT_EMAIL, address);
    }

    pub fn is_deleted(&self) -> bool {
        matches!(
            self.fields.get(fields::DELETED),
            Some(FieldValue::Bool(true)) | Some(FieldValue::Int(1))
        )
    }

    /// Iterate over all present fields.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (*key, value))
    }

    /// Apply an in-place transformation to every present field value.
    pub fn map_values(&mut self, mut transform: impl FnMut(&str, &FieldValue) -> Option<FieldValue>) {
        let keys: Vec<&'static str> = self.fields.keys().copied().collect();
        for key in keys {
            if let Some(replacement) = transform(key, &self.fields[key]) {
                self.fields.insert(key, replacement);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_if_non_empty_drops_empty_text() {
        let mut record = PropertyRecord::new();
        record.set_if_non_empty(fields::CONTACT_PHONE, "");
        assert!(!record.has(fields::CONTACT_PHONE));
    }

    #[test]
    fn set_if_non_empty_drops_the_zero_string() {
        let mut record = PropertyRecord::new();
        record.set_if_non_empty(fields::ELEVATOR, "0");
        assert!(!record.has(fields::ELEVATOR));
    }

    #[test]
    fn empty_text_fields_do_not_count_as_filled() {
        let mut record = PropertyRecord::new();
        record.set(fields::OBJECT_NUMBER, "  ");
        assert!(!record.is_filled(fields::OBJECT_NUMBER));

        record.set(fields::OBJECT_NUMBER, "A-17");
        assert!(record.is_filled(fields::OBJECT_NUMBER));
    }

    #[test]
    fn deletion_flag_is_recognized_for_bool_and_int() {
        let mut record = PropertyRecord::new();
        assert!(!record.is_deleted());
        record.set(fields::DELETED, true);
        assert!(record.is_deleted());
        record.set(fields::DELETED, 1i64);
        assert!(record.is_deleted());
    }
}
