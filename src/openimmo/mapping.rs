use crate::models::fields;

/// One entry of the declarative tag-path table: an output column fed by a
/// `(child, grandchild)` pair below `<immobilie>`.
///
/// OpenImmo nests every meaningful value two levels below a category
/// element, e.g. `<geo><plz>12345</plz></geo>`; the mapping names the
/// category and the leaf tag for each flat output column.
pub struct FieldMapping {
    pub column: &'static str,
    pub child: &'static str,
    pub grandchild: &'static str,
}

const fn entry(column: &'static str, child: &'static str, grandchild: &'static str) -> FieldMapping {
    FieldMapping { column, child, grandchild }
}

/// Tag paths for all directly mapped columns. Derived columns (heating
/// type, state, geo coordinates, ...) are handled by dedicated passes in
/// the converter.
pub const FIELD_MAP: &[FieldMapping] = &[
    entry(fields::STARTTIME, "bieterverfahren", "beginn_angebotsphase"),
    entry(fields::ENDTIME, "bieterverfahren", "ende_bietzeit"),
    entry(fields::OBJECT_NUMBER, "verwaltung_techn", "objektnr_extern"),
    entry(fields::TITLE, "freitexte", "objekttitel"),
    entry(fields::STREET, "geo", "strasse"),
    entry(fields::ZIP, "geo", "plz"),
    entry(fields::CITY, "geo", "ort"),
    entry(fields::DISTRICT, "geo", "regionaler_zusatz"),
    entry(fields::SHOW_ADDRESS, "verwaltung_objekt", "objektadresse_freigeben"),
    entry(fields::NUMBER_OF_ROOMS, "flaechen", "anzahl_zimmer"),
    entry(fields::LIVING_AREA, "flaechen", "wohnflaeche"),
    entry(fields::TOTAL_AREA, "flaechen", "gesamtflaeche"),
    entry(fields::ESTATE_SIZE, "flaechen", "grundstuecksflaeche"),
    entry(fields::RENT_EXCLUDING_BILLS, "preise", "kaltmiete"),
    entry(fields::EXTRA_CHARGES, "preise", "nebenkosten"),
    entry(fields::HEATING_INCLUDED, "preise", "heizkosten_enthalten"),
    entry(fields::DEPOSIT, "preise", "kaution"),
    entry(fields::PROVISION, "preise", "aussen_courtage"),
    entry(fields::USABLE_FROM, "verwaltung_objekt", "verfuegbar_ab"),
    entry(fields::BUYING_PRICE, "preise", "kaufpreis"),
    entry(fields::HOA_FEE, "preise", "hausgeld"),
    entry(fields::YEAR_RENT, "preise", "mieteinnahmen_ist"),
    entry(fields::RENTED, "verwaltung_objekt", "vermietet"),
    entry(fields::FLOOR, "geo", "etage"),
    entry(fields::FLOORS, "geo", "anzahl_etagen"),
    entry(fields::BEDROOMS, "flaechen", "anzahl_schlafzimmer"),
    entry(fields::BATHROOMS, "flaechen", "anzahl_badezimmer"),
    entry(fields::PETS, "verwaltung_objekt", "haustiere"),
    entry(fields::CONSTRUCTION_YEAR, "zustand_angaben", "baujahr"),
    entry(fields::BALCONY, "flaechen", "anzahl_balkon_terrassen"),
    entry(fields::GARDEN, "ausstattung", "gartennutzung"),
    entry(fields::BARRIER_FREE, "ausstattung", "rollstuhlgerecht"),
    entry(fields::DESCRIPTION, "freitexte", "objektbeschreibung"),
    entry(fields::EQUIPMENT, "freitexte", "ausstatt_beschr"),
    entry(fields::LOCATION, "freitexte", "lage"),
    entry(fields::MISC, "freitexte", "sonstige_angaben"),
    entry(fields::OPENIMMO_OBID, "verwaltung_techn", "openimmo_obid"),
    entry(fields::CONTACT_PERSON, "kontaktperson", "name"),
    entry(fields::CONTACT_EMAIL, "kontaktperson", "email_zentrale"),
    entry(fields::CONTACT_PHONE, "kontaktperson", "tel_zentrale"),
];

/// German heating and firing method attribute names mapped to the integer
/// keys stored in the heating-type field.
pub const HEATING_TYPES: &[(i64, &str)] = &[
    (1, "fern"),
    (2, "zentral"),
    (3, "elektro"),
    (4, "fussboden"),
    (5, "gas"),
    (6, "alternativ"),
    (7, "erdwaerme"),
    (8, "oel"),
    (9, "etage"),
    (10, "solar"),
    (11, "ofen"),
    (12, "block"),
];

/// German building condition keywords mapped to the integer state codes.
pub const BUILDING_STATES: &[(&str, i64)] = &[
    ("rohbau", 1),
    ("nach_vereinbarung", 2),
    ("baufaellig", 3),
    ("erstbezug", 4),
    ("abrissobjekt", 5),
    ("entkernt", 6),
    ("modernisiert", 7),
    ("gepflegt", 8),
    ("teil_vollrenovierungsbed", 9),
    ("neuwertig", 10),
    ("teil_vollrenoviert", 11),
    ("teil_vollsaniert", 12),
    ("projektiert", 13),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_column_appears_exactly_once() {
        let mut columns: Vec<&str> = FIELD_MAP.iter().map(|m| m.column).collect();
        let total = columns.len();
        columns.sort_unstable();
        columns.dedup();
        assert_eq!(columns.len(), total);
    }

    #[test]
    fn heating_vocabulary_has_twelve_known_keys() {
        assert_eq!(HEATING_TYPES.len(), 12);
    }

    #[test]
    fn state_vocabulary_has_thirteen_entries() {
        assert_eq!(BUILDING_STATES.len(), 13);
    }
}
