use std::collections::HashMap;

/// Localized message lookup for the import pipeline.
///
/// The catalog is resolved once when the importer is constructed and then
/// passed to every component that produces log or e-mail text. Unknown keys
/// fall back to the key itself so a missing translation never hides a
/// message entirely.
pub struct Translator {
    messages: HashMap<&'static str, &'static str>,
}

const ENGLISH: &[(&str, &str)] = &[
    ("message_extraction_failed", "extraction failed"),
    (
        "message_surplus_folder",
        "the extraction folder already exists, this surplus folder was not touched",
    ),
    ("message_extracted_successfully", "extracted successfully"),
    ("message_no_xml", "no XML file found"),
    ("message_too_many_xml", "too many XML files found"),
    ("message_invalid_xml_path", "invalid path for the XML file"),
    ("message_no_schema_file", "no schema file configured,"),
    (
        "message_invalid_schema_file_path",
        "the path of the schema file is invalid,",
    ),
    (
        "message_import_without_validation",
        "importing without validation",
    ),
    (
        "message_validation_impossible",
        "the XML file could not be loaded, validation is impossible",
    ),
    ("message_successful_validation", "the validation was successful"),
    ("message_line", "line"),
    (
        "message_written_to_database",
        "the record was written to database",
    ),
    (
        "message_deleted_flag_set",
        "the deletion flag is set, the record was marked as deleted",
    ),
    ("message_fields_required", "required fields missing"),
    ("message_please_validate", "please validate your data."),
    ("message_insertion_failed", "the record could not be written."),
    ("message_no_zips", "no ZIP archives found"),
    (
        "message_import_directory_not_configured",
        "no import directory configured, import aborted",
    ),
    ("message_files_removed", "removed files"),
    ("message_log_sent_to", "log sent to"),
    ("label_allowed", "allowed"),
    ("label_not_allowed", "not allowed"),
    ("label_object_number", "object number"),
    (
        "label_introduction",
        "This is the log of the OpenImmo import of your records.",
    ),
    (
        "label_explanation",
        "Please contact your administrator if any records were rejected.",
    ),
];

const GERMAN: &[(&str, &str)] = &[
    ("message_extraction_failed", "Fehler beim Entpacken"),
    (
        "message_surplus_folder",
        "der Entpack-Ordner existiert bereits, dieser überzählige Ordner wurde nicht verändert",
    ),
    ("message_extracted_successfully", "erfolgreich entpackt"),
    ("message_no_xml", "keine XML-Datei gefunden"),
    ("message_too_many_xml", "zu viele XML-Dateien gefunden"),
    ("message_invalid_xml_path", "ungültiger Pfad zur XML-Datei"),
    ("message_no_schema_file", "keine Schema-Datei konfiguriert,"),
    (
        "message_invalid_schema_file_path",
        "der Pfad der Schema-Datei ist ungültig,",
    ),
    (
        "message_import_without_validation",
        "Import ohne Validierung",
    ),
    (
        "message_validation_impossible",
        "die XML-Datei konnte nicht geladen werden, Validierung nicht möglich",
    ),
    ("message_successful_validation", "die Validierung war erfolgreich"),
    ("message_line", "Zeile"),
    (
        "message_written_to_database",
        "der Datensatz wurde in die Datenbank geschrieben",
    ),
    (
        "message_deleted_flag_set",
        "das Löschen-Flag ist gesetzt, der Datensatz wurde als gelöscht markiert",
    ),
    ("message_fields_required", "Pflichtfelder fehlen"),
    ("message_please_validate", "bitte validieren Sie Ihre Daten."),
    (
        "message_insertion_failed",
        "der Datensatz konnte nicht geschrieben werden.",
    ),
    ("message_no_zips", "keine ZIP-Archive gefunden"),
    (
        "message_import_directory_not_configured",
        "kein Import-Verzeichnis konfiguriert, Import abgebrochen",
    ),
    ("message_files_removed", "entfernte Dateien"),
    ("message_log_sent_to", "Log gesendet an"),
    ("label_allowed", "erlaubt"),
    ("label_not_allowed", "nicht erlaubt"),
    ("label_object_number", "Objektnummer"),
    (
        "label_introduction",
        "Dies ist das Protokoll des OpenImmo-Imports Ihrer Datensätze.",
    ),
    (
        "label_explanation",
        "Bitte wenden Sie sich an Ihren Administrator, falls Datensätze abgelehnt wurden.",
    ),
];

impl Translator {
    /// Create a translator for the given language code. Anything other than
    /// "de" falls back to the English catalog.
    pub fn new(language: &str) -> Self {
        let catalog = if language.eq_ignore_ascii_case("de") {
            GERMAN
        } else {
            ENGLISH
        };

        Self {
            messages: catalog.iter().copied().collect(),
        }
    }

    /// Look up the localized string for a message key. Returns the key
    /// itself if no translation exists.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.messages.get(key).copied().unwrap_or(key)
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new("default")
    }
}
