use openimmo_import::config::ImportConfig;
use openimmo_import::import::Importer;
use openimmo_import::store::{
    MemoryCountryTable, MemoryStore, NoopRenderCache, RecordingMailer,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const OPENIMMO_DOCUMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<openimmo>
  <anbieter>
    <firma>Acme Immobilien</firma>
    <openimmo_anid>ANID-1</openimmo_anid>
    <immobilie>
      <verwaltung_techn><objektnr_extern>OBJ-1</objektnr_extern></verwaltung_techn>
      <geo>
        <strasse>Hauptstr.</strasse>
        <hausnummer>3</hausnummer>
        <plz>01234</plz>
        <ort>Bonn</ort>
      </geo>
      <kontaktperson>
        <name>Maier</name>
        <email_zentrale>agent@example.com</email_zentrale>
      </kontaktperson>
      <freitexte><objekttitel>Helle Altbauwohnung</objekttitel></freitexte>
      <ausstattung><heizungsart zentral="true" solar="true"/></ausstattung>
    </immobilie>
    <immobilie>
      <verwaltung_techn><objektnr_extern>OBJ-2</objektnr_extern></verwaltung_techn>
      <geo><ort>Koeln</ort></geo>
    </immobilie>
  </anbieter>
</openimmo>"#;

struct Pipeline {
    _dirs: TempDir,
    config: ImportConfig,
    store: Arc<MemoryStore>,
    mailer: Arc<RecordingMailer>,
}

impl Pipeline {
    fn new() -> Self {
        let dirs = TempDir::new().unwrap();
        let import_folder = dirs.path().join("incoming");
        let upload_folder = dirs.path().join("images");
        std::fs::create_dir_all(&import_folder).unwrap();
        std::fs::create_dir_all(&upload_folder).unwrap();

        let config = ImportConfig {
            import_folder,
            upload_folder,
            default_email: "admin@example.com".to_string(),
            countries: BTreeMap::from([("DEU".to_string(), 54)]),
            ..ImportConfig::default()
        };

        Self {
            _dirs: dirs,
            config,
            store: Arc::new(MemoryStore::new(vec![
                "object_number".to_string(),
                "city".to_string(),
            ])),
            mailer: Arc::new(RecordingMailer::new()),
        }
    }

    fn add_archive(&self, name: &str, entries: &[(&str, &str)]) -> std::path::PathBuf {
        let path = self.config.import_folder.join(name);
        write_zip(&path, entries);
        path
    }

    fn run(&self) -> String {
        let countries = Arc::new(MemoryCountryTable::new(self.config.countries.clone()));
        let importer = Importer::new(
            self.config.clone(),
            Arc::clone(&self.store) as Arc<dyn openimmo_import::store::PropertyStore>,
            countries,
            Arc::clone(&self.mailer) as Arc<dyn openimmo_import::store::MailTransport>,
            Arc::new(NoopRenderCache),
        );
        importer.import_from_zip()
    }
}

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn imports_every_record_of_an_archive() {
    let pipeline = Pipeline::new();
    let archive = pipeline.add_archive("acme.zip", &[("acme.xml", OPENIMMO_DOCUMENT)]);

    let log = pipeline.run();
    let store = &pipeline.store;

    assert!(log.contains("extracted successfully"));
    assert!(log.contains("no schema file configured, importing without validation"));
    assert_eq!(log.matches("the record was written to database").count(), 2);

    let records = store.records();
    assert_eq!(records.len(), 2);

    let first = &records[0].record;
    assert_eq!(first.object_number().as_deref(), Some("OBJ-1"));
    assert_eq!(first.text("city"), Some("Bonn"));
    assert_eq!(first.text("street"), Some("Hauptstr. 3"));
    // Leading zeros of postal codes survive the numeric normalization.
    assert_eq!(first.text("zip"), Some("01234"));
    assert_eq!(first.text("heating_type"), Some("2,10"));
    assert_eq!(first.text("employer"), Some("Acme Immobilien"));
    assert_eq!(first.contact_email(), Some("agent@example.com"));

    // The second record has no contact tag and falls back to the default.
    let second = &records[1].record;
    assert_eq!(second.contact_email(), Some("admin@example.com"));
    assert_eq!(second.text("employer"), Some("Acme Immobilien"));

    // The source archive stays, its working directory is removed. Only
    // deleted ZIPs are worth a log line, so there is none here.
    assert!(archive.exists());
    assert!(!archive.with_extension("").exists());
    assert!(!log.contains("removed files"));
}

#[test]
fn notifies_contact_persons_and_logs_the_recipients() {
    let pipeline = Pipeline::new();
    pipeline.add_archive("acme.zip", &[("acme.xml", OPENIMMO_DOCUMENT)]);

    let log = pipeline.run();
    let mailer = &pipeline.mailer;

    let messages = mailer.messages();
    let recipients: Vec<&str> = messages.iter().map(|(to, _, _)| to.as_str()).collect();
    assert!(recipients.contains(&"agent@example.com"));
    assert!(recipients.contains(&"admin@example.com"));

    let to_agent = messages
        .iter()
        .find(|(to, _, _)| to == "agent@example.com")
        .unwrap();
    assert!(to_agent.2.contains("OBJ-1"));
    assert!(to_agent.2.contains("the record was written to database"));

    assert!(log.contains("log sent to"));
}

#[test]
fn an_empty_import_directory_produces_only_the_timestamp_and_an_info_line() {
    let pipeline = Pipeline::new();

    let log = pipeline.run();
    let store = &pipeline.store;
    let mailer = &pipeline.mailer;

    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].len(), "2026-01-01 00:00:00".len());
    assert_eq!(lines[1], "no ZIP archives found");
    assert!(store.is_empty());
    assert!(mailer.messages().is_empty());
}

#[test]
fn records_missing_required_fields_are_rejected_and_reported() {
    let pipeline = Pipeline::new();
    pipeline.add_archive(
        "broken.zip",
        &[(
            "broken.xml",
            "<openimmo><anbieter><immobilie>\
               <geo><ort>Bonn</ort></geo>\
             </immobilie></anbieter></openimmo>",
        )],
    );

    let log = pipeline.run();
    let store = &pipeline.store;
    let mailer = &pipeline.mailer;

    assert!(log.contains("required fields missing: object_number."));
    // No schema configured, so no validation hint is appended.
    assert!(!log.contains("please validate"));
    assert!(store.is_empty());

    let messages = mailer.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "admin@example.com");
    assert!(messages[0].2.contains("object number ------:"));
    assert!(messages[0].2.contains("required fields missing"));
}

#[test]
fn a_surplus_extraction_folder_is_reported_and_left_untouched() {
    let pipeline = Pipeline::new();
    pipeline.add_archive("acme.zip", &[("acme.xml", OPENIMMO_DOCUMENT)]);

    let surplus = pipeline.config.import_folder.join("acme");
    std::fs::create_dir_all(&surplus).unwrap();
    std::fs::write(surplus.join("keep.txt"), "operator data").unwrap();

    let log = pipeline.run();
    let store = &pipeline.store;

    assert!(log.contains("surplus folder"));
    assert!(store.is_empty());
    assert!(surplus.join("keep.txt").exists());
}

#[test]
fn source_archives_are_deleted_only_when_configured() {
    let mut pipeline = Pipeline::new();
    pipeline.config.delete_zips_after_import = true;
    let archive = pipeline.add_archive("acme.zip", &[("acme.xml", OPENIMMO_DOCUMENT)]);

    let log = pipeline.run();

    assert!(!archive.exists());
    assert!(!archive.with_extension("").exists());
    // The line lists the deleted ZIP and nothing else.
    assert!(log.contains("removed files: acme.zip\n"));
}

#[test]
fn archives_without_an_xml_payload_send_no_notification() {
    let pipeline = Pipeline::new();
    pipeline.add_archive("empty.zip", &[("readme.txt", "no payload here")]);

    let log = pipeline.run();
    let store = &pipeline.store;
    let mailer = &pipeline.mailer;

    // With no record and no recoverable sender address there is nobody
    // to notify; the failure only reaches the run log.
    assert!(log.contains("no XML file found"));
    assert!(store.is_empty());
    assert!(mailer.messages().is_empty());
}

#[test]
fn archives_without_records_notify_the_recovered_sender_addresses() {
    let pipeline = Pipeline::new();
    pipeline.add_archive(
        "empty.zip",
        &[(
            "empty.xml",
            "<openimmo><anbieter>\
               <email_zentrale>office@example.com</email_zentrale>\
             </anbieter></openimmo>",
        )],
    );

    pipeline.run();

    let messages = pipeline.mailer.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "office@example.com");
    assert!(messages[0].2.contains("extracted successfully"));
}

#[test]
fn images_are_copied_into_the_upload_directory() {
    let pipeline = Pipeline::new();
    pipeline.add_archive(
        "acme.zip",
        &[
            ("acme.xml", OPENIMMO_DOCUMENT),
            ("front.jpg", "jpeg bytes"),
            ("plan.PNG", "png bytes"),
            ("notes.txt", "not an image"),
        ],
    );
    let upload_folder = pipeline.config.upload_folder.clone();

    pipeline.run();

    assert!(upload_folder.join("front.jpg").exists());
    assert!(upload_folder.join("plan.PNG").exists());
    assert!(!upload_folder.join("notes.txt").exists());
}

struct UnreachableCountries;

impl openimmo_import::store::CountryStore for UnreachableCountries {
    fn find_by_iso_code(&self, _code: &str) -> anyhow::Result<Option<u32>> {
        anyhow::bail!("reference-data store unreachable")
    }
}

#[test]
fn a_failing_reference_store_aborts_the_whole_run() {
    let pipeline = Pipeline::new();
    let document = "<openimmo><anbieter><immobilie>\
           <verwaltung_techn><objektnr_extern>OBJ-1</objektnr_extern></verwaltung_techn>\
           <geo><ort>Bonn</ort><land iso_land=\"DEU\"/></geo>\
         </immobilie></anbieter></openimmo>";
    pipeline.add_archive("a.zip", &[("a.xml", document)]);
    pipeline.add_archive("b.zip", &[("b.xml", document)]);

    let importer = Importer::new(
        pipeline.config.clone(),
        Arc::clone(&pipeline.store) as Arc<dyn openimmo_import::store::PropertyStore>,
        Arc::new(UnreachableCountries),
        Arc::clone(&pipeline.mailer) as Arc<dyn openimmo_import::store::MailTransport>,
        Arc::new(NoopRenderCache),
    );
    let log = importer.import_from_zip();

    // A broken environment ends the run at once: the failure is the last
    // log line, the second archive is never touched and neither
    // notification nor cleanup happens.
    assert!(log.contains("reference-data store unreachable"));
    assert!(!log.contains("b.zip"));
    assert!(log.trim_end().ends_with("reference-data store unreachable"));
    assert!(pipeline.store.is_empty());
    assert!(pipeline.mailer.messages().is_empty());
    assert!(pipeline.config.import_folder.join("b.zip").exists());
    assert!(!pipeline.config.import_folder.join("b").exists());
}

#[test]
fn deletion_requests_remove_previously_imported_records() {
    let pipeline = Pipeline::new();
    pipeline.add_archive("acme.zip", &[("acme.xml", OPENIMMO_DOCUMENT)]);
    pipeline.run();
    let store = &pipeline.store;
    assert_eq!(store.records().len(), 2);

    let pipeline = Pipeline::new();
    let deletion = r#"<openimmo><anbieter><immobilie>
        <verwaltung_techn>
          <objektnr_extern>OBJ-1</objektnr_extern>
          <aktion aktionart="DELETE"/>
        </verwaltung_techn>
        <geo><ort>Bonn</ort></geo>
      </immobilie></anbieter></openimmo>"#;
    pipeline.add_archive("delete.zip", &[("delete.xml", deletion)]);

    let log = pipeline.run();
    assert!(log.contains("the deletion flag is set"));
}
