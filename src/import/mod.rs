//! The import pipeline: archive discovery, extraction, conversion,
//! persistence, image relocation, notification and cleanup.

pub mod extract;
pub mod notify;
pub mod run;
pub mod schema;

pub use extract::ArchiveExtractor;
pub use notify::{DigestEntry, NotificationComposer};
pub use run::ImportRun;
pub use schema::SchemaOutcome;

use crate::config::ImportConfig;
use crate::i18n::Translator;
use crate::models::PropertyRecord;
use crate::openimmo::{CountryResolver, RecordConverter};
use crate::store::{CountryStore, MailTransport, PropertyStore, RenderCache, WriteOutcome};
use anyhow::Result;
use chrono::Local;
use regex::Regex;
use roxmltree::Document;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// File extensions of image annexes that are copied from the extraction
/// working directory into the upload directory.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "JPG", "jpeg", "JPEG", "png", "PNG", "gif", "GIF"];

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("address pattern compiles")
    })
}

/// Drives the end-to-end import across all archives in the configured
/// import directory and produces the consolidated run log.
///
/// Per-archive failures never abort the run; the pipeline always reaches
/// notification and cleanup, and the returned log is the only surface the
/// operator sees.
pub struct Importer {
    config: ImportConfig,
    translator: Translator,
    store: Arc<dyn PropertyStore>,
    countries: Arc<dyn CountryStore>,
    mailer: Arc<dyn MailTransport>,
    cache: Arc<dyn RenderCache>,
}

impl Importer {
    pub fn new(
        config: ImportConfig,
        store: Arc<dyn PropertyStore>,
        countries: Arc<dyn CountryStore>,
        mailer: Arc<dyn MailTransport>,
        cache: Arc<dyn RenderCache>,
    ) -> Self {
        let translator = Translator::new(&config.language);
        Self {
            config,
            translator,
            store,
            countries,
            mailer,
            cache,
        }
    }

    /// Run one complete import and return the log text. The log always
    /// starts with a timestamp line, even when nothing else happens.
    pub fn import_from_zip(&self) -> String {
        let mut run = ImportRun::new();
        run.log(&Local::now().format("%Y-%m-%d %H:%M:%S").to_string());

        if self.config.import_folder.as_os_str().is_empty() {
            run.error(self.translator.get("message_import_directory_not_configured"));
            return run.into_log();
        }

        let archives = ArchiveExtractor::archives_in(&self.config.import_folder);
        if archives.is_empty() {
            run.log(self.translator.get("message_no_zips"));
            return run.into_log();
        }

        let mut entries: Vec<DigestEntry> = Vec::new();
        let mut resolver = CountryResolver::new(Arc::clone(&self.countries));

        for archive in &archives {
            if let Err(error) = self.process_archive(&mut run, &mut resolver, &mut entries, archive)
            {
                // A broken environment, not bad input: abort the whole run
                // with a minimal log instead of trying further archives.
                warn!("Import aborted at {}: {:#}", archive.display(), error);
                run.error(&format!("{:#}", error));
                return run.into_log();
            }
            run.flush();
        }

        self.dispatch_notifications(&mut run, &entries);
        self.cache.clear_property_pages();
        self.clean_up(&mut run, &archives);

        run.into_log()
    }

    /// Extract one archive, convert its XML payload and persist every
    /// record in it. Only a reference-data store failure is returned as an
    /// error; everything else lands in the run log.
    fn process_archive(
        &self,
        run: &mut ImportRun,
        resolver: &mut CountryResolver,
        entries: &mut Vec<DigestEntry>,
        archive: &Path,
    ) -> Result<()> {
        let extractor = ArchiveExtractor::new(&self.translator);
        extractor.extract(run, archive);

        let mut document_text = None;
        if let Some(xml_path) = extractor.find_xml(run, archive, false) {
            match std::fs::read_to_string(&xml_path) {
                Ok(text) => document_text = Some(text),
                Err(error) => {
                    warn!("Cannot read {}: {}", xml_path.display(), error);
                    run.error(self.translator.get("message_validation_impossible"));
                }
            }
        }

        let document = match document_text.as_deref() {
            Some(text) => match Document::parse(text) {
                Ok(document) => Some(document),
                Err(error) => {
                    warn!("Cannot parse XML of {}: {}", archive.display(), error);
                    run.error(self.translator.get("message_validation_impossible"));
                    None
                }
            },
            None => None,
        };

        let records = match &document {
            Some(document) => {
                self.log_schema_outcome(run, document);
                let mut converter = RecordConverter::new(&self.translator, resolver);
                converter.convert(document)?
            }
            None => Vec::new(),
        };

        if records.is_empty() {
            self.collect_wrapped_entries(run, entries, document.as_ref());
            return Ok(());
        }

        let location = self.config.location_for_archive(archive);
        for mut record in records {
            self.ensure_contact_email(&mut record);
            self.persist_record(run, &record, location);

            entries.push(DigestEntry {
                recipient: record.contact_email().unwrap_or_default().to_string(),
                object_number: record.object_number().unwrap_or_default(),
                log: run.pending_log().to_string(),
                errors: run.pending_errors().to_string(),
            });
            run.flush();
        }

        self.copy_images(archive);
        Ok(())
    }

    /// Validation is advisory: every outcome is logged, none blocks the
    /// conversion that follows.
    fn log_schema_outcome(&self, run: &mut ImportRun, document: &Document) {
        match schema::validate(document, self.config.openimmo_schema.as_deref()) {
            SchemaOutcome::NotConfigured => run.log(&format!(
                "{} {}",
                self.translator.get("message_no_schema_file"),
                self.translator.get("message_import_without_validation")
            )),
            SchemaOutcome::InvalidSchemaPath => run.error(&format!(
                "{} {}",
                self.translator.get("message_invalid_schema_file_path"),
                self.translator.get("message_import_without_validation")
            )),
            SchemaOutcome::Violations(violations) => {
                for (line, message) in violations {
                    run.error(&format!(
                        "{} {}: {}",
                        self.translator.get("message_line"),
                        line,
                        message
                    ));
                }
            }
            SchemaOutcome::Valid => {
                run.log(self.translator.get("message_successful_validation"))
            }
        }
    }

    /// An invalid or absent contact address is silently replaced by the
    /// configured default; a record is never rejected for its address.
    fn ensure_contact_email(&self, record: &mut PropertyRecord) {
        let valid = record
            .contact_email()
            .is_some_and(|address| email_pattern().is_match(address));
        if !valid {
            record.set_contact_email(&self.config.default_email);
        }
    }

    fn persist_record(&self, run: &mut ImportRun, record: &PropertyRecord, location: u32) {
        match self.store.write(record, location) {
            WriteOutcome::Written => {
                run.log(self.translator.get("message_written_to_database"))
            }
            WriteOutcome::DeletedFlagSet => {
                run.log(self.translator.get("message_deleted_flag_set"))
            }
            WriteOutcome::RequiredFieldsMissing(fields) => {
                run.error(&self.with_validation_hint(format!(
                    "{}: {}.",
                    self.translator.get("message_fields_required"),
                    fields.join(", ")
                )));
            }
            WriteOutcome::Failed(reason) => {
                warn!("Persistence failed: {}", reason);
                run.error(&self.with_validation_hint(
                    self.translator.get("message_insertion_failed").to_string(),
                ));
            }
        }
    }

    /// The "please validate" hint only makes sense when a schema is
    /// configured for the operator to validate against.
    fn with_validation_hint(&self, message: String) -> String {
        if self.config.openimmo_schema.is_some() {
            format!("{} {}", message, self.translator.get("message_please_validate"))
        } else {
            message
        }
    }

    /// When an archive yielded no records, its log fragment is attached to
    /// whatever sender addresses can still be recovered from the raw XML,
    /// so failed imports notify someone when any address is found. Without
    /// a recoverable address no entry is produced and the fragment only
    /// reaches the run log.
    fn collect_wrapped_entries(
        &self,
        run: &mut ImportRun,
        entries: &mut Vec<DigestEntry>,
        document: Option<&Document>,
    ) {
        let recipients = document.map(recoverable_contact_emails).unwrap_or_default();

        let log = run.pending_log().to_string();
        let errors = run.pending_errors().to_string();
        for recipient in recipients {
            entries.push(DigestEntry {
                recipient,
                object_number: String::new(),
                log: log.clone(),
                errors: errors.clone(),
            });
        }
        run.flush();
    }

    /// Copy image annexes from the working directory into the upload
    /// directory, keyed by base name only. Collisions overwrite.
    fn copy_images(&self, archive: &Path) {
        if self.config.upload_folder.as_os_str().is_empty() {
            return;
        }

        let directory = ArchiveExtractor::working_directory(archive);
        let Ok(dir_entries) = std::fs::read_dir(&directory) else {
            return;
        };

        for entry in dir_entries.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| IMAGE_EXTENSIONS.contains(&extension));
            if !is_image {
                continue;
            }

            let Some(file_name) = path.file_name() else {
                continue;
            };
            let target = self.config.upload_folder.join(file_name);
            if let Err(error) = std::fs::copy(&path, &target) {
                warn!("Cannot copy {} to {}: {}", path.display(), target.display(), error);
            }
        }
    }

    fn dispatch_notifications(&self, run: &mut ImportRun, entries: &[DigestEntry]) {
        let composer = NotificationComposer::new(&self.config, &self.translator);
        match composer.dispatch(entries, self.mailer.as_ref()) {
            Ok(notified) if !notified.is_empty() => {
                info!("Notified {} recipients", notified.len());
                run.log(&format!(
                    "{} {}",
                    self.translator.get("message_log_sent_to"),
                    notified.join(", ")
                ));
            }
            Ok(_) => {}
            Err(error) => {
                warn!("Notification dispatch failed: {:#}", error);
                run.error(&format!("{:#}", error));
            }
        }
    }

    /// Delete only what this run recorded as eligible: the working
    /// directories it created, and the source ZIPs that were routed
    /// through "exactly one XML found" when deletion is configured. Only
    /// deleted ZIPs are listed in the log; removing the transient working
    /// directories is routine and not worth a line.
    fn clean_up(&self, run: &mut ImportRun, archives: &[std::path::PathBuf]) {
        let mut removed: Vec<String> = Vec::new();

        for archive in archives {
            if self.config.delete_zips_after_import
                && run.may_delete(archive)
                && std::fs::remove_file(archive).is_ok()
            {
                removed.push(base_name(archive));
            }

            let directory = ArchiveExtractor::working_directory(archive);
            if run.may_delete(&directory) && directory.exists() {
                if let Err(error) = std::fs::remove_dir_all(&directory) {
                    warn!("Cannot remove {}: {}", directory.display(), error);
                }
            }
        }

        if !removed.is_empty() {
            run.log(&format!(
                "{}: {}",
                self.translator.get("message_files_removed"),
                removed.join(", ")
            ));
        }
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sender addresses recoverable from a raw document: the contents of all
/// central and direct e-mail tags, deduplicated in document order.
fn recoverable_contact_emails(document: &Document) -> Vec<String> {
    let mut addresses = Vec::new();
    for node in document.descendants().filter(|node| {
        node.is_element()
            && matches!(node.tag_name().name(), "email_zentrale" | "email_direkt")
    }) {
        let text: String = node
            .descendants()
            .filter_map(|child| child.text())
            .collect::<String>()
            .trim()
            .to_string();
        if !text.is_empty() && !addresses.contains(&text) {
            addresses.push(text);
        }
    }
    addresses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_emails_are_deduplicated_in_document_order() {
        let document = Document::parse(
            "<openimmo>\
               <anbieter>\
                 <email_zentrale>first@example.com</email_zentrale>\
                 <immobilie><email_direkt>second@example.com</email_direkt></immobilie>\
                 <email_zentrale>first@example.com</email_zentrale>\
               </anbieter>\
             </openimmo>",
        )
        .unwrap();

        assert_eq!(
            recoverable_contact_emails(&document),
            vec!["first@example.com", "second@example.com"]
        );
    }

    #[test]
    fn address_pattern_accepts_plain_addresses_only() {
        assert!(email_pattern().is_match("agent@example.com"));
        assert!(!email_pattern().is_match("not-an-address"));
        assert!(!email_pattern().is_match(""));
        assert!(!email_pattern().is_match("two words@example.com"));
    }
}
