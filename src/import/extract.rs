use crate::i18n::Translator;
use crate::import::run::ImportRun;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Locates and unpacks the vendor ZIP archives.
///
/// Every archive is extracted into a sibling working directory named after
/// the archive without its `.zip` suffix. Extraction never reuses a
/// pre-existing directory: that would silently mix the new contents with
/// prior partial state, so it is reported as a surplus folder instead.
pub struct ArchiveExtractor<'a> {
    translator: &'a Translator,
}

impl<'a> ArchiveExtractor<'a> {
    pub fn new(translator: &'a Translator) -> Self {
        Self { translator }
    }

    /// All `*.zip` files in the import directory, in name order. A missing
    /// directory yields an empty list, not an error.
    pub fn archives_in(directory: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(directory) else {
            return Vec::new();
        };

        let mut archives: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|extension| extension.eq_ignore_ascii_case("zip"))
            })
            .collect();
        archives.sort();
        archives
    }

    /// The working directory an archive extracts to.
    pub fn working_directory(archive: &Path) -> PathBuf {
        archive.with_extension("")
    }

    /// Extract one archive. Returns the working directory on success.
    /// Failures are logged into the run and reported as `None`; they never
    /// abort the surrounding import.
    pub fn extract(&self, run: &mut ImportRun, archive: &Path) -> Option<PathBuf> {
        if !archive.exists() {
            return None;
        }

        let file = match File::open(archive) {
            Ok(file) => file,
            Err(error) => {
                warn!("Cannot open {}: {}", archive.display(), error);
                run.error(&format!(
                    "{}: {}",
                    archive.display(),
                    self.translator.get("message_extraction_failed")
                ));
                return None;
            }
        };

        let mut zip = match ZipArchive::new(file) {
            Ok(zip) => zip,
            Err(error) => {
                warn!("Cannot read {}: {}", archive.display(), error);
                run.error(&format!(
                    "{}: {}",
                    archive.display(),
                    self.translator.get("message_extraction_failed")
                ));
                return None;
            }
        };

        let directory = Self::working_directory(archive);
        if directory.exists() {
            run.error(&format!(
                "{}: {}",
                directory.display(),
                self.translator.get("message_surplus_folder")
            ));
            return None;
        }

        if std::fs::create_dir_all(&directory).is_err() {
            run.error(&format!(
                "{}: {}",
                archive.display(),
                self.translator.get("message_extraction_failed")
            ));
            return None;
        }
        run.allow_deletion(&directory);

        if let Err(error) = zip.extract(&directory) {
            warn!("Extraction of {} failed: {}", archive.display(), error);
            run.error(&format!(
                "{}: {}",
                archive.display(),
                self.translator.get("message_extraction_failed")
            ));
            return None;
        }

        debug!("Extracted {} to {}", archive.display(), directory.display());
        run.log(&format!(
            "{}: {}",
            archive.display(),
            self.translator.get("message_extracted_successfully")
        ));
        Some(directory)
    }

    /// Locate the single XML payload of an extracted archive.
    ///
    /// Exactly one XML file routes the archive into conversion and marks
    /// the source ZIP as eligible for deletion during cleanup. Zero or
    /// several XML files are an error unless `silent` is set (the silent
    /// mode is used when recovering contact addresses from an archive that
    /// already failed).
    pub fn find_xml(&self, run: &mut ImportRun, archive: &Path, silent: bool) -> Option<PathBuf> {
        let directory = Self::working_directory(archive);

        let error_key = if directory.is_dir() {
            let mut xml_files: Vec<PathBuf> = std::fs::read_dir(&directory)
                .ok()?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| {
                    path.extension()
                        .is_some_and(|extension| extension.eq_ignore_ascii_case("xml"))
                })
                .collect();
            xml_files.sort();

            match xml_files.len() {
                1 => {
                    run.allow_deletion(archive);
                    return xml_files.pop();
                }
                0 => "message_no_xml",
                _ => "message_too_many_xml",
            }
        } else {
            "message_invalid_xml_path"
        };

        // Only report archives this run actually extracted; anything else
        // is a stray directory we never touched.
        if !silent && run.may_delete(&directory) {
            let base = archive
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            run.error(&format!("{}: {}", base, self.translator.get(error_key)));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

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
    fn archives_are_listed_in_name_order() {
        let dir = TempDir::new().unwrap();
        write_zip(&dir.path().join("b.zip"), &[("x.xml", "<a/>")]);
        write_zip(&dir.path().join("a.zip"), &[("x.xml", "<a/>")]);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let archives = ArchiveExtractor::archives_in(dir.path());
        assert_eq!(archives.len(), 2);
        assert!(archives[0].ends_with("a.zip"));
        assert!(archives[1].ends_with("b.zip"));
    }

    #[test]
    fn missing_import_directory_yields_no_archives() {
        assert!(ArchiveExtractor::archives_in(Path::new("/does/not/exist")).is_empty());
    }

    #[test]
    fn extraction_unpacks_into_the_working_directory() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("import.zip");
        write_zip(&archive, &[("objects.xml", "<openimmo/>")]);

        let translator = Translator::default();
        let extractor = ArchiveExtractor::new(&translator);
        let mut run = ImportRun::new();

        let working = extractor.extract(&mut run, &archive).unwrap();
        assert!(working.join("objects.xml").exists());
        assert!(run.pending_log().contains("extracted successfully"));
        assert!(run.pending_errors().is_empty());
    }

    #[test]
    fn pre_existing_working_directory_aborts_extraction() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("import.zip");
        write_zip(&archive, &[("objects.xml", "<openimmo/>")]);
        std::fs::create_dir(dir.path().join("import")).unwrap();

        let translator = Translator::default();
        let extractor = ArchiveExtractor::new(&translator);
        let mut run = ImportRun::new();

        assert!(extractor.extract(&mut run, &archive).is_none());
        assert!(run.pending_errors().contains("surplus folder"));
        // Nothing was extracted into the surplus folder.
        assert!(!dir.path().join("import/objects.xml").exists());
    }

    #[test]
    fn corrupt_archives_report_an_extraction_failure() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, "this is not a zip file").unwrap();

        let translator = Translator::default();
        let extractor = ArchiveExtractor::new(&translator);
        let mut run = ImportRun::new();

        assert!(extractor.extract(&mut run, &archive).is_none());
        assert!(run.pending_errors().contains("extraction failed"));
    }

    #[test]
    fn exactly_one_xml_file_is_required() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("import.zip");
        write_zip(
            &archive,
            &[("a.xml", "<openimmo/>"), ("b.xml", "<openimmo/>")],
        );

        let translator = Translator::default();
        let extractor = ArchiveExtractor::new(&translator);
        let mut run = ImportRun::new();

        extractor.extract(&mut run, &archive).unwrap();
        assert!(extractor.find_xml(&mut run, &archive, false).is_none());
        assert!(run.pending_errors().contains("too many XML files found"));
        // The source ZIP must not become eligible for deletion.
        assert!(!run.may_delete(&archive));
    }

    #[test]
    fn single_xml_marks_the_archive_deletable() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("import.zip");
        write_zip(&archive, &[("objects.xml", "<openimmo/>")]);

        let translator = Translator::default();
        let extractor = ArchiveExtractor::new(&translator);
        let mut run = ImportRun::new();

        extractor.extract(&mut run, &archive).unwrap();
        let xml = extractor.find_xml(&mut run, &archive, false).unwrap();
        assert!(xml.ends_with("objects.xml"));
        assert!(run.may_delete(&archive));
    }
}
