use crate::config::ImportConfig;
use crate::i18n::Translator;
use crate::store::MailTransport;
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::warn;

/// Placeholder object number for digest entries that could not be tied to
/// a specific record.
const NO_OBJECT_NUMBER: &str = "------";

pub const MAIL_SUBJECT: &str = "OpenImmo import";

/// One raw notification entry, collected per persisted (or rejected)
/// record during the run.
#[derive(Debug, Clone)]
pub struct DigestEntry {
    /// Contact address of the record; may be empty when none was found.
    pub recipient: String,
    /// Object number of the record; may be empty for archive-level
    /// failures.
    pub object_number: String,
    /// Log fragment covering this record.
    pub log: String,
    /// Error fragment covering this record.
    pub errors: String,
}

/// Aggregates per-record outcomes into per-recipient digests and sends
/// them through the configured mail transport.
pub struct NotificationComposer<'a> {
    config: &'a ImportConfig,
    translator: &'a Translator,
}

impl<'a> NotificationComposer<'a> {
    pub fn new(config: &'a ImportConfig, translator: &'a Translator) -> Self {
        Self { config, translator }
    }

    /// Group raw entries by their final recipient address.
    ///
    /// Blank recipients, and all recipients when contact notification is
    /// disabled, fall back to the configured default address. Blank object
    /// numbers become a placeholder. Depending on the errors-only switch
    /// the digest carries either the full log or only the error log; after
    /// selection, entries without any text and then recipients without any
    /// entries are pruned so no empty mail is ever sent.
    pub fn prepare(&self, entries: &[DigestEntry]) -> BTreeMap<String, Vec<(String, String)>> {
        let mut digests: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();

        for entry in entries {
            let recipient =
                if !self.config.notify_contact_persons || entry.recipient.is_empty() {
                    self.config.default_email.clone()
                } else {
                    entry.recipient.clone()
                };

            let object_number = if entry.object_number.is_empty() {
                NO_OBJECT_NUMBER.to_string()
            } else {
                entry.object_number.clone()
            };

            let body = if self.config.only_errors {
                entry.errors.clone()
            } else {
                entry.log.clone()
            };

            digests.entry(recipient).or_default().push((object_number, body));
        }

        for sections in digests.values_mut() {
            sections.retain(|(_, body)| !body.is_empty());
        }
        digests.retain(|_, sections| !sections.is_empty());

        digests
    }

    /// Render one digest into the fixed mail body layout.
    fn render_body(&self, sections: &[(String, String)]) -> String {
        let mut body = String::new();
        body.push_str(self.translator.get("label_introduction"));
        body.push_str("\n\n");

        for (object_number, log) in sections {
            body.push_str(&format!(
                "{} {}:\n{}\n",
                self.translator.get("label_object_number"),
                object_number,
                log
            ));
        }

        body.push_str(self.translator.get("label_explanation"));
        body.push('\n');
        body
    }

    /// Send one mail per recipient. Dispatch is disabled entirely when no
    /// default address is configured, because the recipient fallback
    /// depends on it. Returns the list of addresses that were notified.
    pub fn dispatch(
        &self,
        entries: &[DigestEntry],
        mailer: &dyn MailTransport,
    ) -> Result<Vec<String>> {
        if self.config.default_email.is_empty() {
            return Ok(Vec::new());
        }

        let digests = self.prepare(entries);
        let mut notified = Vec::new();

        for (recipient, sections) in &digests {
            let body = self.render_body(sections);
            if let Err(error) = mailer.send(recipient, MAIL_SUBJECT, &body) {
                warn!("Sending notification to {} failed: {}", recipient, error);
                continue;
            }
            notified.push(recipient.clone());
        }

        Ok(notified)
    }
}
