//! Importer for OpenImmo real-estate data.
//!
//! Vendor-supplied ZIP archives are unpacked, their OpenImmo XML payload
//! is converted into flat property records, the records are persisted
//! with required-field validation, attached images are relocated, and the
//! contact persons receive a notification digest. The whole run produces
//! one consolidated log text.

pub mod config;
pub mod i18n;
pub mod import;
pub mod models;
pub mod openimmo;
pub mod store;
