//! OpenImmo XML handling: the tag-to-column mapping, the record
//! converter and the country code resolver.

pub mod converter;
pub mod country;
pub mod mapping;

pub use converter::RecordConverter;
pub use country::CountryResolver;
