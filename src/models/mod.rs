pub mod documents;
pub mod fields;
pub mod records;
