pub mod auth;
pub mod client;
pub mod import;
pub mod product;
pub mod prospect;
