pub mod auth;
pub mod clients;
pub mod catalog;
pub mod commissions;
pub mod prospects;
pub mod imports;
