pub mod auth;
pub mod client_service;
pub use client_service::ClientService;
pub mod commission_service;
pub use commission_service::CommissionService;
pub mod catalog_service;
pub use catalog_service::CatalogService;
pub mod prospect_service;
pub use prospect_service::ProspectService;
pub mod import_service;
pub use import_service::ImportService;
