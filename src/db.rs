pub mod user_repo;
pub use user_repo::UserRepository;
pub mod client_repo;
pub use client_repo::ClientRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod prospect_repo;
pub use prospect_repo::ProspectRepository;
