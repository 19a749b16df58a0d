pub mod user_repo;
pub use user_repo::UserRepository;
pub mod organization_repo;
pub use organization_repo::OrganizationRepository;
pub mod token_repo;
pub use token_repo::TokenRepository;
pub mod category_repo;
pub use category_repo::CategoryRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod bill_repo;
pub use bill_repo::BillRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod report_repo;
pub use report_repo::ReportRepository;
