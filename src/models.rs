pub mod auth;
pub mod billing;
pub mod crm;
pub mod inventory;
pub mod reports;
pub mod settings;
