pub mod auth;
pub mod bills;
pub mod categories;
pub mod customers;
pub mod health;
pub mod inventory;
pub mod products;
pub mod reports;
pub mod settings;
pub mod users;
