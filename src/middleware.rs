pub mod auth;
pub mod pagination;
pub mod rbac;
pub mod validation;
