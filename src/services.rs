pub mod auth;
pub mod barcode_service;
pub mod billing_service;
pub mod document_service;
pub mod email_service;
pub mod inventory_service;
pub mod pricing;
pub mod whatsapp_service;
