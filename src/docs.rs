// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "Tailor POS API", description = "Point of sale and inventory for tailoring shops"),
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,
        handlers::auth::change_password,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::auth::accept_invitation,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::invite_user,
        handlers::users::list_invitations,
        handlers::users::update_role,
        handlers::users::deactivate_user,

        // --- Catalog ---
        handlers::categories::list_categories,
        handlers::categories::create_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::products::list_products,
        handlers::products::low_stock,
        handlers::products::get_product,
        handlers::products::get_by_barcode,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::products::barcode_svg,
        handlers::products::qrcode_svg,

        // --- Inventory ---
        handlers::inventory::create_movement,
        handlers::inventory::list_movements,
        handlers::inventory::summary,

        // --- Customers ---
        handlers::customers::list_customers,
        handlers::customers::get_customer,
        handlers::customers::create_customer,
        handlers::customers::update_customer,
        handlers::customers::delete_customer,
        handlers::customers::customer_bills,
        handlers::customers::list_measurements,
        handlers::customers::create_measurement,
        handlers::customers::update_measurement,
        handlers::customers::delete_measurement,

        // --- Bills ---
        handlers::bills::create_bill,
        handlers::bills::list_bills,
        handlers::bills::get_bill,
        handlers::bills::add_payment,
        handlers::bills::cancel_bill,
        handlers::bills::invoice_pdf,
        handlers::bills::whatsapp_link,
        handlers::bills::send_whatsapp,
        handlers::bills::email_invoice,

        // --- Settings ---
        handlers::settings::get_business,
        handlers::settings::update_business,
        handlers::settings::list_settings,
        handlers::settings::get_setting,
        handlers::settings::put_setting,
        handlers::settings::delete_setting,

        // --- Reports ---
        handlers::reports::dashboard,
        handlers::reports::sales,
        handlers::reports::top_products,
        handlers::reports::payments,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::Invitation,
            models::auth::AuthResponse,
            models::auth::InvitationCreated,

            // --- Inventory ---
            models::inventory::Category,
            models::inventory::Product,
            models::inventory::MovementType,
            models::inventory::InventoryMovement,
            models::inventory::InventorySummary,

            // --- CRM ---
            models::crm::Customer,
            models::crm::MeasurementUnit,
            models::crm::Measurement,

            // --- Billing ---
            models::billing::BillStatus,
            models::billing::PaymentMethod,
            models::billing::Bill,
            models::billing::BillItem,
            models::billing::Payment,
            models::billing::BillDetail,

            // --- Settings / reports ---
            models::settings::BusinessSettings,
            models::settings::Setting,
            models::reports::DashboardSummary,
            models::reports::DailySales,
            models::reports::TopProduct,
            models::reports::PaymentMethodTotal,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and database check"),
        (name = "Auth", description = "Registration, login, password recovery and invitations"),
        (name = "Users", description = "Staff accounts and roles"),
        (name = "Categories", description = "Product categories"),
        (name = "Products", description = "Catalog, barcodes and QR labels"),
        (name = "Inventory", description = "Stock movements and valuation"),
        (name = "Customers", description = "Customers and body measurements"),
        (name = "Bills", description = "Billing, payments and invoice delivery"),
        (name = "Settings", description = "Business profile and key/value settings"),
        (name = "Reports", description = "Dashboard and sales reports")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme("api_jwt", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_area_and_the_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/bills/{id}/payments"));
        assert!(doc.paths.paths.contains_key("/api/products/barcode/{code}"));
        assert!(doc.paths.paths.contains_key("/api/reports/top-products"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
