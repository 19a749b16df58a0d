// src/routes.rs

use axum::{
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => layer.allow_origin(value),
        Some(Err(_)) => {
            tracing::warn!("CORS_ORIGIN is not a valid header value, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

pub fn create_router(app_state: AppState) -> Router {
    // Public
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/forgot-password", post(handlers::auth::forgot_password))
        .route("/reset-password", post(handlers::auth::reset_password))
        .route("/invitations/accept", post(handlers::auth::accept_invitation));

    let user_routes = Router::new()
        .route("/", get(handlers::users::list_users))
        .route(
            "/invitations",
            post(handlers::users::invite_user).get(handlers::users::list_invitations),
        )
        .route("/{id}/role", put(handlers::users::update_role))
        .route("/{id}", delete(handlers::users::deactivate_user));

    let category_routes = Router::new()
        .route(
            "/",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route(
            "/{id}",
            put(handlers::categories::update_category).delete(handlers::categories::delete_category),
        );

    let product_routes = Router::new()
        .route(
            "/",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route("/low-stock", get(handlers::products::low_stock))
        .route("/barcode/{code}", get(handlers::products::get_by_barcode))
        .route(
            "/{id}",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route("/{id}/barcode.svg", get(handlers::products::barcode_svg))
        .route("/{id}/qrcode.svg", get(handlers::products::qrcode_svg));

    let inventory_routes = Router::new()
        .route(
            "/movements",
            post(handlers::inventory::create_movement).get(handlers::inventory::list_movements),
        )
        .route("/summary", get(handlers::inventory::summary));

    let customer_routes = Router::new()
        .route(
            "/",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/{id}",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .route("/{id}/bills", get(handlers::customers::customer_bills))
        .route(
            "/{id}/measurements",
            get(handlers::customers::list_measurements).post(handlers::customers::create_measurement),
        )
        .route(
            "/{id}/measurements/{mid}",
            put(handlers::customers::update_measurement).delete(handlers::customers::delete_measurement),
        );

    let bill_routes = Router::new()
        .route("/", post(handlers::bills::create_bill).get(handlers::bills::list_bills))
        .route("/{id}", get(handlers::bills::get_bill))
        .route("/{id}/payments", post(handlers::bills::add_payment))
        .route("/{id}/cancel", post(handlers::bills::cancel_bill))
        .route("/{id}/pdf", get(handlers::bills::invoice_pdf))
        .route(
            "/{id}/whatsapp",
            get(handlers::bills::whatsapp_link).post(handlers::bills::send_whatsapp),
        )
        .route("/{id}/email", post(handlers::bills::email_invoice));

    let settings_routes = Router::new()
        .route("/", get(handlers::settings::list_settings))
        .route(
            "/business",
            get(handlers::settings::get_business).put(handlers::settings::update_business),
        )
        .route(
            "/{key}",
            get(handlers::settings::get_setting)
                .put(handlers::settings::put_setting)
                .delete(handlers::settings::delete_setting),
        );

    let report_routes = Router::new()
        .route("/dashboard", get(handlers::reports::dashboard))
        .route("/sales", get(handlers::reports::sales))
        .route("/top-products", get(handlers::reports::top_products))
        .route("/payments", get(handlers::reports::payments));

    // Everything below requires a valid bearer token
    let protected = Router::new()
        .route("/api/auth/me", get(handlers::auth::get_me))
        .route("/api/auth/me/password", put(handlers::auth::change_password))
        .nest("/api/users", user_routes)
        .nest("/api/categories", category_routes)
        .nest("/api/products", product_routes)
        .nest("/api/inventory", inventory_routes)
        .nest("/api/customers", customer_routes)
        .nest("/api/bills", bill_routes)
        .nest("/api/settings", settings_routes)
        .nest("/api/reports", report_routes)
        // route_layer so unmatched paths fall through to 404
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let cors = cors_layer(app_state.config.cors_origin.as_deref());

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(handlers::health::health))
        .nest("/api/auth", auth_routes)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::lazy_state;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = create_router(lazy_state());

        let response = app
            .oneshot(Request::builder().uri("/api/products").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_token_is_rejected() {
        let app = create_router(lazy_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/bills")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        for uri in ["/api/nothing-here", "/api/products/1/nope", "/nowhere"] {
            let app = create_router(lazy_state());

            let response = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn health_reports_database_state() {
        let app = create_router(lazy_state());

        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(matches!(
            response.status(),
            StatusCode::OK | StatusCode::SERVICE_UNAVAILABLE
        ));
    }
}
