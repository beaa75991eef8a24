use actix_web::{error, web, HttpResponse};

use super::handlers;

/// Rejects undecodable JSON bodies with a 400 and a JSON error
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Missing values",
            "detail": err.to_string()
        }));

        error::InternalError::from_response(err, response).into()
    })
}

/// Configures the API routes
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .app_data(json_config())
            .route("/chain", web::get().to(handlers::get_chain))
            .route("/mine", web::get().to(handlers::mine_block))
            .route("/validate", web::get().to(handlers::validate_chain))
            .route("/transactions/pending", web::get().to(handlers::get_pending_transactions))
            .route("/transactions/new", web::post().to(handlers::new_transaction))
            .route("/nodes", web::get().to(handlers::get_nodes))
            .route("/nodes/register", web::post().to(handlers::register_nodes))
            .route("/nodes/resolve", web::get().to(handlers::resolve_conflicts))
            .route("/wallet/new", web::post().to(handlers::create_wallet))
            .route("/wallet/sign", web::post().to(handlers::sign_transaction))
    );
}
