use crate::external::MonobankWebhook;
use crate::services::OrderService;
use actix_web::{HttpResponse, Result, web};
use log::{error, info, warn};

/// Monobank payment callback.
///
/// Always answers 200 so the gateway stops retrying; failures are logged
/// and the order stays pending for manual follow-up.
pub async fn monobank_webhook(
    order_service: web::Data<OrderService>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let webhook: MonobankWebhook = match serde_json::from_slice(&body) {
        Ok(webhook) => webhook,
        Err(e) => {
            warn!("Undecodable Monobank webhook payload: {e}");
            return Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })));
        }
    };

    info!(
        "Monobank webhook: invoice={} status={}",
        webhook.invoice_id, webhook.status
    );

    match order_service.handle_payment_webhook(&webhook).await {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true }))),
        Err(e) => {
            error!("Monobank webhook processing failed: {e}");
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "received": true,
                "error": format!("Processing failed: {}", e)
            })))
        }
    }
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhook").route("/monobank", web::post().to(monobank_webhook)));
}
