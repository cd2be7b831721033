//! Background scheduled tasks for the application.
//!
//! Two recurring jobs: retrying survey completion reports whose inline
//! dispatch failed, and refreshing Nova Poshta tracking for shipped orders.
//! Call `spawn_all` once during startup to launch them.

use crate::external::NovaPoshtaService;
use crate::services::{OrderService, SurveyService};

/// Spawn all background tasks.
///
/// Notes
/// - Each task is idempotent as implemented in its service and runs on its own schedule.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(
    survey_service: SurveyService,
    order_service: OrderService,
    novaposhta: NovaPoshtaService,
) {
    // Survey report sweep (every minute). Picks up completed sessions whose
    // report was never delivered.
    {
        let svc = survey_service.clone();
        tokio::spawn(async move {
            loop {
                match svc.send_pending_reports().await {
                    Ok(n) if n > 0 => log::info!("Survey reports delivered: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Survey report sweep failed: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
        });
    }

    // Tracking refresh (every 10 minutes). Shipped orders whose parcel was
    // received move to done.
    {
        let orders = order_service.clone();
        let np = novaposhta.clone();
        tokio::spawn(async move {
            loop {
                if np.is_configured() {
                    if let Err(e) = refresh_tracking(&orders, &np).await {
                        log::error!("Tracking refresh failed: {e:?}");
                    }
                }
                tokio::time::sleep(std::time::Duration::from_secs(600)).await;
            }
        });
    }
}

async fn refresh_tracking(
    orders: &OrderService,
    novaposhta: &NovaPoshtaService,
) -> crate::error::AppResult<()> {
    for order in orders.shipped_orders().await? {
        let Some(tracking_number) = order.tracking_number.as_deref() else {
            continue;
        };
        match novaposhta.track(tracking_number).await {
            Ok(doc) if doc.is_delivered() => {
                log::info!("Order {} delivered ({tracking_number})", order.id);
                orders.mark_done(order.id).await?;
            }
            Ok(doc) => {
                log::debug!(
                    "Order {} still in transit: {} ({})",
                    order.id,
                    doc.status,
                    doc.status_code
                );
            }
            Err(e) => log::warn!("Tracking lookup for {tracking_number} failed: {e:?}"),
        }
    }
    Ok(())
}
