use actix_web::{get, web, HttpResponse};
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::services::campaign_store::CampaignStore;
use crate::services::progress::ProgressHub;

#[derive(Deserialize)]
pub struct EventsQuery {
    pub company_id: Option<Uuid>,
}

/// Server-push activity feed for one campaign. Closing the stream ends the
/// monitoring session only; processing carries on regardless.
#[get("/{campaign_id}/events")]
async fn campaign_events(
    store: web::Data<CampaignStore>,
    hub: web::Data<ProgressHub>,
    path: web::Path<Uuid>,
    query: web::Query<EventsQuery>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    if store.get(campaign_id).is_none() {
        return HttpResponse::NotFound().body("Campaign not found");
    }

    let company_filter = query.company_id;
    let receiver = hub.subscribe(campaign_id);

    let stream = BroadcastStream::new(receiver).filter_map(move |item| {
        let out = match item {
            Ok(frame) => {
                // Campaign-wide frames pass a company filter; company frames
                // must match it.
                let wanted = company_filter
                    .map_or(true, |id| frame.company_id.is_none() || frame.company_id == Some(id));
                if wanted {
                    serde_json::to_string(&frame).ok().map(|json| {
                        Ok::<web::Bytes, actix_web::Error>(web::Bytes::from(format!(
                            "event: {}\ndata: {}\n\n",
                            frame.event.event_name(),
                            json
                        )))
                    })
                } else {
                    None
                }
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                log::warn!("Progress subscriber lagged by {} frames", skipped);
                None
            }
        };
        futures::future::ready(out)
    });

    HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-cache"))
        .content_type("text/event-stream")
        .streaming(stream)
}
