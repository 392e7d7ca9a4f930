use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::services::campaign_store::CampaignStore;
use crate::services::export::{render_campaign_csv, CommentVerbosity};

#[derive(Deserialize)]
pub struct ExportQuery {
    pub verbosity: Option<String>,
}

#[get("/{campaign_id}/export")]
async fn export_campaign(
    store: web::Data<CampaignStore>,
    path: web::Path<Uuid>,
    query: web::Query<ExportQuery>,
) -> HttpResponse {
    let Some(campaign) = store.get(path.into_inner()) else {
        return HttpResponse::NotFound().body("Campaign not found");
    };

    let verbosity = CommentVerbosity::parse(query.verbosity.as_deref().unwrap_or("standard"));

    match render_campaign_csv(&campaign, verbosity) {
        Ok(rendered) => HttpResponse::Ok()
            .content_type("text/csv")
            .append_header((
                "Content-Disposition",
                format!("attachment; filename=\"campaign_{}.csv\"", campaign.id),
            ))
            .body(rendered),
        Err(e) => {
            log::error!("Export rendering failed: {:?}", e);
            HttpResponse::InternalServerError().body("Export failed")
        }
    }
}
