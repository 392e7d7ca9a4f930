use std::io::Write;
use std::path::PathBuf;

use actix_multipart::Multipart;
use actix_web::{get, post, web, HttpResponse};
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::sender_profile::SenderProfile;
use crate::services::campaign_store::CampaignStore;
use crate::services::input_loader::{companies_from_rows, load_companies, CompanyRow};
use crate::services::runner::{CampaignJob, CampaignJobSender, RunMode};

#[derive(Deserialize)]
pub struct NewCompanyBody {
    pub website_url: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCampaignBody {
    pub sender: SenderProfile,
    pub companies: Vec<NewCompanyBody>,
}

#[post("")]
async fn create_campaign(
    store: web::Data<CampaignStore>,
    body: web::Json<CreateCampaignBody>,
) -> HttpResponse {
    let body = body.into_inner();

    let rows: Vec<CompanyRow> = body
        .companies
        .into_iter()
        .map(|c| CompanyRow {
            website: Some(c.website_url),
            company: c.company_name,
            email: c.contact_email,
            person: c.contact_person,
            phone: c.phone,
        })
        .collect();

    let companies = companies_from_rows(rows);
    if companies.is_empty() {
        return HttpResponse::BadRequest().body("No row yielded a website url");
    }

    let campaign = store.create(body.sender, companies);
    HttpResponse::Ok().json(campaign)
}

/// Spreadsheet upload variant: a `file` part (csv/xlsx) and a `sender` part
/// carrying the profile as json.
#[post("/upload")]
async fn upload_campaign(
    store: web::Data<CampaignStore>,
    mut payload: Multipart,
) -> HttpResponse {
    let upload_dir = PathBuf::from("uploads");
    let _ = std::fs::create_dir_all(&upload_dir);

    let mut sender: Option<SenderProfile> = None;
    let mut saved_path: Option<PathBuf> = None;

    while let Ok(Some(mut field)) = payload.try_next().await {
        let (name, filename) = {
            let cd = field.content_disposition();
            (
                cd.and_then(|c| c.get_name()).unwrap_or("").to_string(),
                cd.and_then(|c| c.get_filename()).map(|f| f.to_string()),
            )
        };

        match name.as_str() {
            "file" => {
                let mut extension = "csv".to_string();
                if let Some(original) = filename {
                    let original = original.to_lowercase();
                    if original.ends_with(".xlsx") {
                        extension = "xlsx".to_string();
                    } else if original.ends_with(".xls") {
                        extension = "xls".to_string();
                    }
                }

                let path = upload_dir.join(format!("{}.{}", Uuid::new_v4(), extension));
                let mut file = match std::fs::File::create(&path) {
                    Ok(file) => file,
                    Err(e) => {
                        log::error!("Could not create upload file: {}", e);
                        return HttpResponse::InternalServerError().body("Upload failed");
                    }
                };

                while let Some(chunk) = field.next().await {
                    let data = match chunk {
                        Ok(data) => data,
                        Err(e) => {
                            log::error!("Broken upload stream: {:?}", e);
                            return HttpResponse::BadRequest().body("Broken upload stream");
                        }
                    };
                    if let Err(e) = file.write_all(&data) {
                        log::error!("Could not write upload chunk: {}", e);
                        return HttpResponse::InternalServerError().body("Upload failed");
                    }
                }

                saved_path = Some(path);
            }
            "sender" => {
                let mut bytes = web::BytesMut::new();
                while let Some(chunk) = field.next().await {
                    match chunk {
                        Ok(data) => bytes.extend_from_slice(&data),
                        Err(e) => {
                            log::error!("Broken sender part: {:?}", e);
                            return HttpResponse::BadRequest().body("Broken sender part");
                        }
                    }
                }
                match serde_json::from_slice::<SenderProfile>(&bytes) {
                    Ok(profile) => sender = Some(profile),
                    Err(e) => {
                        return HttpResponse::BadRequest()
                            .body(format!("Sender profile did not parse: {}", e))
                    }
                }
            }
            _ => {}
        }
    }

    let Some(sender) = sender else {
        return HttpResponse::BadRequest().body("Missing sender part");
    };
    let Some(path) = saved_path else {
        return HttpResponse::BadRequest().body("Missing file part");
    };

    let companies = load_companies(&path);
    if companies.is_empty() {
        return HttpResponse::BadRequest().body("No row yielded a website url");
    }

    let campaign = store.create(sender, companies);
    HttpResponse::Ok().json(campaign)
}

#[get("/{campaign_id}")]
async fn get_campaign(store: web::Data<CampaignStore>, path: web::Path<Uuid>) -> HttpResponse {
    match store.get(path.into_inner()) {
        Some(campaign) => HttpResponse::Ok().json(campaign),
        None => HttpResponse::NotFound().body("Campaign not found"),
    }
}

#[get("/{campaign_id}/companies")]
async fn list_companies(store: web::Data<CampaignStore>, path: web::Path<Uuid>) -> HttpResponse {
    match store.companies(path.into_inner()) {
        Some(companies) => HttpResponse::Ok().json(companies),
        None => HttpResponse::NotFound().body("Campaign not found"),
    }
}

#[post("/{campaign_id}/start")]
async fn start_campaign(
    store: web::Data<CampaignStore>,
    jobs: web::Data<CampaignJobSender>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    if store.get(campaign_id).is_none() {
        return HttpResponse::NotFound().body("Campaign not found");
    }

    match jobs.sender.send(CampaignJob {
        campaign_id,
        mode: RunMode::RapidAll,
    }) {
        Ok(()) => HttpResponse::Ok().json("Campaign started"),
        Err(e) => {
            log::error!("Campaign job channel got an Error: {:?}", e);
            HttpResponse::InternalServerError().body("Runner unavailable")
        }
    }
}

#[post("/{campaign_id}/stop")]
async fn stop_campaign(store: web::Data<CampaignStore>, path: web::Path<Uuid>) -> HttpResponse {
    match store.stop(path.into_inner()) {
        true => HttpResponse::Ok().json("Campaign stopping"),
        false => HttpResponse::NotFound().body("Campaign not found"),
    }
}

/// Ad-hoc run of one company, typically a retry of a failed one.
#[post("/{campaign_id}/company/{company_id}/rapid")]
async fn rapid_process_company(
    store: web::Data<CampaignStore>,
    jobs: web::Data<CampaignJobSender>,
    path: web::Path<(Uuid, Uuid)>,
) -> HttpResponse {
    let (campaign_id, company_id) = path.into_inner();
    let Some(campaign) = store.get(campaign_id) else {
        return HttpResponse::NotFound().body("Campaign not found");
    };
    if campaign.company(company_id).is_none() {
        return HttpResponse::NotFound().body("Company not found");
    }

    match jobs.sender.send(CampaignJob {
        campaign_id,
        mode: RunMode::Single(company_id),
    }) {
        Ok(()) => HttpResponse::Ok().json("Company queued"),
        Err(e) => {
            log::error!("Campaign job channel got an Error: {:?}", e);
            HttpResponse::InternalServerError().body("Runner unavailable")
        }
    }
}

#[post("/{campaign_id}/company/{company_id}/requeue")]
async fn requeue_company(
    store: web::Data<CampaignStore>,
    path: web::Path<(Uuid, Uuid)>,
) -> HttpResponse {
    let (campaign_id, company_id) = path.into_inner();
    match store.requeue(campaign_id, company_id) {
        true => HttpResponse::Ok().json("Company re-queued"),
        false => HttpResponse::BadRequest().body("Company is not in a terminal status"),
    }
}
