use std::net::TcpListener;

use actix_files::Files;
use actix_web::{
    dev::Server,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};

use crate::{
    routes::{campaign_route, default_route, export_route, progress_route},
    services::{CampaignJobSender, CampaignStore, ProgressHub},
};

pub fn run(
    listener: TcpListener,
    store: CampaignStore,
    hub: ProgressHub,
    job_sender: CampaignJobSender,
    screenshot_dir: String,
) -> Result<Server, std::io::Error> {
    let store = Data::new(store);
    let hub = Data::new(hub);
    let job_sender = Data::new(job_sender);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(Files::new("/screenshots", screenshot_dir.clone()).prefer_utf8(true))
            .service(default_route::default)
            .service(default_route::health)
            .service(
                web::scope("/campaign")
                    .service(campaign_route::create_campaign)
                    .service(campaign_route::upload_campaign)
                    .service(campaign_route::start_campaign)
                    .service(campaign_route::stop_campaign)
                    .service(campaign_route::rapid_process_company)
                    .service(campaign_route::requeue_company)
                    .service(campaign_route::list_companies)
                    .service(progress_route::campaign_events)
                    .service(export_route::export_campaign)
                    .service(campaign_route::get_campaign),
            )
            .app_data(store.clone())
            .app_data(hub.clone())
            .app_data(job_sender.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
