use std::net::TcpListener;

use env_logger::Env;
use herald::{
    configuration::get_configuration,
    services::{campaign_runner_handler, CampaignJob, CampaignJobSender, CampaignStore, ProgressHub},
    startup::run,
};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().expect("Failed to read configuration.");

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(address)?;

    std::fs::create_dir_all(&configuration.application.screenshot_dir)?;

    let store = CampaignStore::new();
    let hub = ProgressHub::new();

    let (job_sender, job_receiver) = mpsc::unbounded_channel::<CampaignJob>();
    let job_sender = CampaignJobSender { sender: job_sender };

    // Spawn backgound tasks
    let store_clone = store.clone();
    let hub_clone = hub.clone();
    let settings_clone = configuration.clone();
    tokio::spawn(async move {
        campaign_runner_handler(job_receiver, store_clone, hub_clone, settings_clone).await
    });

    log::info!(
        "Listening on {}:{}",
        configuration.application.host,
        configuration.application.port
    );

    run(
        listener,
        store,
        hub,
        job_sender,
        configuration.application.screenshot_dir,
    )?
    .await
}
