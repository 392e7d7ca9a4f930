pub mod campaign_route;
pub mod default_route;
pub mod export_route;
pub mod progress_route;
