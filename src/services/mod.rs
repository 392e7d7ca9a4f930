pub mod campaign_store;
pub mod captcha;
pub mod contact_locator;
pub mod droid;
pub mod export;
pub mod form_filler;
pub mod form_locator;
pub mod input_loader;
pub mod progress;
pub mod runner;

pub use campaign_store::*;
pub use captcha::*;
pub use contact_locator::*;
pub use droid::*;
pub use export::*;
pub use form_filler::*;
pub use form_locator::*;
pub use input_loader::*;
pub use progress::*;
pub use runner::*;
