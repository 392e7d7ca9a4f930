use std::path::Path;
use std::time::{Duration, Instant};

use thirtyfour::error::{WebDriverError, WebDriverResult};
use thirtyfour::{
    By, CapabilitiesHelper, ChromiumLikeCapabilities, DesiredCapabilities, PageLoadStrategy,
    WebDriver,
};

use crate::configuration::WebDriverSettings;

pub enum Navigation {
    Loaded,
    TimedOut,
}

/// One disposable browser session, owned by exactly one company run.
/// The run must call `quit` on every exit path; sessions are never shared.
pub struct Droid {
    pub driver: WebDriver,
}

impl Droid {
    pub async fn new(settings: &WebDriverSettings) -> WebDriverResult<Self> {
        let mut caps = DesiredCapabilities::chrome();
        if settings.headless {
            caps.add_arg("--headless=new")?;
            caps.add_arg("--disable-gpu")?;
        }
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-dev-shm-usage")?;
        caps.add_arg("--window-size=1366,900")?;
        // Eager bounds worst-case latency on slow or broken sites: the DOM is
        // parsed but we do not wait for every straggling subresource.
        caps.set_page_load_strategy(PageLoadStrategy::Eager)?;

        let driver = WebDriver::new(&settings.server_url, caps).await?;

        Ok(Droid { driver })
    }

    /// Loads a url, giving up once the deadline elapses. Timeouts are
    /// reported to the caller, not retried here.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> WebDriverResult<Navigation> {
        self.driver.set_page_load_timeout(timeout).await?;

        match tokio::time::timeout(timeout + Duration::from_secs(2), self.driver.goto(url)).await {
            Err(_) => Ok(Navigation::TimedOut),
            Ok(Err(e)) if e.to_string().to_lowercase().contains("timeout") => {
                Ok(Navigation::TimedOut)
            }
            Ok(Err(e)) => Err(e),
            Ok(Ok(())) => Ok(Navigation::Loaded),
        }
    }

    /// Probes a small list of generic consent patterns and clicks the first
    /// visible match. Most sites show nothing; absence of a match is fine.
    pub async fn dismiss_consent_modal(&self, per_attempt: Duration) -> bool {
        let patterns = [
            By::XPath(
                "//button[contains(translate(., 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'accept')]",
            ),
            By::XPath(
                "//button[contains(translate(., 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'agree')]",
            ),
            By::XPath(
                "//button[contains(translate(., 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'got it')]",
            ),
            By::Css("#onetrust-accept-btn-handler"),
            By::Css("[id*='consent'] button"),
            By::Css("[class*='cookie'] button"),
        ];

        for pattern in patterns {
            let deadline = Instant::now() + per_attempt;
            loop {
                if let Ok(elements) = self.driver.find_all(pattern.clone()).await {
                    for element in elements {
                        if element.is_displayed().await.unwrap_or(false) {
                            match element.click().await {
                                Ok(()) => {
                                    log::info!("Dismissed consent modal via {:?}", pattern);
                                    return true;
                                }
                                Err(e) => {
                                    log::warn!("Consent candidate refused the click: {:?}", e)
                                }
                            }
                        }
                    }
                }
                if Instant::now() >= deadline {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }

        false
    }

    pub async fn current_url(&self) -> WebDriverResult<url::Url> {
        self.driver.current_url().await
    }

    /// Writes the evidence png and hands the bytes back for the live
    /// progress channel.
    pub async fn capture_screenshot(&self, path: &Path) -> WebDriverResult<Vec<u8>> {
        let png = self.driver.screenshot_as_png().await?;
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        std::fs::write(path, &png).map_err(WebDriverError::IoError)?;
        Ok(png)
    }

    pub async fn quit(self) -> WebDriverResult<()> {
        self.driver.quit().await
    }
}
