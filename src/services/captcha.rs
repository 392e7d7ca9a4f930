use thirtyfour::WebDriver;

/// Markup fingerprints of the common CAPTCHA providers. A hit means the site
/// put an obstruction in front of the form, which the operator reviews by
/// hand; it is not a pipeline defect.
const CAPTCHA_MARKERS: &[&str] = &[
    "g-recaptcha",
    "grecaptcha",
    "recaptcha/api.js",
    "google.com/recaptcha",
    "hcaptcha.com",
    "h-captcha",
    "cf-turnstile",
    "challenges.cloudflare.com",
];

pub fn source_has_captcha_wall(source: &str) -> bool {
    let source = source.to_lowercase();
    CAPTCHA_MARKERS.iter().any(|marker| source.contains(marker))
}

pub async fn detect_captcha(driver: &WebDriver) -> bool {
    match driver.source().await {
        Ok(source) => source_has_captcha_wall(&source),
        Err(e) => {
            log::error!("Could not read page source for captcha check: {:?}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recaptcha_markup_detected() {
        let source = r#"<html><body>
            <div class="g-recaptcha" data-sitekey="6LeIxAcTAAAAAJcZ"></div>
        </body></html>"#;
        assert!(source_has_captcha_wall(source));
    }

    #[test]
    fn hcaptcha_frame_detected() {
        let source = r#"<iframe src="https://newassets.hcaptcha.com/captcha/v1/frame"></iframe>"#;
        assert!(source_has_captcha_wall(source));
    }

    #[test]
    fn turnstile_detected() {
        let source = r#"<div class="cf-turnstile" data-sitekey="0x4AAA"></div>"#;
        assert!(source_has_captcha_wall(source));
    }

    #[test]
    fn plain_contact_page_passes() {
        let source = r#"<html><body>
            <form action="/contact"><input type="email" name="email"/>
            <textarea name="message"></textarea></form>
        </body></html>"#;
        assert!(!source_has_captcha_wall(source));
    }
}
