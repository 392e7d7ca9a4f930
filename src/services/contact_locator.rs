use std::time::Duration;

use fake_user_agent::get_rua;
use scraper::{Html, Selector};
use strsim::jaro_winkler;
use thirtyfour::By;
use url::Url;

use crate::services::droid::Droid;

/// Conventional paths probed when no contact link is discoverable. Each
/// probe uses the short fallback timeout, not the full navigation one.
const CONTACT_PATHS: &[&str] = &["/contact", "/contact-us", "/get-in-touch"];

/// Anchors beyond this are noise on pathological pages.
const MAX_ANCHORS: usize = 250;

#[derive(Debug, Clone, PartialEq)]
pub struct LinkCandidate {
    pub text: String,
    pub href: String,
}

enum Strategy {
    FooterLinks,
    DocumentLinks,
    ConventionalPaths,
}

const STRATEGIES: [Strategy; 3] = [
    Strategy::FooterLinks,
    Strategy::DocumentLinks,
    Strategy::ConventionalPaths,
];

/// Finds the best candidate contact-page url for the currently loaded
/// homepage, or None when every strategy misses. A miss is not an error:
/// some sites embed the contact form on the homepage itself.
pub async fn find_contact_page(
    droid: &Droid,
    keywords: &[String],
    probe_timeout: Duration,
) -> Option<String> {
    let current_url = match droid.current_url().await {
        Ok(url) => url,
        Err(e) => {
            log::error!("Could not read current url: {:?}", e);
            return None;
        }
    };

    for strategy in STRATEGIES {
        let hit = match strategy {
            Strategy::FooterLinks => {
                let links = collect_links(
                    droid,
                    By::Css("footer a, [role='contentinfo'] a, [class*='footer'] a, [id*='footer'] a"),
                )
                .await;
                pick_contact_candidate(&links, keywords, &current_url)
            }
            Strategy::DocumentLinks => {
                let links = collect_links(droid, By::Tag("a")).await;
                pick_contact_candidate(&links, keywords, &current_url)
            }
            Strategy::ConventionalPaths => {
                conventional_path_probe(&current_url, probe_timeout).await
            }
        };

        if let Some(url) = hit {
            log::info!("Contact page candidate: {}", url);
            return Some(url);
        }
    }

    None
}

async fn collect_links(droid: &Droid, by: By) -> Vec<LinkCandidate> {
    let mut links = vec![];

    let elements = match droid.driver.find_all(by).await {
        Ok(elements) => elements,
        Err(e) => {
            log::warn!("Anchor scan failed: {:?}", e);
            return links;
        }
    };

    for element in elements.into_iter().take(MAX_ANCHORS) {
        let href = match element.attr("href").await {
            Ok(Some(href)) => href,
            _ => continue,
        };
        let text = element.text().await.unwrap_or_default();
        links.push(LinkCandidate { text, href });
    }

    links
}

/// Picks the strongest contact link out of a scanned scope. Candidates are
/// resolved against the page the links were found on, so redirected
/// homepages resolve relative hrefs correctly. `mailto:` and `tel:` never
/// qualify, and the returned url is always absolute.
pub fn pick_contact_candidate(
    links: &[LinkCandidate],
    keywords: &[String],
    current_url: &Url,
) -> Option<String> {
    let mut best: Option<(f64, String)> = None;

    for link in links {
        let href = link.href.trim();
        if href.is_empty() || href == "#" {
            continue;
        }

        let text = link.text.trim().to_lowercase();
        let href_lower = href.to_lowercase();
        let matched = keywords.iter().any(|kw| {
            let kw = kw.to_lowercase();
            text.contains(&kw) || href_lower.contains(&kw.replace(' ', "-"))
        });
        if !matched {
            continue;
        }

        let Ok(resolved) = current_url.join(href) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }

        let closeness = keywords
            .iter()
            .map(|kw| jaro_winkler(&text, &kw.to_lowercase()))
            .fold(0.0_f64, f64::max);

        match &best {
            Some((top, _)) if *top >= closeness => {}
            _ => best = Some((closeness, resolved.to_string())),
        }
    }

    best.map(|(_, url)| url)
}

/// Issues lightweight requests against conventional contact paths on the
/// site's origin, accepting the first non-error response that actually
/// carries a form.
async fn conventional_path_probe(current_url: &Url, timeout: Duration) -> Option<String> {
    let origin = current_url.join("/").ok()?;

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(get_rua())
        .build()
        .ok()?;

    for path in CONTACT_PATHS {
        let candidate = match origin.join(path) {
            Ok(url) => url,
            Err(_) => continue,
        };

        match client.get(candidate.clone()).send().await {
            Ok(res) if res.status().is_success() => {
                let final_url = res.url().to_string();
                let Ok(body) = res.text().await else { continue };
                if page_carries_form(&body) {
                    return Some(final_url);
                }
            }
            Ok(res) => {
                log::info!("Probe {} answered {}", candidate, res.status());
            }
            Err(e) => {
                log::info!("Probe {} failed: {:?}", candidate, e);
            }
        }
    }

    None
}

fn page_carries_form(body: &str) -> bool {
    let document = Html::parse_document(body);
    let form_selector = Selector::parse("form").unwrap();
    document.select(&form_selector).next().is_some()
}
