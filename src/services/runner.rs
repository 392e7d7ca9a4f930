use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::Rng;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::configuration::Settings;
use crate::domain::company::{Company, CompanyStatus};
use crate::domain::progress::ProgressEvent;
use crate::domain::sender_profile::SenderProfile;
use crate::services::campaign_store::CampaignStore;
use crate::services::captcha::detect_captcha;
use crate::services::contact_locator::find_contact_page;
use crate::services::droid::{Droid, Navigation};
use crate::services::form_filler::{fill_discovered_form, FillReport};
use crate::services::form_locator::locate_contact_form;
use crate::services::progress::{ProgressHub, RunReporter};

pub struct CampaignJobSender {
    pub sender: UnboundedSender<CampaignJob>,
}

#[derive(Debug, Clone, Copy)]
pub enum RunMode {
    RapidAll,
    Single(Uuid),
}

#[derive(Debug, Clone, Copy)]
pub struct CampaignJob {
    pub campaign_id: Uuid,
    pub mode: RunMode,
}

#[derive(Debug)]
pub enum RunFailure {
    NavigationTimeout(String),
    RunTimeout,
    NoFormFound,
    FormUnusable,
    Unexpected(String),
}

pub enum RunOutcome {
    Completed { report: FillReport },
    Captcha,
    Failed(RunFailure),
}

/// Maps a settled run onto the company's terminal status. Every outcome
/// lands on exactly one of completed/failed/captcha.
pub fn outcome_status(outcome: &RunOutcome) -> (CompanyStatus, Option<String>) {
    match outcome {
        RunOutcome::Completed { .. } => (CompanyStatus::Completed, None),
        RunOutcome::Captcha => (
            CompanyStatus::Captcha,
            Some("CAPTCHA provider detected on the page".to_string()),
        ),
        RunOutcome::Failed(failure) => (CompanyStatus::Failed, Some(failure_message(failure))),
    }
}

fn failure_message(failure: &RunFailure) -> String {
    match failure {
        RunFailure::NavigationTimeout(url) => format!("Navigation to {} timed out", url),
        RunFailure::RunTimeout => "Run exceeded its overall deadline".to_string(),
        RunFailure::NoFormFound => {
            "No contact form found in the document or its frames".to_string()
        }
        RunFailure::FormUnusable => "Form had no usable message or email field".to_string(),
        RunFailure::Unexpected(cause) => format!("Unexpected failure: {}", cause),
    }
}

/// Long-lived consumer of campaign jobs, spawned once from main. Each job
/// fans out into bounded parallel company runs; one broken batch never
/// takes the handler down.
pub async fn campaign_runner_handler(
    mut job_receiver: UnboundedReceiver<CampaignJob>,
    store: CampaignStore,
    hub: ProgressHub,
    settings: Settings,
) {
    log::info!("Started campaign runner");

    while let Some(job) = job_receiver.recv().await {
        tokio::spawn(run_campaign_job(
            job,
            store.clone(),
            hub.clone(),
            settings.clone(),
        ));
    }
}

async fn run_campaign_job(
    job: CampaignJob,
    store: CampaignStore,
    hub: ProgressHub,
    settings: Settings,
) {
    let Some(profile) = store.sender(job.campaign_id) else {
        log::error!("Job against unknown campaign {}", job.campaign_id);
        return;
    };

    let (targets, cancel) = match job.mode {
        RunMode::RapidAll => match store.pending_targets(job.campaign_id) {
            Some(found) => found,
            None => return,
        },
        RunMode::Single(company_id) => {
            match store.single_target(job.campaign_id, company_id) {
                Some((company, cancel)) => (vec![company], cancel),
                None => {
                    log::error!("Company {} is not runnable right now", company_id);
                    return;
                }
            }
        }
    };

    if targets.is_empty() {
        hub.emit(
            job.campaign_id,
            None,
            ProgressEvent::Status {
                message: "Nothing pending to process".to_string(),
            },
        );
        return;
    }

    hub.emit(
        job.campaign_id,
        None,
        ProgressEvent::Status {
            message: format!("Starting batch of {} companies", targets.len()),
        },
    );

    let semaphore = Arc::new(Semaphore::new(settings.engine.pool_size.max(1)));
    let mut handles = vec![];

    for company in targets {
        // Admission gate: at most pool_size companies are processing at any
        // instant; the rest wait here for a slot.
        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => permit.unwrap(),
        };

        // Small jitter keeps a fresh batch from slamming the webdriver with
        // simultaneous session requests.
        let jitter = rand::thread_rng().gen_range(50..250);
        tokio::time::sleep(Duration::from_millis(jitter)).await;

        if !store.mark_processing(job.campaign_id, company.id) {
            continue;
        }

        let reporter = RunReporter::new(hub.clone(), job.campaign_id, company.id);
        let store = store.clone();
        let profile = profile.clone();
        let settings = settings.clone();
        let cancel = cancel.clone();
        let campaign_id = job.campaign_id;

        handles.push(tokio::spawn(async move {
            let _permit = permit;
            execute_run(campaign_id, company, profile, settings, store, reporter, cancel).await;
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            log::error!("Run task panicked: {:?}", e);
        }
    }

    if let Some(campaign) = store.get(job.campaign_id) {
        hub.emit(
            job.campaign_id,
            None,
            ProgressEvent::Status {
                message: format!(
                    "Batch finished: {}/{} processed",
                    campaign.counters.processed_count, campaign.counters.total_companies
                ),
            },
        );
    }
}

/// One company, one browser session, one terminal status. Everything the
/// pipeline throws is contained here; the pool and the sibling runs never
/// see it.
#[allow(clippy::too_many_arguments)]
async fn execute_run(
    campaign_id: Uuid,
    company: Company,
    profile: SenderProfile,
    settings: Settings,
    store: CampaignStore,
    reporter: RunReporter,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    reporter.status(format!("Visiting {}", company.website_url));

    let droid = match Droid::new(&settings.webdriver).await {
        Ok(droid) => droid,
        Err(e) => {
            let message = format!("Could not open a browser session: {}", e);
            reporter.error(message.clone());
            store.record_outcome(
                campaign_id,
                company.id,
                CompanyStatus::Failed,
                Some(message),
                None,
                started.elapsed().as_secs_f64(),
            );
            return;
        }
    };

    let run_timeout = Duration::from_secs(settings.engine.run_timeout_secs);
    let outcome = tokio::select! {
        _ = cancel.cancelled() => None,
        result = tokio::time::timeout(
            run_timeout,
            drive_pipeline(&droid, &company, &profile, &settings, &reporter),
        ) => Some(match result {
            Ok(outcome) => outcome,
            Err(_) => RunOutcome::Failed(RunFailure::RunTimeout),
        }),
    };

    let screenshot_url = match &outcome {
        Some(_) => capture_evidence(&droid, &company, &settings, &reporter).await,
        None => None,
    };

    // Teardown happens on every exit path, cancelled runs included.
    if let Err(e) = droid.quit().await {
        log::error!("Session teardown failed: {:?}", e);
    }

    let elapsed = started.elapsed().as_secs_f64();
    match outcome {
        None => {
            store.revert_to_pending(campaign_id, company.id);
            reporter.status("Cancelled; company re-queued");
        }
        Some(outcome) => {
            let (status, error_message) = outcome_status(&outcome);
            if let RunOutcome::Completed { report } = &outcome {
                reporter.logs_batch(report.log_entries());
            }
            if let Some(message) = &error_message {
                reporter.error(message.clone());
            }
            store.record_outcome(
                campaign_id,
                company.id,
                status,
                error_message,
                screenshot_url,
                elapsed,
            );
            reporter.status(format!("Run settled in {:.1}s", elapsed));
        }
    }
}

async fn drive_pipeline(
    droid: &Droid,
    company: &Company,
    profile: &SenderProfile,
    settings: &Settings,
    reporter: &RunReporter,
) -> RunOutcome {
    let nav_timeout = Duration::from_secs(settings.engine.navigation_timeout_secs);
    let probe_timeout = Duration::from_secs(settings.engine.probe_timeout_secs);
    let consent_wait = Duration::from_millis(settings.engine.consent_wait_ms);

    match droid.navigate(&company.website_url, nav_timeout).await {
        Ok(Navigation::Loaded) => reporter.log("navigate", "ok", company.website_url.clone()),
        Ok(Navigation::TimedOut) => {
            return RunOutcome::Failed(RunFailure::NavigationTimeout(company.website_url.clone()))
        }
        Err(e) => return RunOutcome::Failed(RunFailure::Unexpected(e.to_string())),
    }

    if droid.dismiss_consent_modal(consent_wait).await {
        reporter.log("consent", "ok", "dismissed a consent modal");
    }

    if detect_captcha(&droid.driver).await {
        reporter.log("captcha", "blocked", "captcha provider present on homepage");
        return RunOutcome::Captcha;
    }

    match find_contact_page(droid, &settings.engine.contact_keywords, probe_timeout).await {
        Some(contact_url) => {
            reporter.log("contact_page", "ok", contact_url.clone());
            match droid.navigate(&contact_url, nav_timeout).await {
                Ok(Navigation::Loaded) => {
                    droid.dismiss_consent_modal(consent_wait).await;
                    if detect_captcha(&droid.driver).await {
                        reporter.log(
                            "captcha",
                            "blocked",
                            "captcha provider present on contact page",
                        );
                        return RunOutcome::Captcha;
                    }
                }
                Ok(Navigation::TimedOut) | Err(_) => {
                    // The homepage may still carry a usable form.
                    reporter.log(
                        "contact_page",
                        "error",
                        "contact page did not load; falling back to homepage",
                    );
                    match droid.navigate(&company.website_url, nav_timeout).await {
                        Ok(Navigation::Loaded) => {}
                        _ => {
                            return RunOutcome::Failed(RunFailure::NavigationTimeout(contact_url))
                        }
                    }
                }
            }
        }
        None => reporter.log(
            "contact_page",
            "miss",
            "no contact page found; using homepage",
        ),
    }

    let form = match locate_contact_form(&droid.driver).await {
        Ok(Some(form)) => form,
        Ok(None) => return RunOutcome::Failed(RunFailure::NoFormFound),
        Err(e) => return RunOutcome::Failed(RunFailure::Unexpected(e.to_string())),
    };
    reporter.log(
        "form",
        "ok",
        format!(
            "form #{} (score {}) with {} fields",
            form.form_index,
            form.score,
            form.fields.len()
        ),
    );

    match fill_discovered_form(&droid.driver, &form, profile).await {
        Ok(report) if report.essentials_filled() => RunOutcome::Completed { report },
        Ok(_) => RunOutcome::Failed(RunFailure::FormUnusable),
        Err(e) => RunOutcome::Failed(RunFailure::Unexpected(e.to_string())),
    }
}

async fn capture_evidence(
    droid: &Droid,
    company: &Company,
    settings: &Settings,
    reporter: &RunReporter,
) -> Option<String> {
    let path = PathBuf::from(&settings.application.screenshot_dir)
        .join(format!("{}.png", company.id));

    match droid.capture_screenshot(&path).await {
        Ok(png) => {
            let url = format!("/screenshots/{}.png", company.id);
            let current_url = droid
                .current_url()
                .await
                .map(|u| u.to_string())
                .unwrap_or_default();
            reporter.screenshot(url.clone(), STANDARD.encode(&png), current_url, vec![]);
            Some(url)
        }
        Err(e) => {
            log::warn!("Screenshot capture failed: {:?}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_outcome_maps_to_a_terminal_status() {
        let outcomes = [
            RunOutcome::Completed {
                report: FillReport::default(),
            },
            RunOutcome::Captcha,
            RunOutcome::Failed(RunFailure::NavigationTimeout(
                "https://example.com".to_string(),
            )),
            RunOutcome::Failed(RunFailure::RunTimeout),
            RunOutcome::Failed(RunFailure::NoFormFound),
            RunOutcome::Failed(RunFailure::FormUnusable),
            RunOutcome::Failed(RunFailure::Unexpected("boom".to_string())),
        ];

        for outcome in &outcomes {
            let (status, _) = outcome_status(outcome);
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn failure_and_captcha_carry_error_messages() {
        let (status, message) = outcome_status(&RunOutcome::Failed(RunFailure::NoFormFound));
        assert_eq!(status, CompanyStatus::Failed);
        assert!(message.unwrap().contains("No contact form"));

        let (status, message) = outcome_status(&RunOutcome::Captcha);
        assert_eq!(status, CompanyStatus::Captcha);
        assert!(message.unwrap().to_lowercase().contains("captcha"));

        let (_, message) = outcome_status(&RunOutcome::Completed {
            report: FillReport::default(),
        });
        assert!(message.is_none());
    }
}
