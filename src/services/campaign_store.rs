use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::campaign::Campaign;
use crate::domain::company::{Company, CompanyStatus};
use crate::domain::sender_profile::SenderProfile;

struct CampaignSlot {
    campaign: Campaign,
    cancel: CancellationToken,
}

/// The single source of truth for campaign state. The only mutation path is
/// a company transition; aggregate counters are recomputed inside the same
/// lock, so readers never observe counters out of step with the statuses.
#[derive(Clone)]
pub struct CampaignStore {
    campaigns: Arc<Mutex<HashMap<Uuid, CampaignSlot>>>,
}

impl CampaignStore {
    pub fn new() -> Self {
        CampaignStore {
            campaigns: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn create(&self, sender: SenderProfile, companies: Vec<Company>) -> Campaign {
        let campaign = Campaign::new(sender, companies);
        let mut campaigns = self.campaigns.lock().unwrap();
        campaigns.insert(
            campaign.id,
            CampaignSlot {
                campaign: campaign.clone(),
                cancel: CancellationToken::new(),
            },
        );
        campaign
    }

    pub fn get(&self, campaign_id: Uuid) -> Option<Campaign> {
        let campaigns = self.campaigns.lock().unwrap();
        campaigns.get(&campaign_id).map(|slot| slot.campaign.clone())
    }

    pub fn companies(&self, campaign_id: Uuid) -> Option<Vec<Company>> {
        let campaigns = self.campaigns.lock().unwrap();
        campaigns
            .get(&campaign_id)
            .map(|slot| slot.campaign.companies.clone())
    }

    pub fn sender(&self, campaign_id: Uuid) -> Option<SenderProfile> {
        let campaigns = self.campaigns.lock().unwrap();
        campaigns
            .get(&campaign_id)
            .map(|slot| slot.campaign.sender.clone())
    }

    /// Companies still waiting to run, plus the token a batch should watch.
    pub fn pending_targets(&self, campaign_id: Uuid) -> Option<(Vec<Company>, CancellationToken)> {
        let campaigns = self.campaigns.lock().unwrap();
        campaigns.get(&campaign_id).map(|slot| {
            let pending = slot
                .campaign
                .companies
                .iter()
                .filter(|c| c.status == CompanyStatus::Pending)
                .cloned()
                .collect();
            (pending, slot.cancel.clone())
        })
    }

    /// Prepares one company for an ad-hoc run, re-queuing it first when it
    /// already settled.
    pub fn single_target(
        &self,
        campaign_id: Uuid,
        company_id: Uuid,
    ) -> Option<(Company, CancellationToken)> {
        let mut campaigns = self.campaigns.lock().unwrap();
        let slot = campaigns.get_mut(&campaign_id)?;
        let cancel = slot.cancel.clone();
        let company = slot.campaign.company_mut(company_id)?;

        if company.status.is_terminal() {
            company.requeue();
        }
        if company.status != CompanyStatus::Pending {
            return None;
        }

        let company = company.clone();
        slot.campaign.recount();
        Some((company, cancel))
    }

    pub fn requeue(&self, campaign_id: Uuid, company_id: Uuid) -> bool {
        let mut campaigns = self.campaigns.lock().unwrap();
        let Some(slot) = campaigns.get_mut(&campaign_id) else {
            return false;
        };
        let Some(company) = slot.campaign.company_mut(company_id) else {
            return false;
        };
        if !company.status.is_terminal() {
            return false;
        }
        company.requeue();
        slot.campaign.recount();
        true
    }

    /// Pending → Processing on admission to the pool.
    pub fn mark_processing(&self, campaign_id: Uuid, company_id: Uuid) -> bool {
        self.transition(campaign_id, company_id, |company| {
            if company.status != CompanyStatus::Pending {
                return false;
            }
            company.status = CompanyStatus::Processing;
            true
        })
    }

    /// Cancellation path: a torn-down run goes back in line, it did not fail.
    pub fn revert_to_pending(&self, campaign_id: Uuid, company_id: Uuid) -> bool {
        self.transition(campaign_id, company_id, |company| {
            if company.status != CompanyStatus::Processing {
                return false;
            }
            company.status = CompanyStatus::Pending;
            true
        })
    }

    /// Processing → exactly one terminal status. A company already settled
    /// stays settled; late or duplicate outcomes are dropped.
    #[allow(clippy::too_many_arguments)]
    pub fn record_outcome(
        &self,
        campaign_id: Uuid,
        company_id: Uuid,
        status: CompanyStatus,
        error_message: Option<String>,
        screenshot_url: Option<String>,
        processing_time_seconds: f64,
    ) -> bool {
        if !status.is_terminal() {
            log::error!("Refusing to record non-terminal outcome {:?}", status);
            return false;
        }
        self.transition(campaign_id, company_id, move |company| {
            if company.status != CompanyStatus::Processing {
                return false;
            }
            company.status = status;
            company.error_message = error_message.clone();
            company.screenshot_url = screenshot_url.clone();
            company.processing_time_seconds = Some(processing_time_seconds);
            true
        })
    }

    /// Cancels the in-flight batch and re-arms the token so a later start
    /// gets a fresh one.
    pub fn stop(&self, campaign_id: Uuid) -> bool {
        let mut campaigns = self.campaigns.lock().unwrap();
        match campaigns.get_mut(&campaign_id) {
            Some(slot) => {
                slot.cancel.cancel();
                slot.cancel = CancellationToken::new();
                true
            }
            None => false,
        }
    }

    fn transition<F>(&self, campaign_id: Uuid, company_id: Uuid, apply: F) -> bool
    where
        F: Fn(&mut Company) -> bool,
    {
        let mut campaigns = self.campaigns.lock().unwrap();
        let Some(slot) = campaigns.get_mut(&campaign_id) else {
            log::error!("Transition against unknown campaign {}", campaign_id);
            return false;
        };
        let Some(company) = slot.campaign.company_mut(company_id) else {
            log::error!("Transition against unknown company {}", company_id);
            return false;
        };
        let applied = apply(company);
        if applied {
            slot.campaign.recount();
        }
        applied
    }
}

impl Default for CampaignStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> SenderProfile {
        SenderProfile {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@acme.io".to_string(),
            phone: "+1 555 0100".to_string(),
            subject: "Partnership".to_string(),
            message: "Hello there".to_string(),
            company: None,
        }
    }

    fn store_with(n: usize) -> (CampaignStore, Campaign) {
        let store = CampaignStore::new();
        let companies = (0..n)
            .map(|i| Company::new(format!("https://site-{}.com", i)))
            .collect();
        let campaign = store.create(profile(), companies);
        (store, campaign)
    }

    #[test]
    fn run_settles_in_exactly_one_terminal_status() {
        let (store, campaign) = store_with(1);
        let company_id = campaign.companies[0].id;

        assert!(store.mark_processing(campaign.id, company_id));
        assert!(store.record_outcome(
            campaign.id,
            company_id,
            CompanyStatus::Completed,
            None,
            None,
            4.2
        ));
        // A late duplicate outcome is dropped.
        assert!(!store.record_outcome(
            campaign.id,
            company_id,
            CompanyStatus::Failed,
            Some("late".to_string()),
            None,
            9.0
        ));

        let current = store.get(campaign.id).unwrap();
        assert_eq!(current.companies[0].status, CompanyStatus::Completed);
        assert_eq!(current.counters.success_count, 1);
        assert_eq!(current.counters.processed_count, 1);
    }

    #[test]
    fn counters_track_mixed_outcomes() {
        let (store, campaign) = store_with(3);
        let ids: Vec<Uuid> = campaign.companies.iter().map(|c| c.id).collect();

        for id in &ids {
            store.mark_processing(campaign.id, *id);
        }
        store.record_outcome(campaign.id, ids[0], CompanyStatus::Completed, None, None, 1.0);
        store.record_outcome(
            campaign.id,
            ids[1],
            CompanyStatus::Failed,
            Some("navigation timed out".to_string()),
            None,
            2.0,
        );
        store.record_outcome(campaign.id, ids[2], CompanyStatus::Captcha, None, None, 3.0);

        let current = store.get(campaign.id).unwrap();
        assert_eq!(current.counters.processed_count, 3);
        assert_eq!(
            current.counters.processed_count,
            current.counters.success_count
                + current.counters.failed_count
                + current.counters.captcha_count
        );
        assert!(current.is_settled());
    }

    #[test]
    fn cancellation_reverts_processing_to_pending() {
        let (store, campaign) = store_with(2);
        let ids: Vec<Uuid> = campaign.companies.iter().map(|c| c.id).collect();

        store.mark_processing(campaign.id, ids[0]);
        store.record_outcome(campaign.id, ids[0], CompanyStatus::Completed, None, None, 1.0);
        store.mark_processing(campaign.id, ids[1]);

        // The batch is stopped mid-flight; the in-flight company goes back
        // in line instead of counting as failed.
        assert!(store.stop(campaign.id));
        assert!(store.revert_to_pending(campaign.id, ids[1]));

        let current = store.get(campaign.id).unwrap();
        assert_eq!(current.companies[0].status, CompanyStatus::Completed);
        assert_eq!(current.companies[1].status, CompanyStatus::Pending);
        assert_eq!(current.counters.failed_count, 0);
        assert_eq!(current.counters.processed_count, 1);
    }

    #[test]
    fn stop_rearms_the_cancellation_token() {
        let (store, campaign) = store_with(1);
        let (_, first_token) = store.pending_targets(campaign.id).unwrap();

        store.stop(campaign.id);
        assert!(first_token.is_cancelled());

        let (_, second_token) = store.pending_targets(campaign.id).unwrap();
        assert!(!second_token.is_cancelled());
    }

    #[test]
    fn single_target_requeues_a_settled_company() {
        let (store, campaign) = store_with(1);
        let company_id = campaign.companies[0].id;

        store.mark_processing(campaign.id, company_id);
        store.record_outcome(
            campaign.id,
            company_id,
            CompanyStatus::Failed,
            Some("no form anywhere".to_string()),
            None,
            7.0,
        );

        let (target, _) = store.single_target(campaign.id, company_id).unwrap();
        assert_eq!(target.status, CompanyStatus::Pending);
        assert!(target.error_message.is_none());

        // But a company currently processing is not handed out twice.
        store.mark_processing(campaign.id, company_id);
        assert!(store.single_target(campaign.id, company_id).is_none());
    }

    #[test]
    fn transitions_against_unknown_ids_are_rejected() {
        let (store, campaign) = store_with(1);
        assert!(!store.mark_processing(Uuid::new_v4(), campaign.companies[0].id));
        assert!(!store.mark_processing(campaign.id, Uuid::new_v4()));
    }
}
