use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::company::{Company, CompanyStatus};
use crate::domain::sender_profile::SenderProfile;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CampaignCounters {
    pub total_companies: usize,
    pub processed_count: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub captcha_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Campaign {
    pub id: Uuid,
    pub sender: SenderProfile,
    pub companies: Vec<Company>,
    pub counters: CampaignCounters,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(sender: SenderProfile, companies: Vec<Company>) -> Self {
        let mut campaign = Campaign {
            id: Uuid::new_v4(),
            sender,
            companies,
            counters: CampaignCounters::default(),
            created_at: Utc::now(),
        };
        campaign.recount();
        campaign
    }

    pub fn company(&self, company_id: Uuid) -> Option<&Company> {
        self.companies.iter().find(|c| c.id == company_id)
    }

    pub fn company_mut(&mut self, company_id: Uuid) -> Option<&mut Company> {
        self.companies.iter_mut().find(|c| c.id == company_id)
    }

    /// Counters are never mutated on their own; they are recomputed as a
    /// reduction over the company list after every transition.
    pub fn recount(&mut self) {
        let mut counters = CampaignCounters {
            total_companies: self.companies.len(),
            ..Default::default()
        };
        for company in &self.companies {
            match company.status {
                CompanyStatus::Completed => counters.success_count += 1,
                CompanyStatus::Failed => counters.failed_count += 1,
                CompanyStatus::Captcha => counters.captcha_count += 1,
                CompanyStatus::Pending | CompanyStatus::Processing => {}
            }
        }
        counters.processed_count =
            counters.success_count + counters.failed_count + counters.captcha_count;
        self.counters = counters;
    }

    pub fn is_settled(&self) -> bool {
        self.counters.processed_count == self.counters.total_companies
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

    fn campaign_with(statuses: &[CompanyStatus]) -> Campaign {
        let companies = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut company = Company::new(format!("https://site-{}.com", i));
                company.status = *status;
                company
            })
            .collect();
        Campaign::new(profile(), companies)
    }

    #[test]
    fn counters_reduce_over_statuses() {
        let campaign = campaign_with(&[
            CompanyStatus::Completed,
            CompanyStatus::Failed,
            CompanyStatus::Captcha,
            CompanyStatus::Processing,
            CompanyStatus::Pending,
        ]);

        assert_eq!(campaign.counters.total_companies, 5);
        assert_eq!(campaign.counters.success_count, 1);
        assert_eq!(campaign.counters.failed_count, 1);
        assert_eq!(campaign.counters.captcha_count, 1);
        assert_eq!(
            campaign.counters.processed_count,
            campaign.counters.success_count
                + campaign.counters.failed_count
                + campaign.counters.captcha_count
        );
        assert!(campaign.counters.processed_count <= campaign.counters.total_companies);
        assert!(!campaign.is_settled());
    }

    #[test]
    fn settles_once_every_company_is_terminal() {
        let mut campaign = campaign_with(&[CompanyStatus::Processing, CompanyStatus::Processing]);
        assert!(!campaign.is_settled());

        for company in campaign.companies.iter_mut() {
            company.status = CompanyStatus::Failed;
        }
        campaign.recount();

        assert!(campaign.is_settled());
        assert_eq!(campaign.counters.failed_count, 2);
    }

    #[test]
    fn recount_after_requeue_shrinks_processed() {
        let mut campaign = campaign_with(&[CompanyStatus::Failed]);
        assert_eq!(campaign.counters.processed_count, 1);

        let id = campaign.companies[0].id;
        campaign.company_mut(id).unwrap().requeue();
        campaign.recount();

        assert_eq!(campaign.counters.processed_count, 0);
    }
}
