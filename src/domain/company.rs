use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Captcha,
}

impl CompanyStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CompanyStatus::Completed | CompanyStatus::Failed | CompanyStatus::Captcha
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub website_url: String,
    pub company_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub status: CompanyStatus,
    pub error_message: Option<String>,
    pub screenshot_url: Option<String>,
    pub processing_time_seconds: Option<f64>,
}

impl Company {
    pub fn new(website_url: String) -> Self {
        Company {
            id: Uuid::new_v4(),
            website_url,
            company_name: None,
            contact_email: None,
            contact_person: None,
            phone: None,
            status: CompanyStatus::Pending,
            error_message: None,
            screenshot_url: None,
            processing_time_seconds: None,
        }
    }

    /// Puts a terminal company back in line. Run artifacts from the previous
    /// attempt are cleared so the next run reports from a clean slate.
    pub fn requeue(&mut self) {
        self.status = CompanyStatus::Pending;
        self.error_message = None;
        self.screenshot_url = None;
        self.processing_time_seconds = None;
    }
}
