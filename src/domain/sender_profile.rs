use serde::{Deserialize, Serialize};

/// Supplied once per campaign and used verbatim on every company's form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub message: String,
    pub company: Option<String>,
}

impl SenderProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
