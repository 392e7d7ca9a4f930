use anyhow::Context;

use crate::domain::campaign::Campaign;
use crate::domain::company::{Company, CompanyStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentVerbosity {
    Minimal,
    Standard,
    Detailed,
}

impl CommentVerbosity {
    pub fn parse(value: &str) -> CommentVerbosity {
        match value.to_lowercase().as_str() {
            "minimal" => CommentVerbosity::Minimal,
            "detailed" => CommentVerbosity::Detailed,
            _ => CommentVerbosity::Standard,
        }
    }
}

/// Background color a spreadsheet renderer applies to the row.
pub fn status_color(status: CompanyStatus) -> &'static str {
    match status {
        CompanyStatus::Completed => "#d9ead3",
        CompanyStatus::Failed => "#f4cccc",
        CompanyStatus::Captcha => "#fff2cc",
        CompanyStatus::Processing => "#cfe2f3",
        CompanyStatus::Pending => "#ffffff",
    }
}

pub fn synthesize_comment(company: &Company, verbosity: CommentVerbosity) -> String {
    match verbosity {
        CommentVerbosity::Minimal => minimal_comment(company.status).to_string(),
        CommentVerbosity::Standard => standard_comment(company),
        CommentVerbosity::Detailed => {
            let mut comment = standard_comment(company);
            if let Some(seconds) = company.processing_time_seconds {
                comment.push_str(&format!(" Run took {:.1}s.", seconds));
            }
            if company.screenshot_url.is_some() {
                comment.push_str(" Screenshot captured.");
            }
            if company.status == CompanyStatus::Failed {
                comment.push_str(" Candidate for an automatic retry.");
            }
            comment
        }
    }
}

fn status_label(status: CompanyStatus) -> &'static str {
    match status {
        CompanyStatus::Pending => "pending",
        CompanyStatus::Processing => "processing",
        CompanyStatus::Completed => "completed",
        CompanyStatus::Failed => "failed",
        CompanyStatus::Captcha => "captcha",
    }
}

fn minimal_comment(status: CompanyStatus) -> &'static str {
    match status {
        CompanyStatus::Completed => "filled",
        CompanyStatus::Failed => "failed",
        CompanyStatus::Captcha => "captcha",
        CompanyStatus::Processing => "in progress",
        CompanyStatus::Pending => "queued",
    }
}

fn standard_comment(company: &Company) -> String {
    match company.status {
        CompanyStatus::Completed => "Contact form found and filled.".to_string(),
        CompanyStatus::Failed => format!(
            "Failed: {}",
            company
                .error_message
                .as_deref()
                .unwrap_or("unknown error")
        ),
        CompanyStatus::Captcha => {
            "Blocked by a CAPTCHA wall. Needs manual review.".to_string()
        }
        CompanyStatus::Processing => "Processing right now.".to_string(),
        CompanyStatus::Pending => "Not processed yet.".to_string(),
    }
}

/// Renders a campaign into spreadsheet rows. Pure read-side transform of
/// the company list; nothing here feeds back into the engine.
pub fn render_campaign_csv(
    campaign: &Campaign,
    verbosity: CommentVerbosity,
) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);

    writer.write_record([
        "company",
        "website",
        "contact_email",
        "contact_person",
        "phone",
        "status",
        "color",
        "processing_time_seconds",
        "comment",
    ])?;

    for company in &campaign.companies {
        let seconds = company
            .processing_time_seconds
            .map(|s| format!("{:.1}", s))
            .unwrap_or_default();
        let comment = synthesize_comment(company, verbosity);

        writer.write_record([
            company.company_name.as_deref().unwrap_or(""),
            company.website_url.as_str(),
            company.contact_email.as_deref().unwrap_or(""),
            company.contact_person.as_deref().unwrap_or(""),
            company.phone.as_deref().unwrap_or(""),
            status_label(company.status),
            status_color(company.status),
            seconds.as_str(),
            comment.as_str(),
        ])?;
    }

    let bytes = writer.into_inner().context("Flushing csv writer")?;
    String::from_utf8(bytes).context("Exported csv was not valid utf-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sender_profile::SenderProfile;

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

    fn failed_company() -> Company {
        let mut company = Company::new("https://example.com".to_string());
        company.status = CompanyStatus::Failed;
        company.error_message = Some("navigation timed out".to_string());
        company.processing_time_seconds = Some(21.5);
        company
    }

    #[test]
    fn three_verbosity_presets() {
        let company = failed_company();

        assert_eq!(
            synthesize_comment(&company, CommentVerbosity::Minimal),
            "failed"
        );
        assert_eq!(
            synthesize_comment(&company, CommentVerbosity::Standard),
            "Failed: navigation timed out"
        );
        let detailed = synthesize_comment(&company, CommentVerbosity::Detailed);
        assert!(detailed.contains("Failed: navigation timed out"));
        assert!(detailed.contains("21.5s"));
        assert!(detailed.contains("retry"));
    }

    #[test]
    fn colors_follow_status() {
        assert_eq!(status_color(CompanyStatus::Completed), "#d9ead3");
        assert_eq!(status_color(CompanyStatus::Failed), "#f4cccc");
        assert_eq!(status_color(CompanyStatus::Captcha), "#fff2cc");
    }

    #[test]
    fn verbosity_parse_defaults_to_standard() {
        assert_eq!(CommentVerbosity::parse("minimal"), CommentVerbosity::Minimal);
        assert_eq!(
            CommentVerbosity::parse("DETAILED"),
            CommentVerbosity::Detailed
        );
        assert_eq!(CommentVerbosity::parse("bogus"), CommentVerbosity::Standard);
    }

    #[test]
    fn csv_has_one_row_per_company() {
        let campaign = Campaign::new(
            profile(),
            vec![
                failed_company(),
                Company::new("https://other.example".to_string()),
            ],
        );
        let rendered = render_campaign_csv(&campaign, CommentVerbosity::Standard).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("company,website"));
        assert!(rendered.contains("https://example.com"));
        assert!(rendered.contains("#f4cccc"));
        assert!(rendered.contains("Not processed yet."));
    }
}
