use thirtyfour::error::WebDriverResult;
use thirtyfour::{By, WebDriver, WebElement};

use crate::domain::form::{
    classify_fields, pick_dropdown_option, role_value, DiscoveredForm, FieldRole,
    FormFieldDescriptor, FormScope,
};
use crate::domain::progress::LogEntry;
use crate::domain::sender_profile::SenderProfile;

#[derive(Debug, Default, Clone)]
pub struct FillReport {
    pub filled: Vec<String>,
    pub skipped: usize,
    pub email_filled: bool,
    pub message_filled: bool,
}

impl FillReport {
    /// The completed/failed decision hinges on the outreach essentials: the
    /// message body or an email-equivalent field must have landed.
    pub fn essentials_filled(&self) -> bool {
        self.email_filled || self.message_filled
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        let mut entries: Vec<LogEntry> = self
            .filled
            .iter()
            .map(|what| LogEntry::new("fill_field", "ok", what.clone()))
            .collect();
        if self.skipped > 0 {
            entries.push(LogEntry::new(
                "fill_field",
                "skipped",
                format!("{} fields left empty for manual review", self.skipped),
            ));
        }
        entries
    }
}

/// Writes the sender profile into the discovered form. Classification was
/// already decided from the snapshot; this walks the same control
/// enumeration and applies the decided roles. Fields nothing matched stay
/// empty, and the form is never submitted.
pub async fn fill_discovered_form(
    driver: &WebDriver,
    form: &DiscoveredForm,
    profile: &SenderProfile,
) -> WebDriverResult<FillReport> {
    if let FormScope::Frame(index) = form.scope {
        let frames = driver.find_all(By::Css("iframe, frame")).await?;
        match frames.into_iter().nth(index as usize) {
            Some(frame) => frame.enter_frame().await?,
            None => {
                log::error!("Frame {} disappeared before filling", index);
                return Ok(FillReport::default());
            }
        }
    }

    let report = fill_in_current_scope(driver, form, profile).await;

    if matches!(form.scope, FormScope::Frame(_)) {
        driver.enter_default_frame().await?;
    }

    report
}

async fn fill_in_current_scope(
    driver: &WebDriver,
    form: &DiscoveredForm,
    profile: &SenderProfile,
) -> WebDriverResult<FillReport> {
    let forms = driver.find_all(By::Tag("form")).await?;
    let Some(form_element) = forms.into_iter().nth(form.form_index) else {
        log::error!("Form {} disappeared before filling", form.form_index);
        return Ok(FillReport::default());
    };

    let controls = form_element
        .find_all(By::Css("input, textarea, select"))
        .await?;
    if controls.len() != form.fields.len() {
        log::warn!(
            "Form changed between discovery and fill: {} controls now, {} at discovery",
            controls.len(),
            form.fields.len()
        );
    }

    let roles = classify_fields(&form.fields);
    let mut report = FillReport::default();
    let mut branch_checked = false;

    for (control, (field, role)) in controls.iter().zip(form.fields.iter().zip(roles)) {
        let Some(role) = role else {
            if field.is_fillable() {
                report.skipped += 1;
            }
            continue;
        };

        let outcome = match role {
            FieldRole::DropdownChoice => pick_dropdown(control, field).await,
            FieldRole::BranchChoice => {
                // Branch/location checkboxes are usually mutually exclusive;
                // checking more than one gets the enquiry routed nowhere.
                if branch_checked {
                    continue;
                }
                match check_once(control).await {
                    Ok(()) => {
                        branch_checked = true;
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            FieldRole::RequiredConsent => check_once(control).await,
            role => match role_value(role, profile) {
                Some(value) => type_into(control, &value).await,
                None => continue,
            },
        };

        match outcome {
            Ok(()) => {
                report.filled.push(describe_target(field, role));
                if role == FieldRole::Email {
                    report.email_filled = true;
                }
                if role == FieldRole::Message {
                    report.message_filled = true;
                }
            }
            Err(e) => {
                log::warn!("Could not fill {}: {:?}", describe_target(field, role), e);
                report.skipped += 1;
            }
        }
    }

    Ok(report)
}

async fn type_into(control: &WebElement, value: &str) -> WebDriverResult<()> {
    let _ = control.clear().await;
    control.send_keys(value).await
}

async fn check_once(control: &WebElement) -> WebDriverResult<()> {
    if control.is_selected().await.unwrap_or(false) {
        return Ok(());
    }
    control.click().await
}

async fn pick_dropdown(control: &WebElement, field: &FormFieldDescriptor) -> WebDriverResult<()> {
    let Some(index) = pick_dropdown_option(&field.options) else {
        return Ok(());
    };
    let options = control.find_all(By::Tag("option")).await?;
    match options.into_iter().nth(index) {
        Some(option) => option.click().await,
        None => Ok(()),
    }
}

fn describe_target(field: &FormFieldDescriptor, role: FieldRole) -> String {
    let target = if !field.name.is_empty() {
        field.name.clone()
    } else if !field.id.is_empty() {
        field.id.clone()
    } else {
        field.tag.clone()
    };
    format!("{} ({:?})", target, role)
}
