use serde::Serialize;

use crate::domain::sender_profile::SenderProfile;

pub const GENERIC_FILL: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectChoice {
    pub value: String,
    pub text: String,
}

/// One fillable control as observed on the page. Produced fresh per run and
/// never persisted beyond the run's report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormFieldDescriptor {
    pub tag: String,
    pub control_type: String,
    pub name: String,
    pub id: String,
    pub label: String,
    pub placeholder: String,
    pub required: bool,
    pub options: Vec<SelectChoice>,
}

impl FormFieldDescriptor {
    /// Concatenated lowercase text the classification rules match against.
    pub fn role_signal(&self) -> String {
        format!("{} {} {}", self.name, self.id, self.label).to_lowercase()
    }

    pub fn is_fillable(&self) -> bool {
        if self.tag == "textarea" || self.tag == "select" {
            return true;
        }
        !matches!(
            self.control_type.as_str(),
            "hidden" | "submit" | "button" | "reset" | "image" | "file" | "password"
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormScope {
    MainDocument,
    Frame(u16),
}

/// The winning form of a page, descriptors in DOM order.
#[derive(Debug, Clone)]
pub struct DiscoveredForm {
    pub scope: FormScope,
    pub form_index: usize,
    pub score: u8,
    pub fields: Vec<FormFieldDescriptor>,
}

/// A form containing an email input or a textarea outranks one with neither.
/// Filters out login forms, search boxes and newsletter widgets that are
/// structurally forms but not the outreach target.
pub fn score_fields(fields: &[FormFieldDescriptor]) -> u8 {
    u8::from(rank_fields(fields) > 0)
}

/// Finer preference order within the qualifying forms: a form that can carry
/// a message beats one that only collects an address, so a contact form wins
/// over a newsletter signup wherever it sits in the document.
pub fn rank_fields(fields: &[FormFieldDescriptor]) -> u8 {
    let has_email = fields
        .iter()
        .any(|f| f.tag == "input" && f.control_type == "email");
    let has_textarea = fields.iter().any(|f| f.tag == "textarea");

    match (has_email, has_textarea) {
        (true, true) => 3,
        (_, true) => 2,
        (true, _) => 1,
        _ => 0,
    }
}

/// Highest rank wins; the first candidate in DOM order wins ties, so a page
/// whose only forms are rank 0 still yields its first visible form.
pub fn pick_best_form(candidates: Vec<DiscoveredForm>) -> Option<DiscoveredForm> {
    let mut best: Option<(u8, DiscoveredForm)> = None;
    for form in candidates {
        let rank = rank_fields(&form.fields);
        match &best {
            Some((top, _)) if *top >= rank => {}
            _ => best = Some((rank, form)),
        }
    }
    best.map(|(_, form)| form)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Email,
    Phone,
    FirstName,
    LastName,
    FullName,
    Company,
    Subject,
    Message,
    GenericText,
    DropdownChoice,
    BranchChoice,
    RequiredConsent,
}

pub struct ClassifyRule {
    pub name: &'static str,
    pub applies: fn(&FormFieldDescriptor) -> bool,
    pub role: FieldRole,
}

fn is_select(f: &FormFieldDescriptor) -> bool {
    f.tag == "select"
}

fn is_branch_checkbox(f: &FormFieldDescriptor) -> bool {
    f.control_type == "checkbox"
        && ["branch", "location", "office", "department", "region"]
            .iter()
            .any(|kw| f.role_signal().contains(kw))
}

fn is_required_checkbox(f: &FormFieldDescriptor) -> bool {
    f.control_type == "checkbox" && f.required
}

fn is_textarea(f: &FormFieldDescriptor) -> bool {
    f.tag == "textarea"
}

fn is_text_input(f: &FormFieldDescriptor) -> bool {
    f.tag == "input"
        && !matches!(f.control_type.as_str(), "checkbox" | "radio")
}

fn is_email(f: &FormFieldDescriptor) -> bool {
    is_text_input(f) && (f.control_type == "email" || f.role_signal().contains("email"))
}

fn is_phone(f: &FormFieldDescriptor) -> bool {
    is_text_input(f) && (f.control_type == "tel" || f.role_signal().contains("phone"))
}

fn is_first_name(f: &FormFieldDescriptor) -> bool {
    let signal = f.role_signal();
    is_text_input(f)
        && signal.contains("first")
        && !signal.contains("last")
        && !signal.contains("company")
}

fn is_last_name(f: &FormFieldDescriptor) -> bool {
    is_text_input(f) && f.role_signal().contains("last")
}

fn is_company(f: &FormFieldDescriptor) -> bool {
    is_text_input(f) && f.role_signal().contains("company")
}

fn is_subject(f: &FormFieldDescriptor) -> bool {
    let signal = f.role_signal();
    is_text_input(f) && (signal.contains("subject") || signal.contains("topic"))
}

fn is_full_name(f: &FormFieldDescriptor) -> bool {
    let signal = f.role_signal();
    is_text_input(f) && signal.contains("name") && !signal.contains("user")
}

fn is_generic_text(f: &FormFieldDescriptor) -> bool {
    f.tag == "input" && matches!(f.control_type.as_str(), "text" | "")
}

/// Ordered rule table; the first applicable rule decides the role. Earlier
/// rules carry stronger signals, so a field is never claimed by a weaker
/// rule when a stronger one matches.
pub const CLASSIFY_RULES: &[ClassifyRule] = &[
    ClassifyRule {
        name: "dropdown",
        applies: is_select,
        role: FieldRole::DropdownChoice,
    },
    ClassifyRule {
        name: "branch-checkbox",
        applies: is_branch_checkbox,
        role: FieldRole::BranchChoice,
    },
    ClassifyRule {
        name: "required-checkbox",
        applies: is_required_checkbox,
        role: FieldRole::RequiredConsent,
    },
    ClassifyRule {
        name: "message",
        applies: is_textarea,
        role: FieldRole::Message,
    },
    ClassifyRule {
        name: "email",
        applies: is_email,
        role: FieldRole::Email,
    },
    ClassifyRule {
        name: "phone",
        applies: is_phone,
        role: FieldRole::Phone,
    },
    ClassifyRule {
        name: "first-name",
        applies: is_first_name,
        role: FieldRole::FirstName,
    },
    ClassifyRule {
        name: "last-name",
        applies: is_last_name,
        role: FieldRole::LastName,
    },
    ClassifyRule {
        name: "company",
        applies: is_company,
        role: FieldRole::Company,
    },
    ClassifyRule {
        name: "subject",
        applies: is_subject,
        role: FieldRole::Subject,
    },
    ClassifyRule {
        name: "full-name",
        applies: is_full_name,
        role: FieldRole::FullName,
    },
    ClassifyRule {
        name: "generic-text",
        applies: is_generic_text,
        role: FieldRole::GenericText,
    },
];

/// Pure function of the descriptor: the same snapshot always classifies the
/// same way. A field no rule claims is left alone rather than guessed at.
pub fn classify_field(field: &FormFieldDescriptor) -> Option<FieldRole> {
    if !field.is_fillable() {
        return None;
    }
    CLASSIFY_RULES
        .iter()
        .find(|rule| (rule.applies)(field))
        .map(|rule| rule.role)
}

pub fn classify_fields(fields: &[FormFieldDescriptor]) -> Vec<Option<FieldRole>> {
    fields.iter().map(classify_field).collect()
}

/// The text a classified role receives, taken verbatim from the profile.
/// Roles that are actions rather than text (checkboxes, selects) yield None.
pub fn role_value(role: FieldRole, profile: &SenderProfile) -> Option<String> {
    match role {
        FieldRole::Email => Some(profile.email.clone()),
        FieldRole::Phone => Some(profile.phone.clone()),
        FieldRole::FirstName => Some(profile.first_name.clone()),
        FieldRole::LastName => Some(profile.last_name.clone()),
        FieldRole::FullName => Some(profile.full_name()),
        FieldRole::Company => Some(
            profile
                .company
                .clone()
                .unwrap_or_else(|| GENERIC_FILL.to_string()),
        ),
        FieldRole::Subject => Some(profile.subject.clone()),
        FieldRole::Message => Some(profile.message.clone()),
        FieldRole::GenericText => Some(GENERIC_FILL.to_string()),
        FieldRole::DropdownChoice | FieldRole::BranchChoice | FieldRole::RequiredConsent => None,
    }
}

fn looks_like_placeholder_option(text: &str) -> bool {
    let text = text.to_lowercase();
    ["choose", "select", "please", "--"]
        .iter()
        .any(|kw| text.contains(kw))
}

/// Index of the option to pick for a dropdown: the first option that does
/// not read like a prompt, else the second when there is one, else the first.
pub fn pick_dropdown_option(options: &[SelectChoice]) -> Option<usize> {
    if options.is_empty() {
        return None;
    }
    match options
        .iter()
        .position(|o| !looks_like_placeholder_option(&o.text))
    {
        Some(i) => Some(i),
        None if options.len() > 1 => Some(1),
        None => Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_field(name: &str, control_type: &str) -> FormFieldDescriptor {
        FormFieldDescriptor {
            tag: "input".to_string(),
            control_type: control_type.to_string(),
            name: name.to_string(),
            id: "".to_string(),
            label: "".to_string(),
            placeholder: "".to_string(),
            required: false,
            options: vec![],
        }
    }

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

    #[test]
    fn email_by_type_and_by_signal() {
        assert_eq!(
            classify_field(&text_field("whatever", "email")),
            Some(FieldRole::Email)
        );
        assert_eq!(
            classify_field(&text_field("your-email", "text")),
            Some(FieldRole::Email)
        );
    }

    #[test]
    fn phone_by_type_and_by_signal() {
        assert_eq!(
            classify_field(&text_field("mobile", "tel")),
            Some(FieldRole::Phone)
        );
        assert_eq!(
            classify_field(&text_field("phone_number", "text")),
            Some(FieldRole::Phone)
        );
    }

    #[test]
    fn first_name_excludes_last_and_company() {
        assert_eq!(
            classify_field(&text_field("first_name", "text")),
            Some(FieldRole::FirstName)
        );
        assert_eq!(
            classify_field(&text_field("first_last_name", "text")),
            Some(FieldRole::LastName)
        );
        assert_eq!(
            classify_field(&text_field("company_first_contact", "text")),
            Some(FieldRole::Company)
        );
    }

    #[test]
    fn bare_name_is_full_name() {
        assert_eq!(
            classify_field(&text_field("name", "text")),
            Some(FieldRole::FullName)
        );
        assert_eq!(
            classify_field(&text_field("username", "text")),
            Some(FieldRole::GenericText)
        );
    }

    #[test]
    fn textarea_is_message_regardless_of_name() {
        let field = FormFieldDescriptor {
            tag: "textarea".to_string(),
            control_type: "".to_string(),
            name: "your-enquiry".to_string(),
            id: "".to_string(),
            label: "".to_string(),
            placeholder: "".to_string(),
            required: true,
            options: vec![],
        };
        assert_eq!(classify_field(&field), Some(FieldRole::Message));
    }

    #[test]
    fn newsletter_checkbox_left_alone() {
        let mut field = text_field("newsletter_opt_in", "checkbox");
        assert_eq!(classify_field(&field), None);

        field.required = true;
        assert_eq!(classify_field(&field), Some(FieldRole::RequiredConsent));
    }

    #[test]
    fn branch_checkbox_detected() {
        let field = FormFieldDescriptor {
            tag: "input".to_string(),
            control_type: "checkbox".to_string(),
            name: "office_berlin".to_string(),
            id: "".to_string(),
            label: "Berlin office".to_string(),
            placeholder: "".to_string(),
            required: false,
            options: vec![],
        };
        assert_eq!(classify_field(&field), Some(FieldRole::BranchChoice));
    }

    #[test]
    fn hidden_and_submit_never_classified() {
        assert_eq!(classify_field(&text_field("email", "hidden")), None);
        assert_eq!(classify_field(&text_field("send", "submit")), None);
    }

    #[test]
    fn classification_is_idempotent() {
        let fields = vec![
            text_field("first_name", "text"),
            text_field("email", "email"),
            text_field("anything", "text"),
        ];
        let first = classify_fields(&fields);
        let second = classify_fields(&fields);
        assert_eq!(first, second);
    }

    #[test]
    fn role_values_come_from_profile() {
        let profile = profile();
        assert_eq!(
            role_value(FieldRole::Email, &profile),
            Some("jane@acme.io".to_string())
        );
        assert_eq!(
            role_value(FieldRole::FullName, &profile),
            Some("Jane Doe".to_string())
        );
        assert_eq!(
            role_value(FieldRole::Company, &profile),
            Some(GENERIC_FILL.to_string())
        );
        assert_eq!(role_value(FieldRole::DropdownChoice, &profile), None);
    }

    #[test]
    fn dropdown_skips_placeholder_options() {
        let options = vec![
            SelectChoice {
                value: "".to_string(),
                text: "-- Please choose --".to_string(),
            },
            SelectChoice {
                value: "sales".to_string(),
                text: "Sales".to_string(),
            },
            SelectChoice {
                value: "support".to_string(),
                text: "Support".to_string(),
            },
        ];
        assert_eq!(pick_dropdown_option(&options), Some(1));
    }

    #[test]
    fn dropdown_all_placeholders_takes_second() {
        let options = vec![
            SelectChoice {
                value: "".to_string(),
                text: "Select one".to_string(),
            },
            SelectChoice {
                value: "x".to_string(),
                text: "Please pick".to_string(),
            },
        ];
        assert_eq!(pick_dropdown_option(&options), Some(1));
    }

    #[test]
    fn dropdown_single_option() {
        let options = vec![SelectChoice {
            value: "".to_string(),
            text: "Choose".to_string(),
        }];
        assert_eq!(pick_dropdown_option(&options), Some(0));
        assert_eq!(pick_dropdown_option(&[]), None);
    }

    #[test]
    fn newsletter_form_scores_one_contact_form_scores_one() {
        let newsletter = vec![text_field("email", "email")];
        assert_eq!(score_fields(&newsletter), 1);

        let search = vec![text_field("q", "text")];
        assert_eq!(score_fields(&search), 0);
    }

    fn textarea_field(name: &str) -> FormFieldDescriptor {
        FormFieldDescriptor {
            tag: "textarea".to_string(),
            control_type: "".to_string(),
            name: name.to_string(),
            id: "".to_string(),
            label: "".to_string(),
            placeholder: "".to_string(),
            required: false,
            options: vec![],
        }
    }

    fn form_with(index: usize, fields: Vec<FormFieldDescriptor>) -> DiscoveredForm {
        let score = score_fields(&fields);
        DiscoveredForm {
            scope: FormScope::MainDocument,
            form_index: index,
            score,
            fields,
        }
    }

    #[test]
    fn contact_form_beats_newsletter_signup_regardless_of_order() {
        let newsletter = form_with(0, vec![text_field("email", "email")]);
        let contact = form_with(
            1,
            vec![text_field("email", "email"), textarea_field("message")],
        );

        let picked = pick_best_form(vec![newsletter, contact]).unwrap();
        assert_eq!(picked.form_index, 1);
        assert_eq!(picked.score, 1);
    }

    #[test]
    fn lone_zero_score_form_still_picked() {
        let search = form_with(0, vec![text_field("q", "text")]);
        let picked = pick_best_form(vec![search]).unwrap();
        assert_eq!(picked.form_index, 0);
        assert_eq!(picked.score, 0);
    }

    #[test]
    fn first_form_wins_rank_ties() {
        let first = form_with(0, vec![text_field("email", "email")]);
        let second = form_with(1, vec![text_field("email", "email")]);
        assert_eq!(pick_best_form(vec![first, second]).unwrap().form_index, 0);
    }
}
