use thirtyfour::error::WebDriverResult;
use thirtyfour::{By, WebDriver, WebElement};

use crate::domain::form::{
    pick_best_form, rank_fields, score_fields, DiscoveredForm, FormFieldDescriptor, FormScope,
    SelectChoice,
};

/// Finds the single best candidate contact form on the loaded page, or None.
///
/// Visible forms in the main document are scored first; only when the main
/// document has no visible forms at all does the search move into child
/// frames, in discovery order. Third-party form widgets commonly live in an
/// embedded frame, which is the case the fallback exists for.
pub async fn locate_contact_form(driver: &WebDriver) -> WebDriverResult<Option<DiscoveredForm>> {
    if let Some(form) = best_form_in_scope(driver, FormScope::MainDocument).await? {
        return Ok(Some(form));
    }

    let frames = driver.find_all(By::Css("iframe, frame")).await?;
    for (index, frame) in frames.into_iter().enumerate() {
        if let Err(e) = frame.clone().enter_frame().await {
            log::warn!("Could not enter frame {}: {:?}", index, e);
            continue;
        }

        let found = best_form_in_scope(driver, FormScope::Frame(index as u16)).await;
        driver.enter_default_frame().await?;

        match found {
            Ok(Some(form)) => return Ok(Some(form)),
            Ok(None) => {}
            Err(e) => log::warn!("Form scan inside frame {} failed: {:?}", index, e),
        }
    }

    Ok(None)
}

/// Qualifying forms (email input or textarea) win over the rest, and among
/// them a message-capable form wins over an address-only one, so a contact
/// form beats the newsletter signup sharing its page. A score-0 form is
/// still returned when it is all the scope has.
async fn best_form_in_scope(
    driver: &WebDriver,
    scope: FormScope,
) -> WebDriverResult<Option<DiscoveredForm>> {
    let forms = driver.find_all(By::Tag("form")).await?;
    let mut candidates = vec![];

    for (index, form) in forms.iter().enumerate() {
        if !form.is_displayed().await.unwrap_or(false) {
            continue;
        }

        let fields = describe_form_fields(driver, form).await?;
        let rank = rank_fields(&fields);
        let score = score_fields(&fields);
        candidates.push(DiscoveredForm {
            scope,
            form_index: index,
            score,
            fields,
        });

        // Top rank; no later form can beat it.
        if rank == 3 {
            break;
        }
    }

    Ok(pick_best_form(candidates))
}

/// Snapshots every control of a form, in DOM order. The filler re-walks the
/// same enumeration, so positions line up between snapshot and fill.
pub async fn describe_form_fields(
    driver: &WebDriver,
    form: &WebElement,
) -> WebDriverResult<Vec<FormFieldDescriptor>> {
    let controls = form.find_all(By::Css("input, textarea, select")).await?;
    let mut fields = Vec::with_capacity(controls.len());

    for control in &controls {
        let tag = control.tag_name().await?.to_lowercase();
        let control_type = control
            .attr("type")
            .await?
            .unwrap_or_default()
            .to_lowercase();
        let name = control.attr("name").await?.unwrap_or_default();
        let id = control.attr("id").await?.unwrap_or_default();
        let placeholder = control.attr("placeholder").await?.unwrap_or_default();
        let required = control.attr("required").await?.is_some();
        let label = resolve_label(driver, control, &id).await;

        let options = if tag == "select" {
            describe_options(control).await?
        } else {
            vec![]
        };

        fields.push(FormFieldDescriptor {
            tag,
            control_type,
            name,
            id,
            label,
            placeholder,
            required,
            options,
        });
    }

    Ok(fields)
}

/// Explicit `label[for]` first, then the nearest preceding sibling's text,
/// then `aria-label`. Empty when nothing resolves.
async fn resolve_label(driver: &WebDriver, control: &WebElement, id: &str) -> String {
    if !id.is_empty() {
        if let Ok(label) = driver
            .find(By::Css(format!("label[for='{}']", id).as_str()))
            .await
        {
            if let Ok(text) = label.text().await {
                let text = text.trim().to_string();
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }

    if let Ok(sibling) = control.find(By::XPath("./preceding-sibling::*[1]")).await {
        if let Ok(text) = sibling.text().await {
            let text = text.trim().to_string();
            if !text.is_empty() {
                return text;
            }
        }
    }

    if let Ok(Some(aria)) = control.attr("aria-label").await {
        return aria.trim().to_string();
    }

    String::new()
}

async fn describe_options(control: &WebElement) -> WebDriverResult<Vec<SelectChoice>> {
    let mut options = vec![];
    for option in control.find_all(By::Tag("option")).await? {
        let value = option.attr("value").await?.unwrap_or_default();
        let text = option.text().await.unwrap_or_default();
        options.push(SelectChoice { value, text });
    }
    Ok(options)
}
