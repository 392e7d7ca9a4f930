use std::fs::File;
use std::path::Path;

use calamine::{open_workbook, Reader, Xlsx};
use itertools::Itertools;
use serde::Deserialize;

use crate::domain::company::Company;

#[derive(Debug, Deserialize, Clone)]
pub struct CompanyRow {
    #[serde(
        default,
        rename = "Website",
        alias = "website",
        alias = "url",
        alias = "URL",
        alias = "site",
        alias = "Site"
    )]
    pub website: Option<String>,
    #[serde(
        default,
        rename = "Company",
        alias = "company",
        alias = "Company Name",
        alias = "company name",
        alias = "name",
        alias = "Name"
    )]
    pub company: Option<String>,
    #[serde(default, rename = "Email", alias = "email", alias = "contact email")]
    pub email: Option<String>,
    #[serde(
        default,
        rename = "Contact",
        alias = "contact",
        alias = "person",
        alias = "contact person"
    )]
    pub person: Option<String>,
    #[serde(default, rename = "Phone", alias = "phone", alias = "telephone")]
    pub phone: Option<String>,
}

/// Loads outreach targets from a row-oriented file, dispatching on the
/// extension. Rows that do not yield a website url are dropped, not errored.
pub fn load_companies<P: AsRef<Path>>(filename: P) -> Vec<Company> {
    let path = filename.as_ref();

    if !path.exists() {
        log::error!("Input file {:?} does not exist.", path);
        return vec![];
    }

    let is_excel = path
        .extension()
        .map_or(false, |ext| ext == "xlsx" || ext == "xls");

    let rows = if is_excel {
        load_excel_rows(path)
    } else {
        match File::open(path) {
            Ok(file) => parse_csv_rows(file),
            Err(e) => {
                log::error!("Could not open input file: {}", e);
                vec![]
            }
        }
    };

    companies_from_rows(rows)
}

pub fn parse_csv_rows<R: std::io::Read>(reader: R) -> Vec<CompanyRow> {
    let mut rows = vec![];
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    for result in rdr.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => log::error!("Error parsing input record: {}", e),
        }
    }

    rows
}

fn load_excel_rows(path: &Path) -> Vec<CompanyRow> {
    let mut rows = vec![];
    let mut workbook: Xlsx<_> = match open_workbook(path) {
        Ok(wb) => wb,
        Err(e) => {
            log::error!("Could not open spreadsheet: {}", e);
            return rows;
        }
    };

    let worksheets = workbook.worksheets();
    let Some((_name, range)) = worksheets.first() else {
        return rows;
    };

    let mut website_idx = None;
    let mut company_idx = None;
    let mut email_idx = None;
    let mut person_idx = None;
    let mut phone_idx = None;

    for (row_idx, row) in range.rows().enumerate() {
        if row_idx == 0 {
            for (col_idx, cell) in row.iter().enumerate() {
                let header = cell.to_string().to_lowercase();
                if header.contains("website") || header == "url" || header.contains("site") {
                    website_idx = Some(col_idx);
                } else if header.contains("company") || header == "name" {
                    company_idx = Some(col_idx);
                } else if header.contains("email") {
                    email_idx = Some(col_idx);
                } else if header.contains("contact") || header.contains("person") {
                    person_idx = Some(col_idx);
                } else if header.contains("phone") || header.contains("telephone") {
                    phone_idx = Some(col_idx);
                }
            }

            if website_idx.is_none() {
                log::error!("Spreadsheet header has no website/url/site column");
                return rows;
            }
            continue;
        }

        let cell_at = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(|c| c.to_string())
                .filter(|s| !s.trim().is_empty())
        };

        rows.push(CompanyRow {
            website: cell_at(website_idx),
            company: cell_at(company_idx),
            email: cell_at(email_idx),
            person: cell_at(person_idx),
            phone: cell_at(phone_idx),
        });
    }

    rows
}

pub fn companies_from_rows(rows: Vec<CompanyRow>) -> Vec<Company> {
    let companies: Vec<Company> = rows.into_iter().filter_map(row_into_company).collect();
    let total = companies.len();

    let companies: Vec<Company> = companies
        .into_iter()
        .unique_by(|c| c.website_url.to_lowercase())
        .collect();

    if companies.len() < total {
        log::info!("Dropped {} duplicate website rows", total - companies.len());
    }
    log::info!("Loaded {} outreach targets", companies.len());

    companies
}

pub fn row_into_company(row: CompanyRow) -> Option<Company> {
    let website = normalize_website(row.website.as_deref()?)?;

    let mut company = Company::new(website);
    company.company_name = clean(row.company);
    company.contact_email = clean(row.email);
    company.contact_person = clean(row.person);
    company.phone = clean(row.phone);
    Some(company)
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Input lists routinely carry bare domains; a url without a scheme gets
/// https prepended so navigation has something absolute to chew on.
pub fn normalize_website(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Some(raw.to_string())
    } else {
        Some(format!("https://{}", raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_aliases_are_accepted() {
        let csv = "url,name,email\nhttps://acme.io,Acme,info@acme.io\n";
        let rows = parse_csv_rows(csv.as_bytes());
        let companies = companies_from_rows(rows);

        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].website_url, "https://acme.io");
        assert_eq!(companies[0].company_name, Some("Acme".to_string()));
        assert_eq!(companies[0].contact_email, Some("info@acme.io".to_string()));
    }

    #[test]
    fn rows_without_website_are_dropped() {
        let csv = "website,company\nhttps://acme.io,Acme\n,NoSite Ltd\n  ,Blank Co\n";
        let rows = parse_csv_rows(csv.as_bytes());
        let companies = companies_from_rows(rows);

        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].website_url, "https://acme.io");
    }

    #[test]
    fn duplicate_websites_keep_first_occurrence() {
        let csv = "website,company\nhttps://acme.io,First\nHTTPS://ACME.IO,Second\n";
        let rows = parse_csv_rows(csv.as_bytes());
        let companies = companies_from_rows(rows);

        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].company_name, Some("First".to_string()));
    }

    #[test]
    fn bare_domains_get_a_scheme() {
        assert_eq!(
            normalize_website("acme.io"),
            Some("https://acme.io".to_string())
        );
        assert_eq!(
            normalize_website("http://acme.io"),
            Some("http://acme.io".to_string())
        );
        assert_eq!(normalize_website("   "), None);
    }

    #[test]
    fn unparseable_rows_do_not_poison_the_rest() {
        let csv = "website\nhttps://one.example\n\"unclosed\nhttps://two.example\n";
        let rows = parse_csv_rows(csv.as_bytes());
        let companies = companies_from_rows(rows);

        assert!(companies
            .iter()
            .any(|c| c.website_url == "https://one.example"));
    }
}
