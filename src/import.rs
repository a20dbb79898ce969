//! CSV import and export of prospects.

use std::collections::HashMap;
use std::io::{Read, Write};

use outreach_core::models::{
    is_plausible_email, NewProspect, Prospect, ProspectFilter, UpsertOutcome,
};
use outreach_core::Database;
use serde::Serialize;
use thiserror::Error;

/// Rows written per store transaction.
pub const IMPORT_BATCH_SIZE: usize = 100;

const EXPORT_HEADER: [&str; 14] = [
    "email",
    "first_name",
    "last_name",
    "company",
    "title",
    "revenue_estimate",
    "industry",
    "phone",
    "source",
    "email_sent",
    "replied",
    "demo_booked",
    "became_client",
    "created_at",
];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] outreach_core::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// New prospects created.
    pub imported: usize,
    /// Rows whose email already existed (or repeated in the file); merged into the existing record.
    pub duplicates: usize,
    /// Rows dropped for lacking a plausible email.
    pub invalid: usize,
}

#[derive(Debug, Default)]
pub struct ParsedRows {
    pub prospects: Vec<NewProspect>,
    pub invalid: usize,
}

struct Columns(HashMap<String, usize>);

impl Columns {
    fn get(&self, record: &csv::StringRecord, names: &[&str]) -> Option<String> {
        names
            .iter()
            .filter_map(|name| self.0.get(*name))
            .filter_map(|&i| record.get(i))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Parse CSV rows into candidate prospects. Header names are case-insensitive.
pub fn parse_prospects<R: Read>(reader: R) -> Result<ParsedRows, ImportError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns(
        csv.headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect(),
    );
    if !columns.0.contains_key("email") {
        return Err(ImportError::Validation(
            "CSV must have an \"email\" column".into(),
        ));
    }

    let mut parsed = ParsedRows::default();
    let mut rows = 0;
    for record in csv.records() {
        let record = record?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        rows += 1;

        let email = columns.get(&record, &["email"]).unwrap_or_default();
        if !is_plausible_email(&email) {
            parsed.invalid += 1;
            continue;
        }

        parsed.prospects.push(NewProspect {
            email,
            first_name: columns.get(&record, &["first_name", "firstname"]),
            last_name: columns.get(&record, &["last_name", "lastname"]),
            company: columns.get(&record, &["company"]),
            title: columns.get(&record, &["title"]),
            industry: columns.get(&record, &["industry"]),
            phone: columns.get(&record, &["phone"]),
            revenue_estimate: columns.get(&record, &["revenue_estimate", "revenue"]),
            source: columns.get(&record, &["source"]),
            notes: columns.get(&record, &["notes"]),
        });
    }

    if rows == 0 {
        return Err(ImportError::Validation(
            "CSV must have a header row and at least one data row".into(),
        ));
    }
    Ok(parsed)
}

/// Parse and upsert in fixed-size batches, keyed by lowercased email.
pub fn import_prospects<R: Read>(db: &Database, reader: R) -> Result<ImportReport, ImportError> {
    let parsed = parse_prospects(reader)?;
    let mut report = ImportReport {
        invalid: parsed.invalid,
        ..Default::default()
    };

    for chunk in parsed.prospects.chunks(IMPORT_BATCH_SIZE) {
        for outcome in db.upsert_prospects(chunk)? {
            match outcome {
                UpsertOutcome::Inserted => report.imported += 1,
                UpsertOutcome::Merged => report.duplicates += 1,
            }
        }
    }

    tracing::info!(
        imported = report.imported,
        duplicates = report.duplicates,
        invalid = report.invalid,
        "Prospect import finished"
    );
    Ok(report)
}

fn export_row(p: &Prospect) -> [String; 14] {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    [
        p.email.clone(),
        opt(&p.first_name),
        opt(&p.last_name),
        opt(&p.company),
        opt(&p.title),
        opt(&p.revenue_estimate),
        opt(&p.industry),
        opt(&p.phone),
        p.source.clone(),
        p.email_sent.to_string(),
        p.replied.to_string(),
        p.demo_booked.to_string(),
        p.became_client.to_string(),
        p.created_at.to_rfc3339(),
    ]
}

/// Write every prospect matching `filter` as CSV, newest first. Returns rows written.
pub fn export_prospects<W: Write>(
    db: &Database,
    filter: ProspectFilter,
    writer: W,
) -> Result<usize, ImportError> {
    let prospects = db.list_prospects(filter, None, 0)?;
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(EXPORT_HEADER)?;
    for prospect in &prospects {
        csv.write_record(export_row(prospect))?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(prospects.len())
}
