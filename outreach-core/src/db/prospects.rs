use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{fmt_ts, get_opt_ts, get_ts, get_uuid, Database};
use crate::error::{Error, Result};
use crate::models::*;

const PROSPECT_COLUMNS: &str = "id, email, first_name, last_name, company, title, industry, phone,
    revenue_estimate, source, notes, sequence_step, email_sent, email_sent_at,
    replied, replied_at, demo_booked, demo_booked_at, became_client, became_client_at, created_at";

fn map_prospect_row(row: &Row) -> rusqlite::Result<Prospect> {
    Ok(Prospect {
        id: get_uuid(row, 0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        company: row.get(4)?,
        title: row.get(5)?,
        industry: row.get(6)?,
        phone: row.get(7)?,
        revenue_estimate: row.get(8)?,
        source: row.get(9)?,
        notes: row.get(10)?,
        sequence_step: row.get(11)?,
        email_sent: row.get(12)?,
        email_sent_at: get_opt_ts(row, 13)?,
        replied: row.get(14)?,
        replied_at: get_opt_ts(row, 15)?,
        demo_booked: row.get(16)?,
        demo_booked_at: get_opt_ts(row, 17)?,
        became_client: row.get(18)?,
        became_client_at: get_opt_ts(row, 19)?,
        created_at: get_ts(row, 20)?,
    })
}

/// SQLite reads a negative LIMIT as "no limit", so large counts saturate instead of wrapping.
fn sql_limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn find_on(conn: &Connection, email: &str) -> Result<Option<Prospect>> {
    let sql = format!("SELECT {} FROM prospects WHERE email = ?1", PROSPECT_COLUMNS);
    let prospect = conn
        .query_row(&sql, params![normalize_email(email)], map_prospect_row)
        .optional()?;
    Ok(prospect)
}

fn upsert_on(conn: &Connection, input: &NewProspect, now: DateTime<Utc>) -> Result<UpsertOutcome> {
    let input = input.normalized();
    if !is_plausible_email(&input.email) {
        return Err(Error::Validation(format!("'{}' is not an email address", input.email)));
    }

    let existed: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM prospects WHERE email = ?1)",
        params![input.email],
        |row| row.get(0),
    )?;

    // Merges never touch outreach or funnel state, and keep the original source.
    conn.execute(
        "INSERT INTO prospects (
            id, email, first_name, last_name, company, title, industry, phone,
            revenue_estimate, source, notes, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(email) DO UPDATE SET
            first_name = COALESCE(excluded.first_name, prospects.first_name),
            last_name = COALESCE(excluded.last_name, prospects.last_name),
            company = COALESCE(excluded.company, prospects.company),
            title = COALESCE(excluded.title, prospects.title),
            industry = COALESCE(excluded.industry, prospects.industry),
            phone = COALESCE(excluded.phone, prospects.phone),
            revenue_estimate = COALESCE(excluded.revenue_estimate, prospects.revenue_estimate),
            notes = CASE
                WHEN excluded.notes IS NULL THEN prospects.notes
                WHEN prospects.notes IS NULL THEN excluded.notes
                ELSE prospects.notes || char(10) || char(10) || excluded.notes
            END",
        params![
            Uuid::new_v4().to_string(),
            input.email,
            input.first_name,
            input.last_name,
            input.company,
            input.title,
            input.industry,
            input.phone,
            input.revenue_estimate,
            input.source,
            input.notes,
            fmt_ts(now),
        ],
    )?;

    Ok(if existed {
        UpsertOutcome::Merged
    } else {
        UpsertOutcome::Inserted
    })
}

impl Database {
    pub fn find_prospect(&self, email: &str) -> Result<Option<Prospect>> {
        self.with_connection(|conn| find_on(conn, email))
    }

    /// Insert a prospect, or merge into the existing record with the same email.
    pub fn upsert_prospect(&self, input: &NewProspect) -> Result<(Prospect, UpsertOutcome)> {
        self.with_connection(|conn| {
            let outcome = upsert_on(conn, input, Utc::now())?;
            let prospect = find_on(conn, &input.email)?
                .ok_or_else(|| Error::NotFound(format!("Prospect {}", input.email)))?;
            Ok((prospect, outcome))
        })
    }

    /// Upsert a batch inside one transaction. Any failure rolls back the whole batch.
    pub fn upsert_prospects(&self, inputs: &[NewProspect]) -> Result<Vec<UpsertOutcome>> {
        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction()?;
            let now = Utc::now();
            let mut outcomes = Vec::with_capacity(inputs.len());
            for input in inputs {
                outcomes.push(upsert_on(&tx, input, now)?);
            }
            tx.commit()?;
            Ok(outcomes)
        })
    }

    /// Apply contact edits, funnel flags and a note line in one write.
    /// Returns `None` when no prospect has this email.
    pub fn patch_prospect(&self, email: &str, patch: &ProspectPatch) -> Result<Option<Prospect>> {
        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction()?;
            let Some(mut prospect) = find_on(&tx, email)? else {
                return Ok(None);
            };
            prospect.apply(patch);

            tx.execute(
                "UPDATE prospects SET
                    first_name = ?2, last_name = ?3, company = ?4, title = ?5, industry = ?6,
                    phone = ?7, revenue_estimate = ?8, notes = ?9,
                    replied = ?10, replied_at = ?11,
                    demo_booked = ?12, demo_booked_at = ?13,
                    became_client = ?14, became_client_at = ?15
                 WHERE id = ?1",
                params![
                    prospect.id.to_string(),
                    prospect.first_name,
                    prospect.last_name,
                    prospect.company,
                    prospect.title,
                    prospect.industry,
                    prospect.phone,
                    prospect.revenue_estimate,
                    prospect.notes,
                    prospect.replied,
                    prospect.replied_at.map(fmt_ts),
                    prospect.demo_booked,
                    prospect.demo_booked_at.map(fmt_ts),
                    prospect.became_client,
                    prospect.became_client_at.map(fmt_ts),
                ],
            )?;
            tx.commit()?;
            Ok(Some(prospect))
        })
    }

    /// Advance the sequence from `expected_step` to `expected_step + 1`.
    ///
    /// Returns `false` when the stored step no longer equals `expected_step`
    /// (or the prospect is gone), leaving the row untouched.
    pub fn record_send(&self, email: &str, expected_step: u8, sent_at: DateTime<Utc>) -> Result<bool> {
        if expected_step >= MAX_SEQUENCE_STEP {
            return Err(Error::InvalidTransition(format!(
                "{} cannot advance past step {}",
                email, MAX_SEQUENCE_STEP
            )));
        }
        self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE prospects
                 SET sequence_step = ?2 + 1, email_sent = 1, email_sent_at = ?3
                 WHERE email = ?1 AND sequence_step = ?2",
                params![normalize_email(email), expected_step, fmt_ts(sent_at)],
            )?;
            Ok(changed == 1)
        })
    }

    /// Prospects due for their next email: never contacted first, then longest waiting.
    pub fn select_due(
        &self,
        source: Option<&SourceFilter>,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Prospect>> {
        let (exact, prefix) = match source {
            Some(SourceFilter::Exact(s)) => (Some(s.as_str()), None),
            Some(SourceFilter::Prefix(p)) => (None, Some(p.as_str())),
            None => (None, None),
        };
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT {} FROM prospects
                 WHERE sequence_step < ?1
                   AND (email_sent = 0 OR email_sent_at < ?2)
                   AND (?3 IS NULL OR source = ?3)
                   AND (?4 IS NULL OR substr(source, 1, length(?4)) = ?4)
                 ORDER BY email_sent_at ASC NULLS FIRST, created_at ASC, email ASC
                 LIMIT ?5",
                PROSPECT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![MAX_SEQUENCE_STEP, fmt_ts(cutoff), exact, prefix, sql_limit(limit)],
                map_prospect_row,
            )?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Newest first. `limit = None` returns every matching row.
    pub fn list_prospects(
        &self,
        filter: ProspectFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Prospect>> {
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT {} FROM prospects WHERE {} ORDER BY created_at DESC, email ASC LIMIT ?1 OFFSET ?2",
                PROSPECT_COLUMNS,
                filter.where_clause()
            );
            let mut stmt = conn.prepare(&sql)?;
            let limit = limit.map(sql_limit).unwrap_or(-1);
            let rows = stmt.query_map(params![limit, sql_limit(offset)], map_prospect_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn count_prospects(&self, filter: ProspectFilter) -> Result<u64> {
        self.with_connection(|conn| {
            let sql = format!("SELECT COUNT(*) FROM prospects WHERE {}", filter.where_clause());
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    pub fn funnel_metrics(&self) -> Result<FunnelMetrics> {
        self.with_connection(|conn| {
            let counts = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(email_sent), 0),
                        COALESCE(SUM(replied), 0),
                        COALESCE(SUM(demo_booked), 0),
                        COALESCE(SUM(became_client), 0)
                 FROM prospects",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )?;
            let (total, sent, replies, demos, clients) = counts;
            Ok(FunnelMetrics::from_counts(
                total as u64,
                sent as u64,
                replies as u64,
                demos as u64,
                clients as u64,
            ))
        })
    }

    pub fn delete_prospect(&self, email: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "DELETE FROM prospects WHERE email = ?1",
                params![normalize_email(email)],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_prospects(&self, scope: DeleteScope) -> Result<usize> {
        self.with_connection(|conn| {
            let sql = format!("DELETE FROM prospects WHERE {}", scope.where_clause());
            Ok(conn.execute(&sql, [])?)
        })
    }
}
