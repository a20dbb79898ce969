use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::{fmt_ts, get_enum, get_ts, get_uuid, Database};
use crate::error::{Error, Result};
use crate::models::*;
use crate::slug;

const ORGANIZATION_COLUMNS: &str =
    "id, name, slug, plan, status, stripe_customer_id, stripe_subscription_id, created_at";

fn map_organization_row(row: &Row) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: get_uuid(row, 0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        plan: row.get(3)?,
        status: get_enum(row, 4, OrganizationStatus::from_str)?,
        stripe_customer_id: row.get(5)?,
        stripe_subscription_id: row.get(6)?,
        created_at: get_ts(row, 7)?,
    })
}

impl Database {
    pub fn slug_exists(&self, slug: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM organizations WHERE slug = ?1)",
                params![slug],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Create an organization under a freshly generated unique slug.
    pub fn create_organization(&self, input: CreateOrganizationInput) -> Result<Organization> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("organization name is required".into()));
        }
        let slug = slug::unique_slug(name, |candidate| self.slug_exists(candidate))?;

        let organization = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug,
            plan: input
                .plan
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PLAN.to_string()),
            status: input.status.unwrap_or(OrganizationStatus::Pending),
            stripe_customer_id: input.stripe_customer_id,
            stripe_subscription_id: input.stripe_subscription_id,
            created_at: Utc::now(),
        };

        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO organizations (id, name, slug, plan, status, stripe_customer_id, stripe_subscription_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    organization.id.to_string(),
                    organization.name,
                    organization.slug,
                    organization.plan,
                    organization.status.as_str(),
                    organization.stripe_customer_id,
                    organization.stripe_subscription_id,
                    fmt_ts(organization.created_at),
                ],
            )?;
            Ok(())
        })?;

        tracing::info!(slug = %organization.slug, "Organization created");
        Ok(organization)
    }

    pub fn get_organization(&self, id: Uuid) -> Result<Option<Organization>> {
        self.with_connection(|conn| {
            let sql = format!("SELECT {} FROM organizations WHERE id = ?1", ORGANIZATION_COLUMNS);
            Ok(conn
                .query_row(&sql, params![id.to_string()], map_organization_row)
                .optional()?)
        })
    }

    /// All organizations, newest first, with their member counts.
    pub fn list_organizations(&self) -> Result<Vec<OrganizationWithMembers>> {
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT {}, (SELECT COUNT(*) FROM users u WHERE u.organization_id = o.id)
                 FROM organizations o ORDER BY created_at DESC",
                ORGANIZATION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                Ok(OrganizationWithMembers {
                    organization: map_organization_row(row)?,
                    member_count: row.get::<_, i64>(8)? as u64,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn update_organization_status(&self, id: Uuid, status: OrganizationStatus) -> Result<bool> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE organizations SET status = ?2 WHERE id = ?1",
                params![id.to_string(), status.as_str()],
            )?;
            Ok(changed > 0)
        })
    }
}
