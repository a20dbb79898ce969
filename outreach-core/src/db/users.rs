use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use super::{fmt_ts, get_enum, get_ts, get_uuid, Database};
use crate::error::{Error, Result};
use crate::models::*;

fn map_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: get_uuid(row, 0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: get_enum(row, 3, UserRole::from_str)?,
        organization_id: get_uuid(row, 4)?,
        created_at: get_ts(row, 5)?,
    })
}

impl Database {
    pub fn create_user(&self, input: CreateUserInput) -> Result<User> {
        let email = normalize_email(&input.email);
        if !is_plausible_email(&email) {
            return Err(Error::Validation(format!("'{}' is not an email address", email)));
        }
        if self.get_organization(input.organization_id)?.is_none() {
            return Err(Error::NotFound(format!("Organization {}", input.organization_id)));
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            name: input.name.filter(|n| !n.trim().is_empty()),
            role: input.role.unwrap_or(UserRole::Member),
            organization_id: input.organization_id,
            created_at: Utc::now(),
        };

        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, role, organization_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id.to_string(),
                    user.email,
                    user.name,
                    user.role.as_str(),
                    user.organization_id.to_string(),
                    fmt_ts(user.created_at),
                ],
            )?;
            Ok(())
        })?;
        Ok(user)
    }

    /// Users newest first, optionally restricted to one organization.
    pub fn list_users(&self, organization_id: Option<Uuid>) -> Result<Vec<UserWithOrganization>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.name, u.role, u.organization_id, u.created_at, o.name
                 FROM users u
                 JOIN organizations o ON o.id = u.organization_id
                 WHERE ?1 IS NULL OR u.organization_id = ?1
                 ORDER BY u.created_at DESC",
            )?;
            let rows = stmt.query_map(params![organization_id.map(|id| id.to_string())], |row| {
                Ok(UserWithOrganization {
                    user: map_user_row(row)?,
                    organization_name: row.get(6)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}
