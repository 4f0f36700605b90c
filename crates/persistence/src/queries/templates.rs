// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use consult_sched_domain::AvailabilityTemplate;
use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::data_models::TemplateRow;
use crate::diesel_schema::availability_templates;
use crate::error::PersistenceError;

/// Retrieves a template by ID.
///
/// # Errors
///
/// Returns `NotFound` if no template has this ID.
pub fn get_template(
    conn: &mut SqliteConnection,
    template_id: i64,
) -> Result<AvailabilityTemplate, PersistenceError> {
    let row: Option<TemplateRow> = availability_templates::table
        .filter(availability_templates::template_id.eq(template_id))
        .select(TemplateRow::as_select())
        .first::<TemplateRow>(conn)
        .optional()?;

    row.map_or_else(
        || Err(PersistenceError::NotFound(format!("Template {template_id}"))),
        AvailabilityTemplate::try_from,
    )
}

/// Lists every active template in ID order.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is malformed.
pub fn list_active_templates(
    conn: &mut SqliteConnection,
) -> Result<Vec<AvailabilityTemplate>, PersistenceError> {
    availability_templates::table
        .filter(availability_templates::is_active.eq(true))
        .order(availability_templates::template_id.asc())
        .select(TemplateRow::as_select())
        .load::<TemplateRow>(conn)?
        .into_iter()
        .map(AvailabilityTemplate::try_from)
        .collect()
}
