// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use consult_sched::{ExpansionWindow, TemplatePlan, plan_template};
use consult_sched_domain::{
    AvailabilitySlot, AvailabilityTemplate, LeaveRecord, format_date, format_recurrence_days,
    format_time,
};
use diesel::SqliteConnection;
use diesel::prelude::*;
use tracing::info;

use crate::backend::PersistenceBackend;
use crate::diesel_schema::availability_templates;
use crate::error::PersistenceError;
use crate::mutations::slots::insert_slot;
use crate::queries;

/// Inserts a template and returns its ID.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_template(
    conn: &mut SqliteConnection,
    template: &AvailabilityTemplate,
    now: &str,
) -> Result<i64, PersistenceError> {
    diesel::insert_into(availability_templates::table)
        .values((
            availability_templates::doctor_id.eq(template.doctor_id),
            availability_templates::template_name.eq(&template.name),
            availability_templates::recurrence_pattern.eq(template.pattern.as_str()),
            availability_templates::recurrence_days.eq(format_recurrence_days(&template.days)),
            availability_templates::start_time.eq(format_time(template.range.start())),
            availability_templates::end_time.eq(format_time(template.range.end())),
            availability_templates::valid_from.eq(format_date(template.valid_from)),
            availability_templates::valid_until.eq(template.valid_until.map(format_date)),
            availability_templates::is_active.eq(template.is_active),
            availability_templates::created_at.eq(now),
        ))
        .execute(conn)?;

    let template_id: i64 = conn.get_last_insert_rowid()?;
    info!(
        template_id,
        doctor_id = template.doctor_id,
        pattern = template.pattern.as_str(),
        "Created availability template"
    );
    Ok(template_id)
}

/// Marks a template inactive. Slots it already generated are kept.
///
/// # Errors
///
/// Returns `NotFound` if the template does not exist.
pub fn deactivate_template(
    conn: &mut SqliteConnection,
    template_id: i64,
) -> Result<AvailabilityTemplate, PersistenceError> {
    let updated: usize = diesel::update(
        availability_templates::table.filter(availability_templates::template_id.eq(template_id)),
    )
    .set(availability_templates::is_active.eq(false))
    .execute(conn)?;

    if updated == 0 {
        return Err(PersistenceError::NotFound(format!("Template {template_id}")));
    }

    info!(template_id, "Deactivated availability template");
    queries::templates::get_template(conn, template_id)
}

/// Generates and inserts one template's slots over a window.
///
/// The returned plan's slots carry their new IDs.
///
/// # Errors
///
/// Returns an error if loading the doctor's slots or leaves fails, or if an
/// insert fails.
pub fn expand_template(
    conn: &mut SqliteConnection,
    template: &AvailabilityTemplate,
    window: &ExpansionWindow,
    now: &str,
) -> Result<TemplatePlan, PersistenceError> {
    let existing: Vec<AvailabilitySlot> =
        queries::slots::list_slots_in_window(conn, template.doctor_id, window.start(), window.end())?;
    let leaves: Vec<LeaveRecord> =
        queries::leaves::list_leaves_in_window(conn, template.doctor_id, window.start(), window.end())?;

    let mut plan: TemplatePlan = plan_template(template, window, &existing, &leaves);
    for slot in &mut plan.slots {
        slot.slot_id = Some(insert_slot(conn, slot, now)?);
    }

    info!(
        template_id = template.id(),
        created = plan.slots.len(),
        skipped_existing = plan.skipped_existing,
        skipped_leave = plan.skipped_leave,
        "Expanded template"
    );
    Ok(plan)
}
