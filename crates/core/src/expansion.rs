// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Template expansion planning.
//!
//! Planning is pure: given a template, a date window, the doctor's existing
//! slots, and their leave records, it decides which slots to create. The
//! persistence layer writes the plan one template per transaction.

use chrono::NaiveDate;
use consult_sched_domain::{
    AvailabilitySlot, AvailabilityTemplate, DomainError, LeaveRecord, SlotStatus, add_days,
    find_overlap, format_date,
};
use serde::Serialize;
use tracing::debug;

/// Days expanded when the caller gives neither an end date nor a day count.
pub const DEFAULT_EXPANSION_DAYS: u32 = 7;

/// Caller options for an expansion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionRequest {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days: Option<u32>,
    /// Restrict to these doctors; empty means all.
    pub doctor_ids: Vec<i64>,
    /// Restrict to these templates; empty means all.
    pub template_ids: Vec<i64>,
}

impl ExpansionRequest {
    /// Returns true if `template` passes the doctor and template filters.
    #[must_use]
    pub fn selects(&self, template: &AvailabilityTemplate) -> bool {
        (self.doctor_ids.is_empty() || self.doctor_ids.contains(&template.doctor_id))
            && (self.template_ids.is_empty() || self.template_ids.contains(&template.id()))
    }
}

/// An inclusive date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl ExpansionWindow {
    /// Resolves the window for a request.
    ///
    /// The start defaults to `today`. An explicit end before the start is
    /// clamped to the start. Without an end, the window spans `days`
    /// (default 7, minimum 1) dates.
    ///
    /// # Errors
    ///
    /// Returns an error if the end date overflows the calendar.
    pub fn resolve(today: NaiveDate, request: &ExpansionRequest) -> Result<Self, DomainError> {
        let start: NaiveDate = request.start_date.unwrap_or(today);
        let end: NaiveDate = match request.end_date {
            Some(end) => end.max(start),
            None => {
                let days: u32 = request.days.unwrap_or(DEFAULT_EXPANSION_DAYS).max(1);
                add_days(start, i64::from(days) - 1)?
            }
        };
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Iterates every date in the window.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end: NaiveDate = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// The slots to create for one template, and what was skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplatePlan {
    pub slots: Vec<AvailabilitySlot>,
    /// Dates in the window on which the template fires.
    pub considered_dates: u32,
    /// Firing dates skipped because an identical or overlapping slot exists.
    pub skipped_existing: u32,
    /// Firing dates skipped because the doctor is on leave.
    pub skipped_leave: u32,
}

/// Note attached to every generated slot.
#[must_use]
pub fn generated_slot_note(template_name: &str) -> String {
    format!("Auto-generated from template {template_name}")
}

/// Plans the slots a template generates over a window.
///
/// # Arguments
///
/// * `template` - A persisted, active template
/// * `window` - The date window
/// * `existing` - The doctor's slots in the window, any status
/// * `leaves` - The doctor's leave records
#[must_use]
pub fn plan_template(
    template: &AvailabilityTemplate,
    window: &ExpansionWindow,
    existing: &[AvailabilitySlot],
    leaves: &[LeaveRecord],
) -> TemplatePlan {
    let mut plan: TemplatePlan = TemplatePlan::default();

    for date in window.dates().filter(|d| template.fires_on(*d)) {
        plan.considered_dates += 1;

        if leaves.iter().any(|leave| leave.covers(date)) {
            plan.skipped_leave += 1;
            continue;
        }

        let same_day = existing.iter().filter(|s| s.slot_date == date);
        if let Some(conflict) = find_overlap(&template.range, same_day) {
            debug!(
                template_id = template.id(),
                date = %format_date(date),
                conflicting_slot_id = conflict.id(),
                "Skipping date with existing slot"
            );
            plan.skipped_existing += 1;
            continue;
        }

        plan.slots.push(AvailabilitySlot {
            slot_id: None,
            doctor_id: template.doctor_id,
            template_id: template.template_id,
            parent_slot_id: None,
            slot_date: date,
            range: template.range,
            status: SlotStatus::Available,
            is_manual: false,
            booked_by_hospital_id: None,
            booked_at: None,
            notes: Some(generated_slot_note(&template.name)),
        });
    }

    plan
}

/// Per-template outcome of an expansion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExpansionReport {
    pub template_id: i64,
    pub doctor_id: i64,
    pub template_name: String,
    pub created: u32,
    pub skipped_existing: u32,
    pub skipped_leave: u32,
    pub considered_dates: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TemplateExpansionReport {
    #[must_use]
    pub fn new(template: &AvailabilityTemplate) -> Self {
        Self {
            template_id: template.id(),
            doctor_id: template.doctor_id,
            template_name: template.name.clone(),
            created: 0,
            skipped_existing: 0,
            skipped_leave: 0,
            considered_dates: 0,
            error: None,
        }
    }
}

/// Outcome of an expansion run across templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionSummary {
    pub start_date: String,
    pub end_date: String,
    pub templates_processed: u32,
    pub slots_created: u32,
    pub templates: Vec<TemplateExpansionReport>,
}

impl ExpansionSummary {
    #[must_use]
    pub fn new(window: &ExpansionWindow) -> Self {
        Self {
            start_date: format_date(window.start()),
            end_date: format_date(window.end()),
            templates_processed: 0,
            slots_created: 0,
            templates: Vec::new(),
        }
    }

    /// Adds one template's report.
    pub fn record(&mut self, report: TemplateExpansionReport) {
        self.templates_processed += 1;
        self.slots_created += report.created;
        self.templates.push(report);
    }
}
