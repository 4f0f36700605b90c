// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{
    ExpansionRequest, ExpansionSummary, ExpansionWindow, TemplateExpansionReport, TemplatePlan,
    plan_template,
};
use chrono::NaiveDate;
use consult_sched_domain::{
    AvailabilitySlot, AvailabilityTemplate, LeaveRecord, LeaveType, RecurrencePattern,
    SlotStatus, TimeRange, parse_date, parse_recurrence_days,
};

fn date(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

fn weekday_template() -> AvailabilityTemplate {
    let mut template: AvailabilityTemplate = AvailabilityTemplate::new(
        7,
        "Weekday mornings",
        RecurrencePattern::Weekly,
        parse_recurrence_days("mon,tue,wed,thu,fri").unwrap(),
        TimeRange::parse("09:00", "12:00").unwrap(),
        date("2024-11-01"),
        None,
    )
    .unwrap();
    template.template_id = Some(3);
    template
}

fn window(start: &str, end: &str) -> ExpansionWindow {
    ExpansionWindow::resolve(
        date("2000-01-01"),
        &ExpansionRequest {
            start_date: Some(date(start)),
            end_date: Some(date(end)),
            ..ExpansionRequest::default()
        },
    )
    .unwrap()
}

#[test]
fn test_window_defaults_to_seven_days_from_today() {
    let resolved: ExpansionWindow =
        ExpansionWindow::resolve(date("2024-11-11"), &ExpansionRequest::default()).unwrap();
    assert_eq!(resolved.start(), date("2024-11-11"));
    assert_eq!(resolved.end(), date("2024-11-17"));
    assert_eq!(resolved.dates().count(), 7);
}

#[test]
fn test_window_day_count_has_minimum_of_one() {
    let resolved: ExpansionWindow = ExpansionWindow::resolve(
        date("2024-11-11"),
        &ExpansionRequest {
            days: Some(0),
            ..ExpansionRequest::default()
        },
    )
    .unwrap();
    assert_eq!(resolved.start(), resolved.end());
}

#[test]
fn test_window_end_before_start_is_clamped() {
    let resolved: ExpansionWindow = window("2024-11-15", "2024-11-10");
    assert_eq!(resolved.end(), date("2024-11-15"));
    assert_eq!(resolved.dates().count(), 1);
}

#[test]
fn test_plan_creates_slots_on_firing_dates_only() {
    // 2024-11-11 is a Monday; the window covers Mon..Sun.
    let plan: TemplatePlan = plan_template(
        &weekday_template(),
        &window("2024-11-11", "2024-11-17"),
        &[],
        &[],
    );

    assert_eq!(plan.considered_dates, 5);
    assert_eq!(plan.slots.len(), 5);
    let first: &AvailabilitySlot = &plan.slots[0];
    assert_eq!(first.status, SlotStatus::Available);
    assert_eq!(first.template_id, Some(3));
    assert!(!first.is_manual);
    assert_eq!(
        first.notes.as_deref(),
        Some("Auto-generated from template Weekday mornings")
    );
}

#[test]
fn test_plan_skips_leave_days() {
    let leave: LeaveRecord = LeaveRecord::new(
        7,
        LeaveType::Vacation,
        date("2024-11-12"),
        date("2024-11-13"),
        None,
    )
    .unwrap();

    let plan: TemplatePlan = plan_template(
        &weekday_template(),
        &window("2024-11-11", "2024-11-15"),
        &[],
        &[leave],
    );

    assert_eq!(plan.skipped_leave, 2);
    assert_eq!(plan.slots.len(), 3);
}

#[test]
fn test_plan_skips_overlapping_slots_of_any_status() {
    let mut cancelled: AvailabilitySlot = AvailabilitySlot::new_manual(
        7,
        date("2024-11-11"),
        TimeRange::parse("11:30", "13:00").unwrap(),
    );
    cancelled.status = SlotStatus::Cancelled;
    cancelled.slot_id = Some(70);

    let plan: TemplatePlan = plan_template(
        &weekday_template(),
        &window("2024-11-11", "2024-11-12"),
        &[cancelled],
        &[],
    );

    assert_eq!(plan.skipped_existing, 1);
    assert_eq!(plan.slots.len(), 1);
    assert_eq!(plan.slots[0].slot_date, date("2024-11-12"));
}

#[test]
fn test_second_plan_over_same_window_creates_nothing() {
    let template: AvailabilityTemplate = weekday_template();
    let span: ExpansionWindow = window("2024-11-11", "2024-11-17");
    let first: TemplatePlan = plan_template(&template, &span, &[], &[]);

    let second: TemplatePlan = plan_template(&template, &span, &first.slots, &[]);

    assert!(second.slots.is_empty());
    assert_eq!(second.skipped_existing, 5);
}

#[test]
fn test_request_filters() {
    let template: AvailabilityTemplate = weekday_template();
    assert!(ExpansionRequest::default().selects(&template));
    let other_doctor: ExpansionRequest = ExpansionRequest {
        doctor_ids: vec![8],
        ..ExpansionRequest::default()
    };
    assert!(!other_doctor.selects(&template));
    let this_template: ExpansionRequest = ExpansionRequest {
        template_ids: vec![3],
        ..ExpansionRequest::default()
    };
    assert!(this_template.selects(&template));
}

#[test]
fn test_summary_totals() {
    let template: AvailabilityTemplate = weekday_template();
    let mut summary: ExpansionSummary = ExpansionSummary::new(&window("2024-11-11", "2024-11-17"));

    let mut report: TemplateExpansionReport = TemplateExpansionReport::new(&template);
    report.created = 4;
    summary.record(report);

    let mut failed: TemplateExpansionReport = TemplateExpansionReport::new(&template);
    failed.error = Some(String::from("storage unavailable"));
    summary.record(failed);

    assert_eq!(summary.templates_processed, 2);
    assert_eq!(summary.slots_created, 4);
    assert_eq!(summary.start_date, "2024-11-11");
    assert_eq!(summary.end_date, "2024-11-17");
}
