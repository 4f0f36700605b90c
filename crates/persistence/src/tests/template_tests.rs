// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for template storage and expansion into slots.

use chrono::Weekday;
use consult_sched::{ExpansionRequest, ExpansionSummary, generated_slot_note};
use consult_sched_domain::{
    AvailabilitySlot, AvailabilityTemplate, LeaveRecord, LeaveType, RecurrencePattern, SlotStatus,
};

use crate::tests::{DOCTOR_ID, date, range, test_config, test_now};
use crate::{Persistence, PersistenceError};

fn create_clinic_template(persistence: &mut Persistence) -> AvailabilityTemplate {
    let template: AvailabilityTemplate = AvailabilityTemplate::new(
        DOCTOR_ID,
        "Morning clinic",
        RecurrencePattern::Weekly,
        vec![Weekday::Mon, Weekday::Wed, Weekday::Fri],
        range("09:00", "12:00"),
        date("2024-11-01"),
        None,
    )
    .unwrap();
    persistence.create_template(template, test_now()).unwrap()
}

/// Monday 2024-11-04 through Sunday 2024-11-10.
fn first_full_week() -> ExpansionRequest {
    ExpansionRequest {
        start_date: Some(date("2024-11-04")),
        end_date: Some(date("2024-11-10")),
        ..ExpansionRequest::default()
    }
}

fn expand(persistence: &mut Persistence, request: &ExpansionRequest) -> ExpansionSummary {
    persistence
        .expand_templates(&test_config(), request, test_now())
        .unwrap()
}

#[test]
fn test_template_round_trips_through_storage() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    let template: AvailabilityTemplate = create_clinic_template(&mut persistence);

    let stored: AvailabilityTemplate = persistence.get_template(template.id()).unwrap();

    assert_eq!(stored, template);
}

#[test]
fn test_expansion_creates_one_slot_per_firing_date() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    let template: AvailabilityTemplate = create_clinic_template(&mut persistence);

    let summary: ExpansionSummary = expand(&mut persistence, &first_full_week());

    assert_eq!(summary.start_date, "2024-11-04");
    assert_eq!(summary.end_date, "2024-11-10");
    assert_eq!(summary.templates_processed, 1);
    assert_eq!(summary.slots_created, 3);
    assert_eq!(summary.templates[0].considered_dates, 3);

    let monday: Vec<AvailabilitySlot> = persistence
        .list_slots(DOCTOR_ID, date("2024-11-04"))
        .unwrap();
    assert_eq!(monday.len(), 1);
    assert_eq!(monday[0].template_id, template.template_id);
    assert_eq!(monday[0].status, SlotStatus::Available);
    assert!(!monday[0].is_manual);
    assert_eq!(
        monday[0].notes.as_deref(),
        Some(generated_slot_note("Morning clinic").as_str())
    );
    assert!(
        persistence
            .list_slots(DOCTOR_ID, date("2024-11-05"))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_repeated_expansion_creates_nothing_new() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    create_clinic_template(&mut persistence);
    expand(&mut persistence, &first_full_week());

    let again: ExpansionSummary = expand(&mut persistence, &first_full_week());

    assert_eq!(again.slots_created, 0);
    assert_eq!(again.templates[0].skipped_existing, 3);
}

#[test]
fn test_leave_and_manual_slots_are_skipped() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    create_clinic_template(&mut persistence);
    persistence
        .record_leave(
            LeaveRecord::new(
                DOCTOR_ID,
                LeaveType::Personal,
                date("2024-11-06"),
                date("2024-11-06"),
                None,
            )
            .unwrap(),
            test_now(),
        )
        .unwrap();
    persistence
        .create_slot(
            AvailabilitySlot::new_manual(DOCTOR_ID, date("2024-11-08"), range("11:00", "13:00")),
            test_now(),
        )
        .unwrap();

    let summary: ExpansionSummary = expand(&mut persistence, &first_full_week());

    assert_eq!(summary.slots_created, 1);
    assert_eq!(summary.templates[0].skipped_leave, 1);
    assert_eq!(summary.templates[0].skipped_existing, 1);
    assert!(
        persistence
            .list_slots(DOCTOR_ID, date("2024-11-06"))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_deactivated_template_is_not_expanded() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    let template: AvailabilityTemplate = create_clinic_template(&mut persistence);

    let deactivated: AvailabilityTemplate =
        persistence.deactivate_template(template.id()).unwrap();
    assert!(!deactivated.is_active);

    let summary: ExpansionSummary = expand(&mut persistence, &first_full_week());
    assert_eq!(summary.templates_processed, 0);
    assert_eq!(summary.slots_created, 0);
}

#[test]
fn test_deactivating_missing_template_is_not_found() {
    let mut persistence = Persistence::new_in_memory().unwrap();

    assert!(matches!(
        persistence.deactivate_template(77),
        Err(PersistenceError::NotFound(_))
    ));
}

#[test]
fn test_doctor_filter_excludes_other_doctors() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    create_clinic_template(&mut persistence);
    let request: ExpansionRequest = ExpansionRequest {
        doctor_ids: vec![DOCTOR_ID + 1],
        ..first_full_week()
    };

    let summary: ExpansionSummary = expand(&mut persistence, &request);

    assert_eq!(summary.templates_processed, 0);
}

#[test]
fn test_default_window_starts_today() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    create_clinic_template(&mut persistence);

    // The clock reads Friday 2024-11-01; seven days run through Thursday.
    let summary: ExpansionSummary = expand(&mut persistence, &ExpansionRequest::default());

    assert_eq!(summary.start_date, "2024-11-01");
    assert_eq!(summary.end_date, "2024-11-07");
    assert_eq!(summary.slots_created, 3);
}
