// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::DomainError;

#[test]
fn test_domain_error_display() {
    let err: DomainError = DomainError::QuotaExceeded { used: 5, limit: 5 };
    assert_eq!(
        format!("{err}"),
        "Monthly assignment limit reached: 5 of 5 used, 0 remaining"
    );

    let err: DomainError = DomainError::AssignmentAlreadyFinal {
        status: String::from("declined"),
    };
    assert_eq!(
        format!("{err}"),
        "Assignment is already final with status 'declined'"
    );

    let err: DomainError = DomainError::InvalidStatusTransition {
        from: String::from("pending"),
        to: String::from("completed"),
        reason: String::from("must be accepted before completion"),
    };
    assert_eq!(
        format!("{err}"),
        "Cannot transition from 'pending' to 'completed': must be accepted before completion"
    );

    let err: DomainError = DomainError::SlotOverlap {
        requested: String::from("10:00:00-11:00:00"),
        conflicting_slot_id: 42,
    };
    assert_eq!(
        format!("{err}"),
        "Requested range 10:00:00-11:00:00 overlaps slot 42"
    );

    let err: DomainError = DomainError::InvalidMonthKey(String::from("2024-13"));
    assert_eq!(
        format!("{err}"),
        "Invalid month key '2024-13': expected YYYY-MM"
    );

    let err: DomainError = DomainError::CancellationWindowClosed { notice_hours: 24 };
    assert_eq!(
        format!("{err}"),
        "Cancellation requires at least 24 hours notice before the slot starts"
    );
}
