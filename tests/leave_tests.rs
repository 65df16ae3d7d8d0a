mod common;

use chrono::NaiveTime;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use clinic_roster::AppError;
use clinic_roster::database::models::{
    LeaveDecision, LeaveRequestInput, LeaveStatus, LeaveType, TimeSlot,
};
use clinic_roster::services::LeavePolicy;

use common::{TestClinic, date, monday, tuesday, weekday_clinic};

fn sick_day(on: chrono::NaiveDate) -> LeaveRequestInput {
    LeaveRequestInput {
        leave_type: LeaveType::Sick,
        start_date: on,
        end_date: on,
        reason: "Flu".to_string(),
        is_emergency: false,
    }
}

fn vacation(start: &str, end: &str) -> LeaveRequestInput {
    LeaveRequestInput {
        leave_type: LeaveType::Vacation,
        start_date: date(start),
        end_date: date(end),
        reason: "Family trip".to_string(),
        is_emergency: false,
    }
}

fn at(slots: &[TimeSlot], hour: u32, minute: u32) -> &TimeSlot {
    let start = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();
    slots.iter().find(|slot| slot.start_time == start).unwrap()
}

#[tokio::test]
async fn submission_validates_and_notifies_admins() {
    let clinic = TestClinic::new().await;
    let doctor = clinic.staff("Dr. Adams", "Cardiology", None).await;

    let backwards = vacation("2030-03-08", "2030-03-04");
    assert!(matches!(
        clinic.state.leave.submit(&doctor, backwards).await,
        Err(AppError::Validation { .. })
    ));

    let outcome = clinic
        .state
        .leave
        .submit(&doctor, vacation("2030-03-04", "2030-03-08"))
        .await
        .unwrap();
    assert_eq!(outcome.value.status, LeaveStatus::Pending);
    let request = clinic.state.notifier.deliver(outcome).await;

    assert_eq!(request.staff_id, doctor.id);
    assert_eq!(clinic.sink.recipients().await, vec![clinic.admin.id]);
}

#[tokio::test]
async fn overlapping_requests_are_rejected_while_one_holds_the_dates() {
    let clinic = TestClinic::new().await;
    let doctor = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let colleague = clinic.staff("Dr. Baker", "Cardiology", None).await;

    let first = clinic
        .state
        .leave
        .submit(&doctor, vacation("2030-03-04", "2030-03-06"))
        .await
        .unwrap()
        .value;

    let clash = clinic.state.leave.submit(&doctor, sick_day(tuesday())).await;
    assert!(matches!(clash, Err(AppError::BusinessRule(_))));

    // Other staff and adjacent dates are unaffected
    clinic
        .state
        .leave
        .submit(&colleague, sick_day(tuesday()))
        .await
        .unwrap();
    clinic
        .state
        .leave
        .submit(&doctor, sick_day(date("2030-03-07")))
        .await
        .unwrap();

    // A rejected request releases its dates
    clinic
        .state
        .leave
        .process(
            &clinic.admin,
            first.id,
            LeaveDecision::Reject {
                reason: Some("Short staffed".to_string()),
            },
        )
        .await
        .unwrap();
    clinic
        .state
        .leave
        .submit(&doctor, sick_day(tuesday()))
        .await
        .unwrap();
}

#[tokio::test]
async fn only_admins_process_and_only_once() {
    let clinic = TestClinic::new().await;
    let doctor = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let request = clinic
        .state
        .leave
        .submit(&doctor, sick_day(monday()))
        .await
        .unwrap()
        .value;

    let denied = clinic
        .state
        .leave
        .process(&doctor, request.id, LeaveDecision::Approve)
        .await;
    assert!(matches!(denied, Err(AppError::PermissionDenied(_))));

    let outcome = clinic
        .state
        .leave
        .process(&clinic.admin, request.id, LeaveDecision::Approve)
        .await
        .unwrap();
    assert_eq!(outcome.value.request.status, LeaveStatus::Approved);
    assert_eq!(outcome.value.request.approver_id, Some(clinic.admin.id));
    assert_eq!(outcome.notifications.len(), 1);
    assert_eq!(outcome.notifications[0].recipient_id, doctor.id);

    let again = clinic
        .state
        .leave
        .process(
            &clinic.admin,
            request.id,
            LeaveDecision::Reject { reason: None },
        )
        .await;
    assert!(matches!(again, Err(AppError::BusinessRule(_))));
}

#[tokio::test]
async fn approval_leaves_booked_slots_open_by_default() {
    let clinic = TestClinic::new().await;
    let doctor = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let shift = clinic.shift(&doctor, weekday_clinic()).await;
    let slots = clinic
        .state
        .generator
        .generate_for_shift(shift.id, monday())
        .await
        .unwrap();
    let booked_id = at(&slots, 9, 0).id;
    clinic.state.slots.book(booked_id, Uuid::new_v4()).await.unwrap();

    let request = clinic
        .state
        .leave
        .submit(&doctor, sick_day(monday()))
        .await
        .unwrap()
        .value;
    let processed = clinic
        .state
        .leave
        .process(&clinic.admin, request.id, LeaveDecision::Approve)
        .await
        .unwrap()
        .value;

    assert_eq!(processed.blocked_slots.len(), 1);
    assert_eq!(processed.blocked_slots[0].blocked, 13);
    assert_eq!(processed.blocked_slots[0].skipped_booked, vec![booked_id]);

    let after = clinic
        .state
        .slots
        .list_for_doctor(doctor.id, monday())
        .await
        .unwrap();
    for slot in &after {
        if slot.id == booked_id {
            assert!(!slot.is_blocked);
            assert_eq!(slot.booked_count, 1);
        } else {
            assert!(slot.is_blocked_for("sick leave"));
        }
    }
}

#[tokio::test]
async fn cancelling_approved_leave_only_unblocks_its_own_blocks() {
    let clinic = TestClinic::new().await;
    let doctor = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let shift = clinic.shift(&doctor, weekday_clinic()).await;
    let slots = clinic
        .state
        .generator
        .generate_for_shift(shift.id, monday())
        .await
        .unwrap();
    let ward_round = at(&slots, 16, 30).id;
    clinic
        .state
        .slots
        .toggle_block(&doctor, ward_round, true, Some("Ward round".to_string()))
        .await
        .unwrap();

    let request = clinic
        .state
        .leave
        .submit(&doctor, vacation("2030-03-04", "2030-03-05"))
        .await
        .unwrap()
        .value;
    let processed = clinic
        .state
        .leave
        .process(&clinic.admin, request.id, LeaveDecision::Approve)
        .await
        .unwrap()
        .value;
    // Tuesday has no generated slots yet
    assert_eq!(processed.blocked_slots.len(), 2);
    assert_eq!(processed.blocked_slots[1].blocked, 0);

    let outsider = clinic.staff("Dr. Baker", "Cardiology", None).await;
    assert!(matches!(
        clinic.state.leave.cancel(&outsider, request.id, None).await,
        Err(AppError::PermissionDenied(_))
    ));

    let outcome = clinic
        .state
        .leave
        .cancel(&doctor, request.id, Some("Trip postponed".to_string()))
        .await
        .unwrap();
    // The approver hears about the cancellation
    assert_eq!(outcome.notifications[0].recipient_id, clinic.admin.id);
    let cancelled = outcome.value;
    assert_eq!(cancelled.request.status, LeaveStatus::Cancelled);
    assert_eq!(cancelled.request.cancelled_by, Some(doctor.id));
    assert_eq!(cancelled.unblocked_slots[0].affected, 13);

    let after = clinic
        .state
        .slots
        .list_for_doctor(doctor.id, monday())
        .await
        .unwrap();
    assert!(at(&after, 16, 30).is_blocked_for("Ward round"));
    assert_eq!(after.iter().filter(|slot| slot.is_blocked).count(), 1);

    assert!(matches!(
        clinic.state.leave.cancel(&doctor, request.id, None).await,
        Err(AppError::BusinessRule(_))
    ));
}

#[tokio::test]
async fn rejected_requests_cannot_be_cancelled() {
    let clinic = TestClinic::new().await;
    let doctor = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let request = clinic
        .state
        .leave
        .submit(&doctor, sick_day(monday()))
        .await
        .unwrap()
        .value;
    clinic
        .state
        .leave
        .process(
            &clinic.admin,
            request.id,
            LeaveDecision::Reject { reason: None },
        )
        .await
        .unwrap();

    let result = clinic.state.leave.cancel(&clinic.admin, request.id, None).await;
    assert!(matches!(result, Err(AppError::BusinessRule(_))));
}

#[tokio::test]
async fn staff_only_list_their_own_requests() {
    let clinic = TestClinic::new().await;
    let adams = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let baker = clinic.staff("Dr. Baker", "Cardiology", None).await;
    clinic.state.leave.submit(&adams, sick_day(monday())).await.unwrap();
    let theirs = clinic
        .state
        .leave
        .submit(&baker, sick_day(monday()))
        .await
        .unwrap()
        .value;

    let own = clinic.state.leave.list(&adams, Some(baker.id), None).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].staff_id, adams.id);

    let all = clinic.state.leave.list(&clinic.admin, None, None).await.unwrap();
    assert_eq!(all.len(), 2);
    let approved = clinic
        .state
        .leave
        .list(&clinic.admin, None, Some(LeaveStatus::Approved))
        .await
        .unwrap();
    assert!(approved.is_empty());

    assert!(matches!(
        clinic.state.leave.get(&adams, theirs.id).await,
        Err(AppError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn sick_day_blocks_and_releases_a_booked_clinic() {
    let clinic = TestClinic::with_policy(LeavePolicy {
        block_booked_slots: true,
    })
    .await;
    let doctor = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let shift = clinic.shift(&doctor, weekday_clinic()).await;
    let slots = clinic
        .state
        .generator
        .generate_for_shift(shift.id, monday())
        .await
        .unwrap();

    let appointment = Uuid::new_v4();
    let nine = at(&slots, 9, 0).id;
    let booked = clinic.state.slots.book(nine, appointment).await.unwrap();
    assert_eq!(booked.booked_count, booked.max_patients);
    assert!(!booked.is_available);

    let request = clinic
        .state
        .leave
        .submit(&doctor, sick_day(monday()))
        .await
        .unwrap()
        .value;
    let processed = clinic
        .state
        .leave
        .process(&clinic.admin, request.id, LeaveDecision::Approve)
        .await
        .unwrap()
        .value;
    assert_eq!(processed.blocked_slots[0].blocked, 14);
    assert!(processed.blocked_slots[0].skipped_booked.is_empty());

    let during = clinic
        .state
        .slots
        .list_for_doctor(doctor.id, monday())
        .await
        .unwrap();
    assert!(during.iter().all(|slot| slot.is_blocked && !slot.is_available));
    assert_eq!(at(&during, 9, 0).appointment_ids, vec![appointment]);

    clinic
        .state
        .leave
        .cancel(&doctor, request.id, None)
        .await
        .unwrap();

    let after = clinic
        .state
        .slots
        .list_for_doctor(doctor.id, monday())
        .await
        .unwrap();
    assert!(after.iter().all(|slot| !slot.is_blocked));
    for slot in &after {
        assert_eq!(slot.is_available, slot.id != nine);
    }
    assert_eq!(at(&after, 9, 0).appointment_ids, vec![appointment]);
}
