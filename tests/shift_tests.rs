mod common;

use pretty_assertions::assert_eq;

use clinic_roster::AppError;
use clinic_roster::database::models::{ShiftInput, ShiftPatch};
use clinic_roster::services::shift_registry::SHIFT_DELETED_REASON;

use common::{TestClinic, date, monday, shift_input, weekday_clinic};

#[tokio::test]
async fn create_rejects_invalid_definitions() {
    let clinic = TestClinic::new().await;
    let doctor = clinic.staff("Dr. Adams", "Cardiology", None).await;

    let backwards = shift_input("17:00", "09:00", &["mon"]);
    let result = clinic.state.shifts.create(&doctor, backwards).await;
    assert!(matches!(result, Err(AppError::Validation { ref field, .. }) if field == "endTime"));

    let odd_duration = shift_input("09:00", "17:00", &["mon"]);
    let result = clinic
        .state
        .shifts
        .create(
            &doctor,
            ShiftInput {
                slot_duration: 20,
                ..odd_duration
            },
        )
        .await;
    assert!(
        matches!(result, Err(AppError::Validation { ref field, .. }) if field == "slotDuration")
    );

    let outside_break = ShiftInput {
        break_start: Some("08:00".to_string()),
        break_end: Some("09:30".to_string()),
        ..shift_input("09:00", "17:00", &["mon"])
    };
    assert!(clinic.state.shifts.create(&doctor, outside_break).await.is_err());

    let no_days = shift_input("09:00", "17:00", &[]);
    assert!(clinic.state.shifts.create(&doctor, no_days).await.is_err());
}

#[tokio::test]
async fn admins_cannot_own_shifts() {
    let clinic = TestClinic::new().await;
    let result = clinic.state.shifts.create(&clinic.admin, weekday_clinic()).await;
    assert!(matches!(result, Err(AppError::PermissionDenied(_))));
}

#[tokio::test]
async fn list_defaults_to_own_shifts_for_staff() {
    let clinic = TestClinic::new().await;
    let adams = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let baker = clinic.staff("Dr. Baker", "Cardiology", None).await;
    let own = clinic.shift(&adams, weekday_clinic()).await;
    clinic.shift(&baker, weekday_clinic()).await;

    let listed = clinic.state.shifts.list(&adams, None).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, own.id);

    let everything = clinic.state.shifts.list(&clinic.admin, None).await.unwrap();
    assert_eq!(everything.len(), 2);
}

#[tokio::test]
async fn only_the_owner_can_update() {
    let clinic = TestClinic::new().await;
    let adams = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let baker = clinic.staff("Dr. Baker", "Cardiology", None).await;
    let shift = clinic.shift(&adams, weekday_clinic()).await;

    let patch = ShiftPatch {
        title: Some("Evening clinic".to_string()),
        ..Default::default()
    };
    let denied = clinic.state.shifts.update(&baker, shift.id, patch.clone()).await;
    assert!(matches!(denied, Err(AppError::PermissionDenied(_))));
    let denied = clinic
        .state
        .shifts
        .update(&clinic.admin, shift.id, patch.clone())
        .await;
    assert!(matches!(denied, Err(AppError::PermissionDenied(_))));

    let updated = clinic.state.shifts.update(&adams, shift.id, patch).await.unwrap();
    assert_eq!(updated.title, "Evening clinic");
    assert_eq!(updated.break_window, shift.break_window);
}

#[tokio::test]
async fn update_revalidates_the_merged_definition() {
    let clinic = TestClinic::new().await;
    let adams = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let shift = clinic.shift(&adams, weekday_clinic()).await;

    // The existing 12:00-13:00 break no longer fits a morning-only shift
    let patch = ShiftPatch {
        end_time: Some("11:00".to_string()),
        ..Default::default()
    };
    assert!(clinic.state.shifts.update(&adams, shift.id, patch).await.is_err());

    let patch = ShiftPatch {
        end_time: Some("11:00".to_string()),
        clear_break: true,
        ..Default::default()
    };
    let updated = clinic.state.shifts.update(&adams, shift.id, patch).await.unwrap();
    assert_eq!(updated.break_window, None);
}

#[tokio::test]
async fn delete_blocks_future_slots_and_keeps_past_ones() {
    let clinic = TestClinic::new().await;
    let adams = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let shift = clinic.shift(&adams, weekday_clinic()).await;

    let past = date("2020-01-06");
    clinic.state.generator.generate_for_shift(shift.id, past).await.unwrap();
    clinic
        .state
        .generator
        .generate_for_shift(shift.id, monday())
        .await
        .unwrap();

    let deleted = clinic.state.shifts.delete(&adams, shift.id).await.unwrap();
    assert!(!deleted.is_active);

    let future = clinic.state.slots.list_for_doctor(adams.id, monday()).await.unwrap();
    assert_eq!(future.len(), 14);
    assert!(future.iter().all(|slot| slot.is_blocked_for(SHIFT_DELETED_REASON)));
    assert!(future.iter().all(|slot| !slot.is_available));

    let history = clinic.state.slots.list_for_doctor(adams.id, past).await.unwrap();
    assert!(history.iter().all(|slot| !slot.is_blocked));

    // Deleted shifts drop out of listings and refuse further changes
    assert!(clinic.state.shifts.list(&adams, None).await.unwrap().is_empty());
    assert!(matches!(
        clinic.state.shifts.delete(&adams, shift.id).await,
        Err(AppError::BusinessRule(_))
    ));
    assert!(matches!(
        clinic.state.generator.generate_for_shift(shift.id, monday()).await,
        Err(AppError::BusinessRule(_))
    ));
}
