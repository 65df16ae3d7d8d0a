mod common;

use actix_web::{App, http::StatusCode, test, web};
use chrono::Duration;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use uuid::Uuid;

use clinic_roster::config::StoreKind;
use clinic_roster::middleware::RequestId;
use clinic_roster::services::{Actor, Claims, LeavePolicy};
use clinic_roster::{Config, routes};

use common::TestClinic;

macro_rules! clinic_app {
    ($clinic:expr, $config:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($clinic.state.clone()))
                .app_data(web::Data::new($config.clone()))
                .wrap(RequestId)
                .configure(routes::configure),
        )
        .await
    };
}

fn test_config() -> Config {
    Config {
        database_url: "postgres://@localhost:5432/clinic_roster_test".to_string(),
        jwt_secret: "api-test-secret".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        client_base_url: "http://localhost:3000".to_string(),
        store: StoreKind::Memory,
        leave_blocks_booked_slots: true,
    }
}

fn bearer(actor: &Actor, config: &Config) -> (&'static str, String) {
    let token = Claims::new(actor.id, actor.role, Duration::hours(1))
        .encode(&config.jwt_secret)
        .unwrap();
    ("Authorization", format!("Bearer {}", token))
}

fn clinic_body() -> Value {
    json!({
        "title": "Outpatient clinic",
        "startTime": "09:00",
        "endTime": "17:00",
        "daysOfWeek": ["mon", "tue", "wed", "thu", "fri"],
        "maxPatientsPerHour": 2,
        "slotDuration": 30,
        "department": "Cardiology",
        "breakStart": "12:00",
        "breakEnd": "13:00"
    })
}

#[actix_web::test]
async fn health_is_public_and_tagged() {
    let clinic = TestClinic::new().await;
    let config = test_config();
    let app = clinic_app!(clinic, config);

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("X-Correlation-ID", "trace-42"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-correlation-id").unwrap(),
        "trace-42"
    );
}

#[actix_web::test]
async fn requests_without_a_valid_token_are_unauthorized() {
    let clinic = TestClinic::new().await;
    let config = test_config();
    let app = clinic_app!(clinic, config);

    let req = test::TestRequest::get().uri("/api/v1/shifts").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let forged = Claims::new(Uuid::new_v4(), clinic.admin.role, Duration::hours(1))
        .encode("some-other-secret")
        .unwrap();
    let req = test::TestRequest::get()
        .uri("/api/v1/shifts")
        .insert_header(("Authorization", format!("Bearer {}", forged)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn shift_creation_reports_the_offending_field() {
    let clinic = TestClinic::new().await;
    let config = test_config();
    let doctor = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let app = clinic_app!(clinic, config);

    let req = test::TestRequest::post()
        .uri("/api/v1/shifts")
        .insert_header(bearer(&doctor, &config))
        .set_json(clinic_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["staffId"], doctor.id.to_string());
    assert_eq!(body["data"]["isActive"], true);

    let mut invalid = clinic_body();
    invalid["endTime"] = json!("08:00");
    invalid["breakStart"] = Value::Null;
    invalid["breakEnd"] = Value::Null;
    let req = test::TestRequest::post()
        .uri("/api/v1/shifts")
        .insert_header(bearer(&doctor, &config))
        .set_json(invalid)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"], "endTime");

    let req = test::TestRequest::post()
        .uri("/api/v1/shifts")
        .insert_header(bearer(&doctor, &config))
        .set_json(json!({ "title": 5 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn booked_clinic_survives_a_cancelled_sick_day() {
    let clinic = TestClinic::with_policy(LeavePolicy {
        block_booked_slots: true,
    })
    .await;
    let config = test_config();
    let doctor = clinic.staff("Dr. Adams", "Cardiology", None).await;
    let shift = clinic.shift(&doctor, common::weekday_clinic()).await;
    let app = clinic_app!(clinic, config);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/shifts/{}/slots", shift.id))
        .insert_header(bearer(&doctor, &config))
        .set_json(json!({ "date": "2030-03-04" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let slots = body["data"].as_array().unwrap();
    assert_eq!(slots.len(), 14);
    assert_eq!(slots[0]["startTime"], "09:00:00");
    let nine = slots[0]["id"].as_str().unwrap().to_string();

    let appointment = Uuid::new_v4();
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/slots/{}/book", nine))
        .insert_header(bearer(&doctor, &config))
        .set_json(json!({ "appointmentId": appointment }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["isAvailable"], false);

    let req = test::TestRequest::post()
        .uri("/api/v1/leave")
        .insert_header(bearer(&doctor, &config))
        .set_json(json!({
            "leaveType": "sick",
            "startDate": "2030-03-04",
            "endDate": "2030-03-04",
            "reason": "Flu"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let leave_id = body["data"]["id"].as_str().unwrap().to_string();

    // Staff cannot approve their own leave
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/leave/{}/process", leave_id))
        .insert_header(bearer(&doctor, &config))
        .set_json(json!({ "decision": "approved" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/leave/{}/process", leave_id))
        .insert_header(bearer(&clinic.admin, &config))
        .set_json(json!({ "decision": "approved" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["request"]["status"], "approved");

    let slots_uri = format!(
        "/api/v1/slots?doctorId={}&date=2030-03-04",
        doctor.id
    );
    let req = test::TestRequest::get()
        .uri(&slots_uri)
        .insert_header(bearer(&doctor, &config))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let slots = body["data"].as_array().unwrap();
    assert!(slots.iter().all(|slot| slot["isBlocked"] == true));
    assert!(slots.iter().all(|slot| slot["blockReason"] == "sick leave"));
    assert_eq!(slots[0]["appointmentIds"], json!([appointment]));

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/slots/{}/book", slots[1]["id"].as_str().unwrap()))
        .insert_header(bearer(&doctor, &config))
        .set_json(json!({ "appointmentId": Uuid::new_v4() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/leave/{}/cancel", leave_id))
        .insert_header(bearer(&doctor, &config))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&slots_uri)
        .insert_header(bearer(&doctor, &config))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let slots = body["data"].as_array().unwrap();
    assert!(slots.iter().all(|slot| slot["isBlocked"] == false));
    for slot in slots {
        assert_eq!(slot["isAvailable"], slot["id"] != nine.as_str());
    }

    // Approval and cancellation both reached the recipients
    let recipients = clinic.sink.recipients().await;
    assert!(recipients.contains(&clinic.admin.id));
    assert!(recipients.contains(&doctor.id));
}
