#![allow(dead_code)]

use std::env;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use uuid::Uuid;

use clinic_roster::database::models::{Notification, Role, Shift, ShiftInput, StaffProfile};
use clinic_roster::services::{Actor, LeavePolicy, NotificationSink, Notifier};
use clinic_roster::{AppState, Repositories};

pub fn setup_test_env() {
    unsafe {
        env::set_var("RUST_LOG", "debug");
    }
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Sink that keeps every delivered notification for assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        self.delivered.lock().await.push(notification.clone());
        Ok(())
    }
}

impl RecordingSink {
    pub async fn recipients(&self) -> Vec<Uuid> {
        self.delivered
            .lock()
            .await
            .iter()
            .map(|n| n.recipient_id)
            .collect()
    }
}

/// Services wired to a fresh in-memory store.
pub struct TestClinic {
    pub repos: Repositories,
    pub state: AppState,
    pub sink: Arc<RecordingSink>,
    pub admin: Actor,
}

impl TestClinic {
    pub async fn new() -> Self {
        Self::with_policy(LeavePolicy::default()).await
    }

    pub async fn with_policy(policy: LeavePolicy) -> Self {
        setup_test_env();
        let repos = Repositories::in_memory();
        let sink = Arc::new(RecordingSink::default());
        let state = AppState::new(repos.clone(), policy, Notifier::new(sink.clone()));

        let admin_id = Uuid::new_v4();
        repos
            .staff
            .upsert(&StaffProfile {
                id: admin_id,
                name: "Admin".to_string(),
                role: Role::Admin,
                department: "Administration".to_string(),
                specialization: None,
            })
            .await
            .unwrap();

        Self {
            repos,
            state,
            sink,
            admin: Actor::admin(admin_id),
        }
    }

    /// Registers a staff member in the directory.
    pub async fn staff(&self, name: &str, department: &str, specialization: Option<&str>) -> Actor {
        let id = Uuid::new_v4();
        self.repos
            .staff
            .upsert(&StaffProfile {
                id,
                name: name.to_string(),
                role: Role::Staff,
                department: department.to_string(),
                specialization: specialization.map(str::to_string),
            })
            .await
            .unwrap();
        Actor::staff(id)
    }

    pub async fn shift(&self, owner: &Actor, input: ShiftInput) -> Shift {
        self.state.shifts.create(owner, input).await.unwrap()
    }
}

pub fn shift_input(start: &str, end: &str, days: &[&str]) -> ShiftInput {
    ShiftInput {
        title: "Outpatient clinic".to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        days_of_week: days.iter().map(|d| d.to_string()).collect(),
        max_patients_per_hour: 2,
        slot_duration: 30,
        department: "General Medicine".to_string(),
        break_start: None,
        break_end: None,
    }
}

/// Mon-Fri 09:00-17:00, 30 minute slots, one patient each, lunch 12:00-13:00.
pub fn weekday_clinic() -> ShiftInput {
    ShiftInput {
        break_start: Some("12:00".to_string()),
        break_end: Some("13:00".to_string()),
        ..shift_input("09:00", "17:00", &["mon", "tue", "wed", "thu", "fri"])
    }
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

pub fn monday() -> NaiveDate {
    date("2030-03-04")
}

pub fn tuesday() -> NaiveDate {
    date("2030-03-05")
}
