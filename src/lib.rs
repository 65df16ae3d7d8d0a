pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;
pub use database::repositories::Repositories;
pub use error::AppError;

use services::{
    LeaveCoordinator, LeavePolicy, Notifier, OvertimeCoordinator, ShiftRegistry, SlotGenerator,
    SlotService, SwapCoordinator,
};

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub shifts: ShiftRegistry,
    pub generator: SlotGenerator,
    pub slots: SlotService,
    pub leave: LeaveCoordinator,
    pub overtime: OvertimeCoordinator,
    pub swaps: SwapCoordinator,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(repos: Repositories, policy: LeavePolicy, notifier: Notifier) -> Self {
        let leave = LeaveCoordinator::new(
            repos.leave.clone(),
            repos.slots.clone(),
            repos.staff.clone(),
            policy,
        );
        Self {
            shifts: ShiftRegistry::new(repos.shifts.clone(), repos.slots.clone()),
            generator: SlotGenerator::new(repos.shifts.clone(), repos.slots.clone()),
            slots: SlotService::new(repos.slots.clone()),
            overtime: OvertimeCoordinator::new(
                repos.overtime.clone(),
                repos.shifts.clone(),
                repos.slots.clone(),
            ),
            swaps: SwapCoordinator::new(
                repos.swaps.clone(),
                repos.shifts.clone(),
                repos.slots.clone(),
                repos.staff.clone(),
                leave.clone(),
            ),
            leave,
            notifier,
        }
    }
}
