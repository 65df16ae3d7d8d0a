pub mod auth;
pub mod leave_coordinator;
pub mod notifier;
pub mod overtime_coordinator;
pub mod shift_registry;
pub mod slot_generator;
pub mod slot_service;
pub mod swap_coordinator;

pub use auth::{Actor, Claims};
pub use leave_coordinator::{LeaveCancelled, LeaveCoordinator, LeavePolicy, LeaveProcessed};
pub use notifier::{
    LogNotificationSink, NotificationSink, Notifier, OutboxNotificationSink, Outcome,
};
pub use overtime_coordinator::{OvertimeCoordinator, OvertimeDecided};
pub use shift_registry::ShiftRegistry;
pub use slot_generator::SlotGenerator;
pub use slot_service::SlotService;
pub use swap_coordinator::{SwapCoordinator, SwapDecided};
