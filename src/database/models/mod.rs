pub mod date_set;
pub mod leave;
pub mod macros;
pub mod notification;
pub mod overtime;
pub mod shift;
pub mod staff;
pub mod swap;
pub mod time_slot;

// Re-export all models for easy importing
pub use date_set::*;
pub use leave::*;
pub use notification::*;
pub use overtime::*;
pub use shift::*;
pub use staff::*;
pub use swap::*;
pub use time_slot::*;
