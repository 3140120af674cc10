//! Database models and DTOs for all domain entities.

pub mod billing;
pub mod club;
pub mod locale;
pub mod notification;
pub mod pagination;
pub mod reservation;
pub mod sport;
pub mod stadium;
pub mod user;
