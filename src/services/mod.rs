//! Business logic services.

pub mod auth;
pub mod club;
pub mod dashboard;
pub mod date_range;
pub mod notification;
pub mod payment;
pub mod reservation;
pub mod series;
pub mod sport;
pub mod stadium;
pub mod user;
