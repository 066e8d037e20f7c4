//! HTTP request handlers.
//!
//! Club-scoped handlers resolve the caller's [`ClubAccess`](crate::permissions::ClubAccess),
//! check the permission the operation needs, then delegate to a service.

pub mod bookings;
pub mod clubs;
pub mod communication;
pub mod events;
pub mod facilities;
pub mod finances;
pub mod health;
pub mod me;
pub mod members;
pub mod subscriptions;
pub mod teams;
pub mod users;
