//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! together with the request and response bodies of the API.

/// Facility bookings
pub mod booking;
/// Change feed and query-key invalidation table
pub mod change;
/// Clubs and memberships
pub mod club;
/// Announcements and notifications
pub mod communication;
/// Calendar events
pub mod event;
/// Facilities
pub mod facility;
/// Finance ledger
pub mod finance;
/// Club invitations
pub mod invitation;
/// Roster members
pub mod member;
/// Subscription plans
pub mod plan;
/// Teams and team rosters
pub mod team;
/// Users and access tokens
pub mod user;
