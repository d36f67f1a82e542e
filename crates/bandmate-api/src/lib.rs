pub mod auth;
pub mod error;
pub mod matches;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod users;

mod convert;
