pub mod auth;
pub mod referral;
pub mod tasks;
pub mod users;
pub mod webhook;
