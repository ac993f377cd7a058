pub mod error;
pub mod referral;
pub mod task;
pub mod webhook;
