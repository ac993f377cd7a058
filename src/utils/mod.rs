pub mod password;
pub mod retry;
pub mod token;
