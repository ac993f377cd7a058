pub mod db;
pub mod referraldb;
pub mod taskdb;
pub mod userdb;

pub use referraldb::ReferralExt;
pub use taskdb::TaskExt;
pub use userdb::UserExt;
