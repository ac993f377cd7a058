pub mod referralmodel;
pub mod taskmodel;
pub mod usermodel;
