pub mod referraldtos;
pub mod taskdtos;
pub mod userdtos;
