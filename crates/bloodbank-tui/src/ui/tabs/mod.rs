pub mod dashboard;
pub mod register;
