pub mod admin;
pub mod audit;
pub mod class;
pub mod course;
pub mod invoice;
pub mod login_attempt;
pub mod permission;
pub mod professor;
pub mod public_id;
pub mod report;
pub mod salary;
pub mod settings;
pub mod student;
pub mod token;
