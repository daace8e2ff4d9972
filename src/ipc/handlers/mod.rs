pub mod attendance;
pub mod classes;
pub mod core;
pub mod grades;
pub mod quiz;
pub mod schedule;
pub mod sections;
pub mod setup;
pub mod students;
