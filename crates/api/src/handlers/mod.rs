pub mod callback;
pub mod tasks;
