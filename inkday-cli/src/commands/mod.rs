pub mod agenda;
pub mod once;
pub mod run;
