pub mod config;
pub mod postpone;
pub mod run;
pub mod simulate;
