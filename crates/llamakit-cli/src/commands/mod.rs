pub mod clean;
pub mod doctor;
pub mod install;
pub mod list;
pub mod update;
