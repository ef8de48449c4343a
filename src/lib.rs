pub mod api; // HTTP surface for the patient/doctor/admin clients
pub mod config;
pub mod db;
pub mod lifecycle; // Request state machine: create / approve / reject / delete
pub mod models;
pub mod pdf; // Document generator for approved requests
