//! Core library for the NutriTrack calorie tracker: the metabolic
//! calculator, goal and food catalogs, the tabular store contract with
//! its in-memory and SQLite backends, and the session service that the
//! CLI and the HTTP server share.

pub mod calc;
pub mod csv_import;
pub mod db;
pub mod goals;
pub mod menu;
pub mod models;
pub mod service;
pub mod service_account;
pub mod sheet;
pub mod tabs;
