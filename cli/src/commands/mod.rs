mod auth;
mod catalog;
mod helpers;
mod import;
mod log;
mod plan;
mod profile;
mod summary;

pub(crate) use auth::{cmd_login, cmd_logout, cmd_register, cmd_reload, cmd_whoami};
pub(crate) use catalog::{cmd_foods, cmd_goals};
pub(crate) use helpers::open_service;
pub(crate) use import::cmd_import;
pub(crate) use log::{cmd_log_add, cmd_log_exercise, cmd_log_plan, cmd_log_remove, cmd_log_show};
pub(crate) use plan::{cmd_plan_generate, cmd_plan_show};
pub(crate) use profile::{cmd_profile_history, cmd_profile_set, cmd_profile_show};
pub(crate) use summary::{cmd_history, cmd_summary};
