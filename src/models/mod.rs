pub mod boa_settings;
pub mod contribution;
pub mod event;
pub mod event_setting;
pub mod file;
pub mod permission;
pub mod user;
