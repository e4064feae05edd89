pub mod dashboard;
pub mod device_detail;
pub mod devices;
pub mod firmware;
pub mod login;
pub mod not_found;
pub mod organisations;
pub mod profile_devices;
pub mod profiles;
pub mod users;
