pub mod completion_services;
pub mod profile_services;
