pub mod profile_handlers;
