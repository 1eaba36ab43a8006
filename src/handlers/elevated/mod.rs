// Admin-role handlers
pub mod modules;
