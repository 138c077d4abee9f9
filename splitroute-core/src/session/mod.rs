pub mod enforcer;
pub mod interception;
pub mod plugin;
pub mod scheduler;
