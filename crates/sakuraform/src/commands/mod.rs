pub mod internet;
pub mod nosql;
pub mod state;
pub mod subnet;
