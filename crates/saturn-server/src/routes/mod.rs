pub mod account;
pub mod channels;
pub mod health;
pub mod incidents;
pub mod maintenance;
pub mod monitors;
pub mod ping;
pub mod robots;
