pub mod api;
pub mod config;
pub mod entities;
pub mod gateways;
pub mod handlers;
pub mod permissions;
pub mod ratelimit;
pub mod repositories;
pub mod state;
