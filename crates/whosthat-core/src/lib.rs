// Domain types, persistence, and configuration for the guessing game.

pub mod config;
pub mod db;
pub mod entity;
pub mod protocol;
pub mod score;
pub mod store;
