// src/services/mod.rs

pub mod auth_service;
pub mod notifier;
pub mod payment;
pub mod token_service;
