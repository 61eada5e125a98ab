//! # Course Links Bot
//!
//! A Telegram bot that searches a catalog of course links stored in
//! PostgreSQL, remembers each user's searches and favorites, and exposes a
//! small health check endpoint for hosting platforms.

pub mod bot;
pub mod config;
pub mod config_errors;
pub mod course_model;
pub mod db;
pub mod health;
pub mod lifecycle;
pub mod localization;
pub mod query;
