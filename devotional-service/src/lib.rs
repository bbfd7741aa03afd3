//! Devotional Service - scheduled AI generation of daily passages and devotionals.

pub mod config;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod services;
pub mod startup;
