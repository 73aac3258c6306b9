//! Foodgram - recipe sharing backend
//!
//! Users publish recipes, follow authors, keep favorites and a shopping cart,
//! and export the cart as an aggregated shopping list.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
