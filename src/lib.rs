//! Tire label print queue
//!
//! Server side: an in-memory job store that queues rendered tire labels for
//! remote printing, exposed over HTTP to print agents. Agent side: a polling
//! loop that downloads each label, saves it into a dated labels tree, prints
//! it when asked to, and reports the outcome back.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
pub mod shutdown;
