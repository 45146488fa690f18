// Library root
// -----------
// Client for an Open Notebook backend. The binary (`main.rs`) parses
// arguments and hands off to `cli`; everything else is usable as a
// library.
//
// Module responsibilities:
// - `transport`: the HTTP collaborator (auth header, status mapping).
// - `api`: one typed method per backend endpoint.
// - `resolve`: name-or-ID references to backend IDs, default model choice.
// - `dispatch`: submitting work that may finish inline or as a job.
// - `poll`: following a job until it reaches a terminal status.
// - `ui`: rendering records and job progress for the terminal.
pub mod api;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod poll;
pub mod resolve;
pub mod transport;
pub mod ui;

pub use api::ApiClient;
pub use config::Config;
pub use error::{Error, Result};
