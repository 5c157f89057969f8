//! # Bridge Server
//!
//! HTTP surface of the translation bridge: an Anthropic-Messages-API
//! endpoint in front of an OpenAI-style backend.
//!
//! The request pipeline per `POST /v1/messages`: validate, consult the
//! response cache, convert, call the backend under the retry policy,
//! convert back, run the tool pass, store in the cache, respond. The
//! streaming path converts backend chunks into the Messages event sequence
//! over SSE.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use server::serve;
pub use state::{AppState, AppStateBuilder};
