//! # Configuration Module
//!
//! Layered configuration for the gateway process:
//! - defaults compiled into [`Settings::load`]
//! - `config/default.toml` and `config/{RUN_ENV}.toml`
//! - environment variables prefixed with `APP__` (and a few plain ones
//!   such as `DATABASE_URL` and `JWT_SECRET`), with `.env` read by dotenvy
//!
//! ```rust,ignore
//! use chat_gateway::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("history on join: {}", settings.gateway.history_limit);
//! ```

mod settings;

pub use settings::*;
