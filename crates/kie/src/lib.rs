//! Kie.ai REST client.
//!
//! Wraps the job creation and job status endpoints of the Kie.ai API and
//! plugs them into the engine through [`vidgen_core::JobSubmitter`].

pub mod api;
pub mod config;

pub use api::{KieApi, KieApiError};
pub use config::KieConfig;
