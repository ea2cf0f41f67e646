//! WISA roster connector for arkmailer
//!
//! Fetches pupil contact addresses from the WISA `OUDERMLR_N` query and
//! exposes them as an arkmailer-core [`RosterSource`](arkmailer_core::RosterSource).

mod client;
mod error;
mod reference_date;

pub use client::{WisaClient, WisaConfig, DEFAULT_TIMEOUT, ROSTER_QUERY};
pub use error::{WisaError, WisaResult};
pub use reference_date::{format_reference_date, reference_date, WISA_DATE_FORMAT};
