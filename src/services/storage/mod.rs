//! Connection profile storage.

mod profiles;
mod samples;

pub use profiles::ProfileStore;
pub use samples::{sample_profiles, SAMPLE_EDU_ID, SAMPLE_FU_ID};
