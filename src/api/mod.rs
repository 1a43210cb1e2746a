mod error;
pub mod models;
mod respond;
mod server;
pub mod services;
pub mod state;
pub(crate) mod utils;

pub use error::ApiError;
pub use respond::{JOB_ID_HEADER, SUMMARY_HEADER, attachment_name};
pub use server::{router, run};
