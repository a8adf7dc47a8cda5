pub mod lead;

pub use lead::{CreateLeadRequest, LeadResponse, PhotoUrlsResponse};
