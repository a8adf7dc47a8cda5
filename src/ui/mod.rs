//! Front-end state machines for capturing and browsing leads.
//!
//! Neither machine renders anything; a front end reads their state, feeds them
//! user input, and awaits the [`LeadApi`](crate::client::LeadApi) calls they
//! hand out.

pub mod browser;
pub mod capture;

pub use browser::{LeadBrowser, PhotoRequest, PhotoState, ViewState};
pub use capture::{CaptureForm, Feedback, FormError, CONFIRMATION_TTL};
