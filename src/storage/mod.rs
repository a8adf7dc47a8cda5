pub mod photo_store;

pub use photo_store::{content_type_for, PhotoError, PhotoPolicy, PhotoStore, PhotoUpload};
