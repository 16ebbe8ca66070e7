pub mod client;

pub use client::{CloudClient, CloudError};
