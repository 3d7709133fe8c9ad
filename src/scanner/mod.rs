//! Per-repository acquisition and metadata scan
//!
//! - **checkout**: worker-scoped checkout directories and file itemization
//! - **metadata**: external extractor runs and GPS hit classification

mod checkout;
mod metadata;

pub use checkout::{Checkout, CheckoutConfig, DEFAULT_CHECKOUT_COMMAND, DEFAULT_CHECKOUT_TIMEOUT};
pub use metadata::{
    DEFAULT_EXTRACT_COMMAND, DEFAULT_EXTRACT_TIMEOUT, DEGREE_MARKER, LOCATION_TAG, MetadataScanner,
    ScanConfig, ScanReport, is_hit,
};
