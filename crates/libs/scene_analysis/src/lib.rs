#![deny(clippy::unwrap_used)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

mod annotator;
mod detection;
mod object_detector;
mod response_parser;
mod scene_analyst;
mod utils;

pub use annotator::*;
pub use detection::*;
pub use object_detector::*;
pub use response_parser::*;
pub use scene_analyst::*;
pub use utils::*;
