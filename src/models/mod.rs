pub mod api;
pub mod common;
pub mod credential;
pub mod image;
pub mod message;

pub use api::*;
pub use common::*;
pub use credential::*;
pub use image::*;
pub use message::*;
