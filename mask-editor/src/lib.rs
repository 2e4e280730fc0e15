mod async_task;
mod coords;
mod error;
mod export;
mod image_utils;
mod mask;
mod surface;
mod viewer;

pub use async_task::*;
pub use coords::*;
pub use error::*;
pub use export::*;
pub use image_utils::*;
pub use mask::*;
pub use surface::*;
pub use viewer::*;

pub use futures::future::BoxFuture;
