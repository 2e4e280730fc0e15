mod app;
mod config;
mod service;
mod submission;

pub use app::run_native;
pub use config::{BrushConfig, Config, HdStrategy};
pub use service::{InpaintRequest, InpaintService, ServiceError, http::HttpService, to_data_url};
pub use submission::{SubmitError, Submission, submit};
