pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ErrorBody, FailureBody};
pub use handlers::{create_router, CreatedResponse, DeploymentSummary};
pub use state::AppState;
