pub mod auth;
pub mod gate;
pub mod response;

pub use auth::{authenticate, extract_bearer_token};
pub use gate::CurrentUser;
pub use response::{ApiResponse, ApiResult};
