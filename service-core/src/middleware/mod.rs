pub mod request_id;
pub mod shared_secret;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use shared_secret::{CRON_SECRET_HEADER, SharedSecret, require_shared_secret};
