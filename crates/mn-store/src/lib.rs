pub mod error;
pub mod home;
pub mod json_bridge;
pub mod schema;
pub mod shells;
pub mod store;

pub use error::{Result, StoreError};
pub use home::{CONFIG_FILE, MnHome, default_base_dir, parse_config};
pub use shells::ShellArchive;
pub use store::Store;
