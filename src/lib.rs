mod config;
mod error;
mod filename;
mod landing;
mod routes;
mod storage;
mod upload_file;

pub use config::*;
pub use error::*;
pub use filename::*;
pub use landing::*;
pub use routes::*;
pub use storage::*;
pub use upload_file::*;
