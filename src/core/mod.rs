pub mod config;

pub use config::{AppConfig, load_dotenv};
