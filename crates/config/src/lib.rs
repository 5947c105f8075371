pub mod env;
pub mod lark;
pub mod tracing_init;

pub use env::AppConfig;
pub use lark::LarkConfig;
pub use tracing_init::init_tracing;
