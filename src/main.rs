//! The send-controller service.
//!
//! Run with:
//!   RUST_LOG=info cargo run
//!
//! Try:
//!   curl http://localhost:3000/app/send
//!   curl http://localhost:3000/app/send?index=0

use tracing_subscriber::EnvFilter;
use weft::config::Settings;
use weft::{Server, app};

#[tokio::main]
async fn main() -> Result<(), weft::Error> {
    let settings = Settings::load()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let router = app::build(&settings)?;
    Server::bind(&settings.bind)?.serve(router).await
}
