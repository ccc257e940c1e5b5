use std::env::var;

use changelog_notify::run;
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    if var("RUST_LOG").is_ok() {
        env_logger::init();
    }
    run().await
}
