#[tokio::main]
async fn main() {
    if let Err(err) = jp_api::run().await {
        tracing::error!(error = %err, "jp-api failed");
        std::process::exit(1);
    }
}
