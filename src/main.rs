#[tokio::main]
async fn main() {
    inmo_lib::init_tracing();

    if let Err(e) = inmo_lib::run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
