//! ESHRM Backend - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    if let Err(e) = eshrm_backend::run().await {
        tracing::error!("Server stopped: {}", e);
        eprintln!("eshrm-backend: {}", e);
        std::process::exit(1);
    }
}
