#![deny(clippy::all)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]

#[tokio::main]
async fn main() {
    tenant_auth::app::run().await;
}
