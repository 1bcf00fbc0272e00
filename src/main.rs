#[cfg(feature = "server")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    quota_watch::server::run().await
}
