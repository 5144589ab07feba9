#[tokio::main]
async fn main() -> anyhow::Result<()> {
    zygote_server::start().await
}
