#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    lvmimg::run().await
}
