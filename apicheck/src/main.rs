#[tokio::main]
async fn main() -> eyre::Result<()> {
    apicheck::App::new().run().await
}
