use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    anonimka::run().await
}
