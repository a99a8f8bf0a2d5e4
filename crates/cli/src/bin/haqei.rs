use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    haqei_cli::main_entry().await
}
