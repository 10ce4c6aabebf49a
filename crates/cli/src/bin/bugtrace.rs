use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    bugtrace_cli::main_entry().await
}
