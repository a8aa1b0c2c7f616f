#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = mathbot_rust::run_telegram_bot().await {
        eprintln!("mathbot-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
