use anyhow::Result;
use conductor::cli::{App, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();
    let app = App::new();

    app.run(args).await?;

    Ok(())
}
