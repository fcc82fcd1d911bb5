// Mustakshif (مستكشف): "The Explorer". Inspects a Solana address, its
// transfers and the accounts around it, and follows new activity live.
use clap::Parser;
use mustakshif::engine::Mustakshif;
use mustakshif::engine::MustakshifArgs;
use mustakshif::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = MustakshifArgs::parse();
    Mustakshif::run(args).await?;
    Ok(())
}
