//! Issue-key command - mints a key without going through HTTP

use clap::Args;
use tracing::info;

#[derive(Args, Debug)]
pub struct IssueKeyArgs {
    /// Tier of the new key: trial or paid
    #[arg(long, default_value = "trial")]
    pub tier: String,
}

/// Issue a key as the configured admin and print it to stdout
pub async fn run(args: IssueKeyArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let service = crate::create_key_service(&config).await?;

    let record = service
        .issue_key(&args.tier, &config.auth.admin_api_key)
        .await?;

    info!(tier = %record.tier(), "Issued API key from the command line");
    println!("{}", record.key());

    Ok(())
}
