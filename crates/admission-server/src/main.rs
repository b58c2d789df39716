use anyhow::Result;

use admission_server::{cli, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    let config = Config::from_args(&matches)?;

    admission_server::run(config).await
}
