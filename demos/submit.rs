use std::env;

use anyhow::Context;
use tracing::info;

use actitime_batch::{
    BatchSubmitService, Driver, DriverConfig, ParserOptions, SubmitConfig,
    helpers::actitime::client_init,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting actiTIME batch submission example");

    let path = env::args()
        .nth(1)
        .context("usage: submit <batch-file.abf>")?;

    // ACTITIME_URL points at the REST API, e.g. https://example.com/api/v1
    let config = DriverConfig::from_env()?;
    let mut driver = Driver::new(client_init()?, config);

    let service = BatchSubmitService::new(SubmitConfig::from_env());
    let report = service
        .process_file(&mut driver, &path, ParserOptions::default())
        .await?;

    info!(
        "Done: {} entries, {} rows written",
        report.entries, report.rows
    );

    Ok(())
}

/*
Example batch file:

% comment lines start with a percent sign
START ENTRY;
USERNAME;john.doe;
PASSWORD;FooBar18;
START TIMESHEET;
2019;8;19;558;1;
2019;8;19;13619;7;
END TIMESHEET;
END ENTRY;

Each entry logs in with its own credentials, then every row is written as
year;month;day;task;hours with hours converted to minutes.
*/
