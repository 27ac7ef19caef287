mod cli;
mod infra;
mod report;
mod routes;
mod server;

use lead_pulse::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
