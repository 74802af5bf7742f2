//! Platter Producer
//!
//! Generates turntable records and publishes them to a Kinesis data stream
//! through the Platter pipeline, reporting progress while records are in
//! flight and exiting once they have drained.

mod config;
mod generators;
mod logging;

use anyhow::Result;
use aws_sdk_kinesis::config::{BehaviorVersion, Region};
use platter_domain::publishing::{Orchestrator, RunSummary};
use platter_kinesis::KinesisPublisher;
use std::process::ExitCode;
use tracing::{info, warn};

use crate::config::{PayloadKind, ProducerConfig};
use crate::generators::{PaddedSequenceSource, TurntableEventSource};

/// Exit status when the drain timed out with records still in flight
const EXIT_SHORTFALL: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = ProducerConfig::load();
    logging::init(&config.log_level, config.log_format);

    info!("Sending data to Kinesis Data Stream");
    info!(
        stream_name = %config.stream_name,
        region = %config.region,
        "Stream name: {} Region: {}",
        config.stream_name,
        config.region
    );

    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;

    let mut kinesis_config = aws_sdk_kinesis::config::Builder::from(&aws_config);
    if let Some(endpoint) = &config.endpoint_url {
        info!(endpoint = %endpoint, "Using custom Kinesis endpoint");
        kinesis_config = kinesis_config.endpoint_url(endpoint);
    }
    let kinesis = aws_sdk_kinesis::Client::from_conf(kinesis_config.build());

    let publisher = KinesisPublisher::new(kinesis, config.publisher_config());
    let orchestrator = Orchestrator::new(publisher, config.pipeline_config()?);
    info!(run_id = %orchestrator.run_id(), payload = ?config.payload, "Starting publishing run");

    let summary = match config.payload {
        PayloadKind::Padded => {
            orchestrator
                .run(PaddedSequenceSource::new(config.records, config.record_size))
                .await?
        }
        PayloadKind::Turntable => {
            orchestrator
                .run(TurntableEventSource::new(config.records))
                .await?
        }
    };

    Ok(ExitCode::from(exit_status(&summary)))
}

/// Log the final summary and map it to a process exit status
fn exit_status(summary: &RunSummary) -> u8 {
    match summary.ensure_drained() {
        Ok(()) => {
            info!(
                submitted = summary.submitted,
                completed = summary.completed,
                failed = summary.failed,
                rejected = summary.rejected,
                "Completed sending records to Kinesis Data Stream!"
            );
            0
        }
        Err(err) => {
            warn!(
                error = %err,
                submitted = summary.submitted,
                completed = summary.completed,
                shortfall = summary.shortfall,
                "Finished with records still in flight"
            );
            EXIT_SHORTFALL
        }
    }
}
