//! Producer configuration
//!
//! Every flag can also come from a `PLATTER_*` environment variable, and a
//! `.env` file in the working directory is loaded first.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use platter_domain::publishing::PipelineConfig;
use platter_kinesis::KinesisPublisherConfig;
use std::time::Duration;

/// Which payload generator feeds the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PayloadKind {
    /// Sequence number followed by padding up to the record size
    Padded,
    /// Mock IoT turntable play events as JSON
    Turntable,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "platter-producer",
    version,
    about = "Generate turntable records and publish them to a Kinesis data stream"
)]
pub struct ProducerConfig {
    /// Kinesis stream to publish to
    #[arg(
        long,
        env = "PLATTER_STREAM_NAME",
        default_value = "aws-kinesis-iot-turntable-stream"
    )]
    pub stream_name: String,

    /// AWS region of the stream
    #[arg(long, env = "PLATTER_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Custom Kinesis endpoint (e.g. LocalStack)
    #[arg(long, env = "PLATTER_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Number of records to publish
    #[arg(
        long = "records",
        visible_alias = "number-of-events",
        env = "PLATTER_RECORDS",
        default_value_t = 500
    )]
    pub records: u64,

    /// Size in bytes of each padded record
    #[arg(long, env = "PLATTER_RECORD_SIZE", default_value_t = 128)]
    pub record_size: usize,

    /// Payload generator
    #[arg(long, value_enum, env = "PLATTER_PAYLOAD", default_value_t = PayloadKind::Padded)]
    pub payload: PayloadKind,

    /// Partition key for every record (default: start time in millis)
    #[arg(long, env = "PLATTER_PARTITION_KEY")]
    pub partition_key: Option<String>,

    /// Seconds to wait for in-flight records once submission ends
    #[arg(long, env = "PLATTER_DRAIN_TIMEOUT_SECS", default_value_t = 60)]
    pub drain_timeout_secs: u64,

    /// Milliseconds between progress lines
    #[arg(long, env = "PLATTER_REPORT_INTERVAL_MS", default_value_t = 1_000)]
    pub report_interval_ms: u64,

    /// Records allowed in flight before new ones are rejected
    #[arg(long, env = "PLATTER_MAX_IN_FLIGHT", default_value_t = 10_000)]
    pub max_in_flight: usize,

    /// Milliseconds a single put may take before the record fails
    #[arg(long, env = "PLATTER_RECORD_TTL_MS", default_value_t = 30_000)]
    pub record_ttl_ms: u64,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, env = "PLATTER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, env = "PLATTER_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl ProducerConfig {
    /// Load `.env`, then parse flags and environment
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }

    /// Pipeline settings derived from the flags
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::with_destination(self.stream_name.clone());
        if let Some(key) = &self.partition_key {
            config.partition_key = key.clone();
        }
        config.drain_timeout = Duration::from_secs(self.drain_timeout_secs);
        config.report_interval = Duration::from_millis(self.report_interval_ms);
        config.expected_total = Some(self.records);

        config
            .validate()
            .context("invalid pipeline configuration")?;
        Ok(config)
    }

    /// Kinesis adapter settings derived from the flags
    pub fn publisher_config(&self) -> KinesisPublisherConfig {
        KinesisPublisherConfig {
            max_in_flight: self.max_in_flight,
            record_ttl: Duration::from_millis(self.record_ttl_ms),
        }
    }
}
