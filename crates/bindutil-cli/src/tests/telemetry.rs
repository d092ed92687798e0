//! Unit tests for telemetry initialisation.

use bindutil_config::Config;
use clap::Parser;

use crate::cli::Cli;
use crate::telemetry::{TelemetryError, initialise};

fn config_with_filter(filter: &str) -> Config {
    Cli::try_parse_from(["bindutil", "--log-filter", filter, "umount", "/mnt/view"])
        .expect("umount parses")
        .config
}

#[test]
fn repeated_initialisation_succeeds() {
    let config = Config::default();
    initialise(&config).expect("first initialisation");
    initialise(&config).expect("second initialisation");
}

#[test]
fn invalid_filter_is_rejected_after_installation() {
    initialise(&Config::default()).expect("subscriber installed");
    let error = initialise(&config_with_filter("bindutil=notalevel"))
        .expect_err("filter must not parse");
    assert!(matches!(error, TelemetryError::Filter(_)));
}
