//! Fraud rule tuning.
//!
//! Every threshold, window and the set of active rules is supplied externally.

use bigdecimal::BigDecimal;
use chrono::Duration;
use ipnet::IpNet;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::str::FromStr;

use super::env_parse;
use crate::domain::RiskSignal;

pub const DEFAULT_HIGH_AMOUNT_THRESHOLD: i64 = 50_000;
pub const DEFAULT_SUSPICIOUS_IPS: &str = "172.";
pub const DEFAULT_VELOCITY_WINDOW_SECS: i64 = 5 * 60;
pub const DEFAULT_VELOCITY_THRESHOLD: i64 = 3;
pub const DEFAULT_SPIKE_MULTIPLIER: i64 = 3;
pub const DEFAULT_FAILED_WINDOW_SECS: i64 = 10 * 60;
pub const DEFAULT_FAILED_THRESHOLD: i64 = 2;
pub const MAX_WINDOW_SECS: i64 = 30 * 24 * 60 * 60;

/// An origin address pattern considered suspicious.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuspiciousOrigin {
    /// Literal textual prefix, e.g. `172.`.
    Prefix(String),
    /// CIDR block, e.g. `10.13.0.0/16`.
    Network(IpNet),
}

impl SuspiciousOrigin {
    pub fn matches(&self, ip_address: &str) -> bool {
        let ip_address = ip_address.trim();
        match self {
            SuspiciousOrigin::Prefix(prefix) => ip_address.starts_with(prefix.as_str()),
            SuspiciousOrigin::Network(net) => ip_address
                .parse::<IpAddr>()
                .map(|ip| net.contains(&ip))
                .unwrap_or(false),
        }
    }
}

impl FromStr for SuspiciousOrigin {
    type Err = ipnet::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('/') {
            s.parse::<IpNet>().map(SuspiciousOrigin::Network)
        } else {
            Ok(SuspiciousOrigin::Prefix(s.to_string()))
        }
    }
}

#[derive(Debug, Clone)]
pub struct RulesConfig {
    pub high_amount_threshold: BigDecimal,
    pub suspicious_origins: Vec<SuspiciousOrigin>,
    pub velocity_window: Duration,
    pub velocity_threshold: i64,
    pub spike_multiplier: BigDecimal,
    pub failed_window: Duration,
    pub failed_attempts_threshold: i64,
    pub enabled_rules: BTreeSet<RiskSignal>,
    /// Serialize aggregate reads and the insert per sender account.
    pub serialize_per_sender: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            high_amount_threshold: BigDecimal::from(DEFAULT_HIGH_AMOUNT_THRESHOLD),
            suspicious_origins: vec![SuspiciousOrigin::Prefix(DEFAULT_SUSPICIOUS_IPS.to_string())],
            velocity_window: Duration::seconds(DEFAULT_VELOCITY_WINDOW_SECS),
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD,
            spike_multiplier: BigDecimal::from(DEFAULT_SPIKE_MULTIPLIER),
            failed_window: Duration::seconds(DEFAULT_FAILED_WINDOW_SECS),
            failed_attempts_threshold: DEFAULT_FAILED_THRESHOLD,
            enabled_rules: RiskSignal::ALL.into_iter().collect(),
            serialize_per_sender: false,
        }
    }
}

impl RulesConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = RulesConfig::default();

        let suspicious_origins = match std::env::var("FRAUD_SUSPICIOUS_IPS") {
            Ok(raw) => parse_suspicious_origins(&raw)?,
            Err(_) => defaults.suspicious_origins,
        };
        let enabled_rules = match std::env::var("FRAUD_ENABLED_RULES") {
            Ok(raw) => parse_enabled_rules(&raw)?,
            Err(_) => defaults.enabled_rules,
        };

        let config = RulesConfig {
            high_amount_threshold: env_parse(
                "FRAUD_HIGH_AMOUNT_THRESHOLD",
                defaults.high_amount_threshold,
            )?,
            suspicious_origins,
            velocity_window: window_from_env(
                "FRAUD_VELOCITY_WINDOW_SECS",
                DEFAULT_VELOCITY_WINDOW_SECS,
            )?,
            velocity_threshold: env_parse("FRAUD_VELOCITY_THRESHOLD", defaults.velocity_threshold)?,
            spike_multiplier: env_parse("FRAUD_SPIKE_MULTIPLIER", defaults.spike_multiplier)?,
            failed_window: window_from_env("FRAUD_FAILED_WINDOW_SECS", DEFAULT_FAILED_WINDOW_SECS)?,
            failed_attempts_threshold: env_parse(
                "FRAUD_FAILED_THRESHOLD",
                defaults.failed_attempts_threshold,
            )?,
            enabled_rules,
            serialize_per_sender: env_parse("FRAUD_SERIALIZE_PER_SENDER", false)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let zero = BigDecimal::from(0);
        if self.high_amount_threshold <= zero {
            anyhow::bail!("FRAUD_HIGH_AMOUNT_THRESHOLD must be greater than zero");
        }
        if self.spike_multiplier <= zero {
            anyhow::bail!("FRAUD_SPIKE_MULTIPLIER must be greater than zero");
        }
        let max_window = Duration::seconds(MAX_WINDOW_SECS);
        for (name, window) in [
            ("FRAUD_VELOCITY_WINDOW_SECS", self.velocity_window),
            ("FRAUD_FAILED_WINDOW_SECS", self.failed_window),
        ] {
            if window <= Duration::zero() || window > max_window {
                anyhow::bail!("{} must be between 1 and {} seconds", name, MAX_WINDOW_SECS);
            }
        }
        if self.velocity_threshold < 1 || self.failed_attempts_threshold < 1 {
            anyhow::bail!("fraud count thresholds must be at least 1");
        }
        Ok(())
    }

    pub fn is_enabled(&self, rule: RiskSignal) -> bool {
        self.enabled_rules.contains(&rule)
    }

    pub fn is_suspicious_origin(&self, ip_address: &str) -> bool {
        self.suspicious_origins
            .iter()
            .any(|origin| origin.matches(ip_address))
    }
}

/// Window length in seconds, bounded before it becomes a `Duration`.
fn window_from_env(key: &str, default_secs: i64) -> anyhow::Result<Duration> {
    let secs: i64 = env_parse(key, default_secs)?;
    if !(1..=MAX_WINDOW_SECS).contains(&secs) {
        anyhow::bail!("{} must be between 1 and {} seconds", key, MAX_WINDOW_SECS);
    }
    Ok(Duration::seconds(secs))
}

pub fn parse_suspicious_origins(raw: &str) -> anyhow::Result<Vec<SuspiciousOrigin>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<SuspiciousOrigin>()
                .map_err(|e| anyhow::anyhow!("invalid suspicious IP entry '{}': {}", entry, e))
        })
        .collect()
}

pub fn parse_enabled_rules(raw: &str) -> anyhow::Result<BTreeSet<RiskSignal>> {
    let value = raw.trim();
    if value == "*" {
        return Ok(RiskSignal::ALL.into_iter().collect());
    }

    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.parse::<RiskSignal>().map_err(anyhow::Error::msg))
        .collect()
}
