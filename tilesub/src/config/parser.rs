//! INI parsing logic for converting INI → `ConfigFile`.

use std::str::FromStr;

use ini::Ini;

use super::{ConfigFile, ConfigFileError};
use crate::bridge::BrokerAddress;
use crate::coord::QuadKey;

/// Parse an INI document. Missing sections and keys keep their defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [tiles] section
    if let Some(section) = ini.section(Some("tiles")) {
        if let Some(v) = section.get("node_level") {
            config.tiles.node_level = parse_value("tiles", "node_level", v)?;
        }
        if let Some(v) = section.get("remote_level") {
            config.tiles.remote_level = parse_value("tiles", "remote_level", v)?;
        }
        if let Some(v) = section.get("occupancy_level") {
            config.tiles.occupancy_level = parse_value("tiles", "occupancy_level", v)?;
        }
        if let Some(v) = section.get("radius") {
            config.tiles.radius = parse_value("tiles", "radius", v)?;
        }
    }

    // [topics] section
    if let Some(section) = ini.section(Some("topics")) {
        if let Some(v) = section.get("ingress") {
            config.topics.ingress = v.trim().to_string();
        }
        if let Some(v) = section.get("fused_prefix") {
            config.topics.fused_prefix = v.trim().to_string();
        }
        if let Some(v) = section.get("suffix_ingress") {
            config.topics.suffix_ingress = parse_bool("topics", "suffix_ingress", v)?;
        }
    }

    // [broker] section
    if let Some(section) = ini.section(Some("broker")) {
        if let Some(v) = section.get("host") {
            let host = v.trim();
            if host.is_empty() {
                return Err(invalid("broker", "host", v, "host must not be empty"));
            }
            config.broker.host = host.to_string();
        }
        if let Some(v) = section.get("port") {
            config.broker.port = parse_value("broker", "port", v)?;
        }
        if let Some(v) = section.get("client_id") {
            config.broker.client_id = v.trim().to_string();
        }
    }

    // [nodes] section: <node quadkey> = host[:port]
    if let Some(section) = ini.section(Some("nodes")) {
        for (key, value) in section.iter() {
            let region = QuadKey::new(key.trim())
                .map_err(|e| invalid("nodes", key, value, &e.to_string()))?;
            let address = BrokerAddress::from_str(value)
                .map_err(|reason| invalid("nodes", key, value, &reason))?;
            config.nodes.insert(region, address);
        }
    }

    // [delivery] section
    if let Some(section) = ini.section(Some("delivery")) {
        if let Some(v) = section.get("rate_limit_ms") {
            let ms: u64 = parse_value("delivery", "rate_limit_ms", v)?;
            config.delivery.rate_limit_ms = (ms > 0).then_some(ms);
        }
        if let Some(v) = section.get("manual_mode") {
            config.delivery.manual_mode = parse_bool("delivery", "manual_mode", v)?;
        }
    }

    let subscription = config.subscription_config();
    subscription.validate_levels().map_err(|e| {
        let levels = format!(
            "{} / {} / {}",
            config.tiles.node_level, config.tiles.remote_level, config.tiles.occupancy_level
        );
        invalid("tiles", "levels", &levels, &e.to_string())
    })?;
    subscription.validate_radius().map_err(|e| {
        invalid("tiles", "radius", &config.tiles.radius.to_string(), &e.to_string())
    })?;
    if config.topics.ingress.is_empty() {
        return Err(invalid("topics", "ingress", "", "topic must not be empty"));
    }
    if config.topics.fused_prefix.is_empty() {
        return Err(invalid("topics", "fused_prefix", "", "topic must not be empty"));
    }

    Ok(config)
}

fn parse_value<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a non-negative integer"))
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" | "" => Ok(false),
        _ => Err(invalid(section, key, value, "must be true or false")),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
