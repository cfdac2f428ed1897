use crate::protocol;
use crate::{Result, VisionError};
use std::time::Duration;

// -- Defaults of the production cell --
pub const DEFAULT_HOST: &str = "172.31.1.69";
pub const DEFAULT_PORT: u16 = 59002;
pub const DEFAULT_CYCLE_MS: u64 = 1000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_OPCODE: &str = "15";
pub const DEFAULT_JOB_ID: &str = "BIEMH26_105055";
pub const DEFAULT_DELIMITER: &str = ",";

/// Operational parameters of the vision client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Name or IP literal. Every resolved address is tried within one
    /// `connect_timeout`; name resolution itself is not bounded by it.
    pub host: String,
    pub port: u16,
    /// Cadence at which the cyclic task invokes the client.
    pub cycle_period: Duration,
    /// Budget for one connect attempt across all resolved addresses.
    pub connect_timeout: Duration,
    /// Upper bound on waiting for one response line.
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub opcode: String,
    pub job_id: String,
    /// Field delimiter of the legacy datagram format.
    pub delimiter: String,
    /// Decode responses and publish poses to the data bridge.
    pub parse_responses: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cycle_period: Duration::from_millis(DEFAULT_CYCLE_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
            opcode: DEFAULT_OPCODE.to_string(),
            job_id: DEFAULT_JOB_ID.to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            parse_responses: true,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `SMARTPICK_*` environment variables.
    ///
    /// Unset, empty or unparsable variables keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let ms = |name: &str, default: Duration| {
            Duration::from_millis(read_u64(&lookup, name, default.as_millis() as u64))
        };
        Self {
            host: read_string(&lookup, "SMARTPICK_HOST", &d.host),
            port: read_u16(&lookup, "SMARTPICK_PORT", d.port),
            cycle_period: ms("SMARTPICK_CYCLE_MS", d.cycle_period),
            connect_timeout: ms("SMARTPICK_CONNECT_TIMEOUT_MS", d.connect_timeout),
            read_timeout: ms("SMARTPICK_READ_TIMEOUT_MS", d.read_timeout),
            write_timeout: ms("SMARTPICK_WRITE_TIMEOUT_MS", d.write_timeout),
            opcode: read_string(&lookup, "SMARTPICK_OPCODE", &d.opcode),
            job_id: read_string(&lookup, "SMARTPICK_JOB_ID", &d.job_id),
            // Not trimmed: a delimiter may legitimately be whitespace.
            delimiter: lookup("SMARTPICK_DELIMITER")
                .filter(|v| !v.is_empty())
                .unwrap_or(d.delimiter),
            parse_responses: read_bool(&lookup, "SMARTPICK_PARSE_RESPONSES", d.parse_responses),
        }
    }

    /// `host:port` for address resolution.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The exact request line sent on a trigger.
    pub fn request_line(&self) -> String {
        protocol::build_request(&self.opcode, &self.job_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(VisionError::Config("host is empty".into()));
        }
        if self.port == 0 {
            return Err(VisionError::Config("port must be non-zero".into()));
        }
        for (name, value) in [
            ("cycle_period", self.cycle_period),
            ("connect_timeout", self.connect_timeout),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
        ] {
            if value.is_zero() {
                return Err(VisionError::Config(format!("{} must be non-zero", name)));
            }
        }
        if self.opcode.is_empty() {
            return Err(VisionError::Config("opcode is empty".into()));
        }
        for (name, value) in [("opcode", &self.opcode), ("job_id", &self.job_id)] {
            if value.contains([protocol::REQUEST_SEPARATOR, '\r', '\n']) {
                return Err(VisionError::Config(format!(
                    "{} must not contain ';' or line breaks: {:?}",
                    name, value
                )));
            }
        }
        if self.delimiter.is_empty() {
            return Err(VisionError::Config("delimiter is empty".into()));
        }
        Ok(())
    }
}

fn read_string(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn read_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> u64 {
    lookup(name)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn read_u16(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u16) -> u16 {
    lookup(name)
        .and_then(|v| v.trim().parse::<u16>().ok())
        .unwrap_or(default)
}

fn read_bool(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    lookup(name)
        .and_then(|v| {
            let v = v.trim().to_ascii_lowercase();
            match v.as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            }
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = ClientConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.server_addr(), "172.31.1.69:59002");
        assert_eq!(cfg.request_line(), "15;BIEMH26_105055\r\n");
        assert_eq!(cfg.read_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_env_overrides() {
        let cfg = ClientConfig::from_lookup(lookup_from(&[
            ("SMARTPICK_HOST", " 127.0.0.1 "),
            ("SMARTPICK_PORT", "4000"),
            ("SMARTPICK_READ_TIMEOUT_MS", "250"),
            ("SMARTPICK_JOB_ID", "JOB_1"),
            ("SMARTPICK_DELIMITER", ";"),
            ("SMARTPICK_PARSE_RESPONSES", "off"),
        ]));
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.read_timeout, Duration::from_millis(250));
        assert_eq!(cfg.job_id, "JOB_1");
        assert_eq!(cfg.delimiter, ";");
        assert!(!cfg.parse_responses);
        assert_eq!(cfg.cycle_period, Duration::from_millis(DEFAULT_CYCLE_MS));
    }

    #[test]
    fn test_unparsable_env_keeps_default() {
        let cfg = ClientConfig::from_lookup(lookup_from(&[
            ("SMARTPICK_PORT", "not-a-port"),
            ("SMARTPICK_CYCLE_MS", "-5"),
            ("SMARTPICK_PARSE_RESPONSES", "maybe"),
            ("SMARTPICK_HOST", "   "),
        ]));
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            ClientConfig {
                port: 0,
                ..Default::default()
            },
            ClientConfig {
                read_timeout: Duration::ZERO,
                ..Default::default()
            },
            ClientConfig {
                job_id: "A;B".into(),
                ..Default::default()
            },
            ClientConfig {
                opcode: "15\r\n".into(),
                ..Default::default()
            },
            ClientConfig {
                delimiter: String::new(),
                ..Default::default()
            },
        ];
        for cfg in bad {
            assert!(
                matches!(cfg.validate(), Err(VisionError::Config(_))),
                "{:?} should be rejected",
                cfg
            );
        }
    }
}
