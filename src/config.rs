use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Db2Error;

/// Command timeout used when the connection string does not set one.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u32 = 30;

static NAMED_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)DB2NETNamedParam\s*=\s*(true|yes|1)\b").expect("named-param pattern is valid")
});
static COMMAND_TIMEOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)OdbcCommandTimeout\s*=\s*(\d+)").expect("timeout pattern is valid")
});
static TRANSPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Transport\s*=\s*(\w+)").expect("transport pattern is valid")
});

/// Which native call layer a connection sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Positional `?` markers, no client-side batch splitting.
    #[default]
    Odbc,
    /// `:name` markers, client-side batch splitting.
    Jdbc,
}

impl Transport {
    /// Whether `:name`/`@name` markers are rewritten to `?` unless a command says otherwise.
    #[must_use]
    pub fn rewrites_by_default(self) -> bool {
        matches!(self, Transport::Odbc)
    }
}

/// Options recognized in a DB2 connection string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Db2Options {
    pub connection_string: String,
    pub transport: Transport,
    /// Bind by marker name; when false, binds are positional.
    pub named_parameters: bool,
    pub command_timeout_secs: u32,
}

impl Db2Options {
    #[must_use]
    pub fn new(connection_string: String, transport: Transport) -> Self {
        Self {
            connection_string,
            transport,
            named_parameters: false,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }

    /// Recognize the options a connection string carries.
    ///
    /// `OdbcCommandTimeout` falls back to the default when absent or unparseable.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::ConfigError` for an unknown `Transport` value.
    pub fn parse(connection_string: &str) -> Result<Self, Db2Error> {
        let transport = match TRANSPORT.captures(connection_string) {
            Some(caps) => Transport::from_str(&caps[1], true).map_err(|_| {
                Db2Error::ConfigError(format!("unknown transport '{}'", &caps[1]))
            })?,
            None => Transport::default(),
        };
        Ok(Self {
            connection_string: connection_string.to_string(),
            transport,
            named_parameters: NAMED_PARAM.is_match(connection_string),
            command_timeout_secs: parse_command_timeout(connection_string),
        })
    }

    #[must_use]
    pub fn with_named_parameters(mut self, named_parameters: bool) -> Self {
        self.named_parameters = named_parameters;
        self
    }

    #[must_use]
    pub fn with_command_timeout(mut self, seconds: u32) -> Self {
        self.command_timeout_secs = seconds;
        self
    }
}

fn parse_command_timeout(connection_string: &str) -> u32 {
    COMMAND_TIMEOUT
        .captures(connection_string)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS)
}

/// Fluent builder for DB2 options.
#[derive(Debug, Clone)]
pub struct Db2OptionsBuilder {
    opts: Db2Options,
}

impl Db2OptionsBuilder {
    #[must_use]
    pub fn new(connection_string: String, transport: Transport) -> Self {
        Self {
            opts: Db2Options::new(connection_string, transport),
        }
    }

    /// Start from whatever the connection string already says.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::ConfigError` if the connection string cannot be parsed.
    pub fn from_connection_string(connection_string: &str) -> Result<Self, Db2Error> {
        Ok(Self {
            opts: Db2Options::parse(connection_string)?,
        })
    }

    #[must_use]
    pub fn transport(mut self, transport: Transport) -> Self {
        self.opts.transport = transport;
        self
    }

    #[must_use]
    pub fn named_parameters(mut self, named_parameters: bool) -> Self {
        self.opts.named_parameters = named_parameters;
        self
    }

    #[must_use]
    pub fn command_timeout(mut self, seconds: u32) -> Self {
        self.opts.command_timeout_secs = seconds;
        self
    }

    #[must_use]
    pub fn finish(self) -> Db2Options {
        self.opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "Driver={IBM DB2 ODBC DRIVER};Database=SAMPLE;Hostname=localhost;Port=50000;Protocol=TCPIP;Uid=db2inst1;Pwd=secret";

    #[test]
    fn reads_command_timeout() {
        for secs in [0_u32, 5, 93] {
            let opts = Db2Options::parse(&format!("{BASE};OdbcCommandTimeout={secs};")).unwrap();
            assert_eq!(opts.command_timeout_secs, secs);
        }
    }

    #[test]
    fn command_timeout_defaults_when_absent() {
        let named = Db2Options::parse(&format!("{BASE};DB2NETNamedParam=1;")).unwrap();
        assert_eq!(named.command_timeout_secs, 30);
        let host_vars = Db2Options::parse(&format!("{BASE};HostVarParameters=1;")).unwrap();
        assert_eq!(host_vars.command_timeout_secs, 30);
    }

    #[test]
    fn unparseable_timeout_falls_back() {
        let opts = Db2Options::parse(&format!("{BASE};OdbcCommandTimeout=99999999999999;")).unwrap();
        assert_eq!(opts.command_timeout_secs, DEFAULT_COMMAND_TIMEOUT_SECS);
    }

    #[test]
    fn recognizes_named_parameter_flag() {
        for flag in ["true", "YES", "1"] {
            let opts = Db2Options::parse(&format!("{BASE};DB2NETNamedParam={flag}")).unwrap();
            assert!(opts.named_parameters, "{flag}");
        }
        for flag in ["false", "0", "no"] {
            let opts = Db2Options::parse(&format!("{BASE};DB2NETNamedParam={flag}")).unwrap();
            assert!(!opts.named_parameters, "{flag}");
        }
    }

    #[test]
    fn selects_transport() {
        assert_eq!(Db2Options::parse(BASE).unwrap().transport, Transport::Odbc);
        let jdbc = Db2Options::parse(&format!("{BASE};Transport=JDBC")).unwrap();
        assert_eq!(jdbc.transport, Transport::Jdbc);
        assert!(matches!(
            Db2Options::parse(&format!("{BASE};Transport=carrier-pigeon")),
            Err(Db2Error::ConfigError(_))
        ));
    }

    #[test]
    fn builder_overrides_parsed_values() {
        let opts = Db2OptionsBuilder::from_connection_string(&format!("{BASE};OdbcCommandTimeout=5"))
            .unwrap()
            .transport(Transport::Jdbc)
            .named_parameters(true)
            .command_timeout(12)
            .finish();
        assert_eq!(opts.transport, Transport::Jdbc);
        assert!(opts.named_parameters);
        assert_eq!(opts.command_timeout_secs, 12);
    }
}
