use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::PqMiddlewareError;
use crate::guard::ConnInfoOptionsFree;
use crate::native::{ClientLibrary, ConnInfoEntry};

/// Connection parameters, read from and rendered to a libpq conninfo string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_timeout: Option<u64>,
    pub application_name: Option<String>,
    /// Every other keyword libpq reported a value for.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ConnectionSettings {
    /// Parse a conninfo string (`host=... port=...` or a `postgresql://` URI)
    /// with the native library's own parser.
    ///
    /// # Errors
    /// Returns `PqMiddlewareError::ConfigError` if the library rejects the
    /// string or a numeric field is not a number.
    pub fn from_conninfo<L: ClientLibrary>(conninfo: &str) -> Result<Self, PqMiddlewareError> {
        let raw = L::parse_conninfo(conninfo).map_err(|e| {
            PqMiddlewareError::ConfigError(format!("invalid connection string: {}", e.trim_end()))
        })?;
        // SAFETY: `raw` was just allocated by the library and is owned by nobody else.
        #[allow(unsafe_code)]
        let options = unsafe { ConnInfoOptionsFree::<L>::from_raw(raw.as_ptr()) };

        let mut settings = ConnectionSettings::default();
        for entry in options.entries() {
            settings.apply(entry)?;
        }
        tracing::debug!(
            host = settings.host.as_deref(),
            dbname = settings.dbname.as_deref(),
            "parsed connection string"
        );
        Ok(settings)
    }

    /// Fill every unset field from the library's compiled-in and
    /// environment defaults (`PQconndefaults`).
    ///
    /// # Errors
    /// Returns `PqMiddlewareError::ConfigError` if a default is malformed.
    pub fn with_defaults<L: ClientLibrary>(mut self) -> Result<Self, PqMiddlewareError> {
        let Some(raw) = L::conninfo_defaults() else {
            tracing::warn!("native library returned no connection defaults");
            return Ok(self);
        };
        // SAFETY: as in `from_conninfo`.
        #[allow(unsafe_code)]
        let options = unsafe { ConnInfoOptionsFree::<L>::from_raw(raw.as_ptr()) };

        let mut defaults = ConnectionSettings::default();
        for entry in options.entries() {
            defaults.apply(entry)?;
        }

        self.host = self.host.or(defaults.host);
        self.port = self.port.or(defaults.port);
        self.dbname = self.dbname.or(defaults.dbname);
        self.user = self.user.or(defaults.user);
        self.password = self.password.or(defaults.password);
        self.connect_timeout = self.connect_timeout.or(defaults.connect_timeout);
        self.application_name = self.application_name.or(defaults.application_name);
        for (keyword, value) in defaults.options {
            self.options.entry(keyword).or_insert(value);
        }
        Ok(self)
    }

    /// Check that every field a connection needs is present.
    ///
    /// # Errors
    /// Returns `PqMiddlewareError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), PqMiddlewareError> {
        if self.dbname.is_none() {
            return Err(PqMiddlewareError::ConfigError(
                "dbname is required".to_string(),
            ));
        }
        if self.host.is_none() {
            return Err(PqMiddlewareError::ConfigError(
                "host is required".to_string(),
            ));
        }
        if self.port.is_none() {
            return Err(PqMiddlewareError::ConfigError(
                "port is required".to_string(),
            ));
        }
        if self.user.is_none() {
            return Err(PqMiddlewareError::ConfigError(
                "user is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as a `keyword=value` conninfo string, quoting where libpq needs it.
    #[must_use]
    pub fn to_conninfo(&self) -> String {
        let port = self.port.map(|p| p.to_string());
        let timeout = self.connect_timeout.map(|t| t.to_string());
        let known = [
            ("host", self.host.as_deref()),
            ("port", port.as_deref()),
            ("dbname", self.dbname.as_deref()),
            ("user", self.user.as_deref()),
            ("password", self.password.as_deref()),
            ("connect_timeout", timeout.as_deref()),
            ("application_name", self.application_name.as_deref()),
        ];

        let mut out = String::new();
        let extra = self.options.iter().map(|(k, v)| (k.as_str(), Some(v.as_str())));
        for (keyword, value) in known.into_iter().chain(extra) {
            let Some(value) = value else { continue };
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(out, "{keyword}={}", quote_value(value));
        }
        out
    }

    fn apply(&mut self, entry: ConnInfoEntry) -> Result<(), PqMiddlewareError> {
        let Some(value) = entry.value else {
            return Ok(());
        };
        match entry.keyword.as_str() {
            "host" => self.host = Some(value),
            "port" => self.port = Some(parse_number(&entry.keyword, &value)?),
            "dbname" => self.dbname = Some(value),
            "user" => self.user = Some(value),
            "password" => self.password = Some(value),
            "connect_timeout" => {
                self.connect_timeout = Some(parse_number(&entry.keyword, &value)?);
            }
            "application_name" => self.application_name = Some(value),
            _ => {
                self.options.insert(entry.keyword, value);
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(keyword: &str, value: &str) -> Result<T, PqMiddlewareError> {
    value.trim().parse().map_err(|_| {
        PqMiddlewareError::ConfigError(format!("{keyword} must be a number, got {value:?}"))
    })
}

fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if !needs_quotes {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_library::MockLibrary;

    #[test]
    fn parses_known_and_extra_keywords() -> Result<(), PqMiddlewareError> {
        MockLibrary::reset_counts();
        let settings = ConnectionSettings::from_conninfo::<MockLibrary>(
            "host=localhost port=5433 dbname=app user=svc sslmode=require",
        )?;
        assert_eq!(settings.host.as_deref(), Some("localhost"));
        assert_eq!(settings.port, Some(5433));
        assert_eq!(settings.dbname.as_deref(), Some("app"));
        assert_eq!(settings.options.get("sslmode").map(String::as_str), Some("require"));
        settings.validate()?;
        assert_eq!(MockLibrary::counts().conninfo_freed, 1);
        Ok(())
    }

    #[test]
    fn rejected_string_is_a_config_error() {
        MockLibrary::reset_counts();
        let err = ConnectionSettings::from_conninfo::<MockLibrary>("host").unwrap_err();
        assert!(matches!(err, PqMiddlewareError::ConfigError(_)));
        assert_eq!(MockLibrary::counts().conninfo_freed, 0);
    }

    #[test]
    fn non_numeric_port_is_rejected_and_options_still_freed() {
        MockLibrary::reset_counts();
        let err = ConnectionSettings::from_conninfo::<MockLibrary>("port=abc").unwrap_err();
        assert!(err.to_string().contains("port must be a number"), "{err}");
        assert_eq!(MockLibrary::counts().conninfo_freed, 1);
    }

    #[test]
    fn validate_names_the_missing_field() {
        let settings = ConnectionSettings {
            dbname: Some("app".into()),
            host: Some("db".into()),
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: port is required");
    }

    #[test]
    fn defaults_fill_only_unset_fields() -> Result<(), PqMiddlewareError> {
        MockLibrary::reset_counts();
        MockLibrary::set_defaults(&[("host", "/tmp"), ("port", "5432"), ("user", "postgres")]);
        let settings = ConnectionSettings {
            host: Some("db.internal".into()),
            ..Default::default()
        }
        .with_defaults::<MockLibrary>()?;

        assert_eq!(settings.host.as_deref(), Some("db.internal"));
        assert_eq!(settings.port, Some(5432));
        assert_eq!(settings.user.as_deref(), Some("postgres"));
        assert_eq!(MockLibrary::counts().conninfo_freed, 1);
        Ok(())
    }

    #[test]
    fn renders_quoted_conninfo() {
        let settings = ConnectionSettings {
            host: Some("localhost".into()),
            port: Some(5432),
            password: Some("it's a secret".into()),
            application_name: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            settings.to_conninfo(),
            r"host=localhost port=5432 password='it\'s a secret' application_name=''"
        );
    }
}
