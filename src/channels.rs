/// Channel registry for the air-quality monitoring service.
///
/// A channel is one measurement stream (one pollutant at one station)
/// processed independently end to end. Channels are declared in the
/// `[[channels]]` tables of the service TOML file; this module is the single
/// place that knows how a channel maps to its source address and its storage
/// key. All other modules take a `&Channel` rather than raw strings.

use serde::Deserialize;

use crate::store::file::file_stem_for;

// ---------------------------------------------------------------------------
// Channel metadata
// ---------------------------------------------------------------------------

/// Metadata for a single measurement channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Channel {
    /// Stable identifier used in messages and logs, e.g. "PM10".
    pub name: String,
    /// Where the fetcher reads from: a sensor id appended to the configured
    /// base URL, a full `http(s)://` URL, or a local file path.
    pub source: String,
    /// Key of the persisted series. Defaults to `name`.
    #[serde(default)]
    pub store_key: Option<String>,
}

impl Channel {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            store_key: None,
        }
    }

    /// Key under which this channel's series is stored.
    pub fn store_key(&self) -> &str {
        self.store_key.as_deref().unwrap_or(&self.name)
    }

    /// Resolves `source` against `base_url`. Full URLs are returned as-is.
    pub fn source_url(&self, base_url: &str) -> String {
        if self.source.starts_with("http://") || self.source.starts_with("https://") {
            self.source.clone()
        } else {
            format!("{}/{}", base_url.trim_end_matches('/'), self.source)
        }
    }
}

/// Looks up a channel by name. Returns `None` if not found.
pub fn find_channel<'a>(channels: &'a [Channel], name: &str) -> Option<&'a Channel> {
    channels.iter().find(|c| c.name == name)
}

/// Checks the registry for problems that would make runs collide: empty
/// names or sources, and duplicate names or store keys. Store keys are
/// compared after file-name sanitising, so `a/b` and `a_b` collide: two
/// channels sharing a blob would overwrite each other's series.
pub fn validate_channels(channels: &[Channel]) -> Result<(), String> {
    let mut names = std::collections::HashSet::new();
    let mut keys = std::collections::HashSet::new();

    for channel in channels {
        if channel.name.trim().is_empty() {
            return Err("channel with empty name".to_string());
        }
        if channel.source.trim().is_empty() {
            return Err(format!("channel '{}' has an empty source", channel.name));
        }
        if !names.insert(channel.name.as_str()) {
            return Err(format!("duplicate channel name '{}'", channel.name));
        }
        if !keys.insert(file_stem_for(channel.store_key())) {
            return Err(format!(
                "channel '{}' reuses store key '{}'",
                channel.name,
                channel.store_key()
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_defaults_to_name() {
        let channel = Channel::new("PM10", "92");
        assert_eq!(channel.store_key(), "PM10");

        let keyed = Channel {
            store_key: Some("krakow-pm10".to_string()),
            ..channel
        };
        assert_eq!(keyed.store_key(), "krakow-pm10");
    }

    #[test]
    fn test_source_url_appends_sensor_id_to_base() {
        let channel = Channel::new("PM10", "92");
        assert_eq!(
            channel.source_url("https://api.example.org/data/getData/"),
            "https://api.example.org/data/getData/92"
        );
    }

    #[test]
    fn test_source_url_keeps_full_urls() {
        let channel = Channel::new("PM10", "https://other.example.org/pm10.json");
        assert_eq!(
            channel.source_url("https://api.example.org"),
            "https://other.example.org/pm10.json"
        );
    }

    #[test]
    fn test_find_channel_returns_none_for_unknown_name() {
        let channels = vec![Channel::new("PM10", "92")];
        assert!(find_channel(&channels, "PM10").is_some());
        assert!(find_channel(&channels, "NO2").is_none());
    }

    #[test]
    fn test_no_duplicate_channel_names() {
        let channels = vec![Channel::new("PM10", "92"), Channel::new("PM10", "93")];
        let err = validate_channels(&channels).unwrap_err();
        assert!(err.contains("duplicate channel name"), "got: {}", err);
    }

    #[test]
    fn test_shared_store_key_is_rejected() {
        let a = Channel::new("PM10", "92");
        let b = Channel {
            store_key: Some("PM10".to_string()),
            ..Channel::new("PM10-backup", "93")
        };
        assert!(validate_channels(&[a, b]).is_err());
    }

    #[test]
    fn test_store_keys_colliding_after_sanitising_are_rejected() {
        let a = Channel {
            store_key: Some("krakow/pm10".to_string()),
            ..Channel::new("PM10", "92")
        };
        let b = Channel {
            store_key: Some("krakow_pm10".to_string()),
            ..Channel::new("PM10-backup", "93")
        };
        let err = validate_channels(&[a, b]).unwrap_err();
        assert!(err.contains("krakow_pm10"), "got: {}", err);
    }

    #[test]
    fn test_empty_source_is_rejected() {
        assert!(validate_channels(&[Channel::new("PM10", " ")]).is_err());
    }

    #[test]
    fn test_channels_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            channels: Vec<Channel>,
        }
        let doc: Doc = toml::from_str(
            r#"
            [[channels]]
            name = "PM10"
            source = "92"

            [[channels]]
            name = "PM2.5"
            source = "93"
            store_key = "pm25"
            "#,
        )
        .unwrap();
        assert_eq!(doc.channels.len(), 2);
        assert_eq!(doc.channels[1].store_key(), "pm25");
        assert!(validate_channels(&doc.channels).is_ok());
    }
}
