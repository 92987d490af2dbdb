use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub const DEFAULT_AUTO_LOCK_DELAY_MS: u64 = 10 * 60 * 1000;
pub const DEFAULT_PIN_LENGTH: usize = 4;

/// Lock policy. Persisted as JSON under the `security_config` key with camelCase field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    /// Idle time after which the gate locks itself. `0` disables auto-lock.
    pub auto_lock_delay_ms: u64,
    /// Lock whenever the view becomes visible again while a PIN is set.
    pub require_pin_on_resume: bool,
    /// Advisory flag for the UI: hide content while the app sits in the task switcher.
    pub hide_content_in_multitask: bool,
    pub pin_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            auto_lock_delay_ms: DEFAULT_AUTO_LOCK_DELAY_MS,
            require_pin_on_resume: true,
            hide_content_in_multitask: true,
            pin_length: DEFAULT_PIN_LENGTH,
        }
    }
}

impl SecurityConfig {
    /// Shallow merge of `patch` over `self`. Out of range values are replaced with defaults, so
    /// the result always satisfies `auto_lock_delay_ms >= 0` and `pin_length > 0`.
    pub fn merged(self, patch: &SecurityConfigPatch) -> Self {
        let auto_lock_delay_ms = match patch.auto_lock_delay_ms {
            Some(v) if v < 0 => {
                warn!("Auto-lock delay {v}ms is negative, falling back to {DEFAULT_AUTO_LOCK_DELAY_MS}ms");
                DEFAULT_AUTO_LOCK_DELAY_MS
            }
            Some(v) => v as u64,
            None => self.auto_lock_delay_ms,
        };

        let pin_length = match patch.pin_length {
            Some(v) if v <= 0 => {
                warn!("PIN length {v} is not positive, falling back to {DEFAULT_PIN_LENGTH}");
                DEFAULT_PIN_LENGTH
            }
            Some(v) => v as usize,
            None => self.pin_length,
        };

        Self {
            auto_lock_delay_ms,
            require_pin_on_resume: patch
                .require_pin_on_resume
                .unwrap_or(self.require_pin_on_resume),
            hide_content_in_multitask: patch
                .hide_content_in_multitask
                .unwrap_or(self.hide_content_in_multitask),
            pin_length,
        }
    }

    /// Auto-lock deadline, or `None` when auto-lock is disabled.
    pub fn auto_lock_delay(&self) -> Option<Duration> {
        (self.auto_lock_delay_ms > 0).then(|| Duration::from_millis(self.auto_lock_delay_ms))
    }
}

/// Partial update of [SecurityConfig]. Also used to read the stored record, so that fields missing
/// from an older record fall back to whatever they are merged over.
///
/// Numbers are signed on purpose: a negative delay must be representable to be healed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_lock_delay_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_pin_on_resume: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_content_in_multitask: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_length: Option<i64>,
}

impl SecurityConfigPatch {
    /// Reads the stored record field by field. A field with an unusable value is dropped on its
    /// own, the rest of the record still applies. Only a record that isn't a JSON object fails.
    pub fn from_stored(raw: &str) -> Result<Self, serde_json::Error> {
        let fields = serde_json::from_str::<Map<String, Value>>(raw)?;
        Ok(Self {
            auto_lock_delay_ms: stored_integer(&fields, "autoLockDelayMs"),
            require_pin_on_resume: stored_field(&fields, "requirePinOnResume"),
            hide_content_in_multitask: stored_field(&fields, "hideContentInMultitask"),
            pin_length: stored_integer(&fields, "pinLength"),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_auto_lock_delay_ms(self, v: i64) -> Self {
        Self {
            auto_lock_delay_ms: Some(v),
            ..self
        }
    }

    pub fn with_require_pin_on_resume(self, v: bool) -> Self {
        Self {
            require_pin_on_resume: Some(v),
            ..self
        }
    }

    pub fn with_hide_content_in_multitask(self, v: bool) -> Self {
        Self {
            hide_content_in_multitask: Some(v),
            ..self
        }
    }

    pub fn with_pin_length(self, v: i64) -> Self {
        Self {
            pin_length: Some(v),
            ..self
        }
    }
}

fn stored_field<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str) -> Option<T> {
    let value = fields.get(key)?;
    serde_json::from_value(value.clone())
        .inspect_err(|e| warn!("Ignoring stored {key}: {e}"))
        .ok()
}

/// Whole numbers outside the `i64` range saturate rather than being dropped.
fn stored_integer(fields: &Map<String, Value>, key: &str) -> Option<i64> {
    let value = fields.get(key)?;
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    if value.as_u64().is_some() {
        return Some(i64::MAX);
    }
    match value.as_f64() {
        Some(v) if v.fract() == 0.0 => Some(v as i64),
        _ => {
            warn!("Ignoring stored {key}, {value} is not an integer");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;

    use super::{SecurityConfig, SecurityConfigPatch, DEFAULT_AUTO_LOCK_DELAY_MS};

    #[test]
    fn test_merge_only_touches_given_fields() {
        let config = SecurityConfig::default().merged(
            &SecurityConfigPatch::default()
                .with_auto_lock_delay_ms(1000)
                .with_require_pin_on_resume(false),
        );

        assert_eq!(config.auto_lock_delay_ms, 1000);
        assert!(!config.require_pin_on_resume);
        assert!(config.hide_content_in_multitask);
        assert_eq!(config.pin_length, 4);
    }

    #[test]
    fn test_negative_delay_is_healed() {
        let config = SecurityConfig::default()
            .merged(&SecurityConfigPatch::default().with_auto_lock_delay_ms(1000))
            .merged(&SecurityConfigPatch::default().with_auto_lock_delay_ms(-5));

        assert_eq!(config.auto_lock_delay_ms, DEFAULT_AUTO_LOCK_DELAY_MS);
        assert_eq!(config.auto_lock_delay_ms, 600_000);
    }

    #[test]
    fn test_non_positive_pin_length_is_healed() {
        let config = SecurityConfig::default()
            .merged(&SecurityConfigPatch::default().with_pin_length(0));
        assert_eq!(config.pin_length, 4);

        let config = SecurityConfig::default()
            .merged(&SecurityConfigPatch::default().with_pin_length(6));
        assert_eq!(config.pin_length, 6);
    }

    #[test]
    fn test_zero_delay_disables_auto_lock() {
        let config = SecurityConfig::default()
            .merged(&SecurityConfigPatch::default().with_auto_lock_delay_ms(0));
        assert_eq!(config.auto_lock_delay(), None);
        assert_eq!(
            SecurityConfig::default().auto_lock_delay(),
            Some(Duration::from_secs(600))
        );
    }

    #[test]
    fn test_stored_record_uses_camel_case() -> Result<()> {
        let json = serde_json::to_value(SecurityConfig::default())?;
        assert_eq!(json["autoLockDelayMs"], 600_000);
        assert_eq!(json["requirePinOnResume"], true);
        assert_eq!(json["hideContentInMultitask"], true);
        assert_eq!(json["pinLength"], 4);
        Ok(())
    }

    #[test]
    fn test_partial_record_merges_over_defaults() -> Result<()> {
        let patch = SecurityConfigPatch::from_stored(
            r#"{"requirePinOnResume": false, "somethingElse": 1}"#,
        )?;
        let config = SecurityConfig::default().merged(&patch);

        assert!(!config.require_pin_on_resume);
        assert_eq!(config.auto_lock_delay_ms, DEFAULT_AUTO_LOCK_DELAY_MS);
        Ok(())
    }

    #[test]
    fn test_bad_stored_field_keeps_the_others() -> Result<()> {
        let patch = SecurityConfigPatch::from_stored(
            r#"{"autoLockDelayMs": 18446744073709551615, "requirePinOnResume": "yes", "hideContentInMultitask": false, "pinLength": 6}"#,
        )?;
        assert_eq!(patch.auto_lock_delay_ms, Some(i64::MAX));
        assert_eq!(patch.require_pin_on_resume, None);
        assert_eq!(patch.hide_content_in_multitask, Some(false));
        assert_eq!(patch.pin_length, Some(6));

        let config = SecurityConfig::default().merged(&patch);
        assert_eq!(config.auto_lock_delay_ms, i64::MAX as u64);
        assert!(config.require_pin_on_resume);
        assert!(!config.hide_content_in_multitask);
        Ok(())
    }

    #[test]
    fn test_fractional_delay_is_ignored() -> Result<()> {
        let patch = SecurityConfigPatch::from_stored(r#"{"autoLockDelayMs": 1.5, "pinLength": 6}"#)?;
        assert_eq!(patch.auto_lock_delay_ms, None);
        assert_eq!(patch.pin_length, Some(6));
        Ok(())
    }

    #[test]
    fn test_huge_delays_saturate() -> Result<()> {
        let patch = SecurityConfigPatch::from_stored(r#"{"autoLockDelayMs": 1e30}"#)?;
        assert_eq!(patch.auto_lock_delay_ms, Some(i64::MAX));

        let patch = SecurityConfigPatch::from_stored(r#"{"autoLockDelayMs": -1e30}"#)?;
        assert_eq!(patch.auto_lock_delay_ms, Some(i64::MIN));
        let config = SecurityConfig::default().merged(&patch);
        assert_eq!(config.auto_lock_delay_ms, DEFAULT_AUTO_LOCK_DELAY_MS);
        Ok(())
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        assert!(SecurityConfigPatch::from_stored("[1, 2]").is_err());
        assert!(SecurityConfigPatch::from_stored("{not json").is_err());
    }
}
