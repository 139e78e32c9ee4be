//! A single register of a remote node: cached value plus min/max/default.

use std::fmt;

use cyd_protocol::{follows_naming_convention, wire_name, AccessResponse, Slot, Timestamp};
use serde::Serialize;

use crate::codec::{CodecError, NativeValue, ValueCodec};

/// Cached state of one named register.
///
/// Instances are created and updated by the [`Registry`](crate::Registry);
/// the transport-facing operations (write, reset, refresh) live on
/// [`RegisterRef`](crate::RegisterRef).
#[derive(Debug, Clone)]
pub struct Register {
    name: String,
    codec: ValueCodec,
    value: AccessResponse,
    min: AccessResponse,
    max: AccessResponse,
    default: AccessResponse,
    mutable: Option<bool>,
    persistent: Option<bool>,
}

impl Register {
    /// Create a register from the first response seen for any of its slots.
    ///
    /// The response's value fixes the register's wire type; an `Empty`
    /// value carries no type and is rejected.
    pub fn new(name: &str, slot: Slot, response: AccessResponse) -> Result<Self, CodecError> {
        let codec = ValueCodec::from_wire(&response.value)?;
        if !follows_naming_convention(name) {
            tracing::warn!(register = %name, "register violates naming conventions");
        }
        let mut register = Self {
            name: name.to_string(),
            codec,
            value: AccessResponse::default(),
            min: AccessResponse::default(),
            max: AccessResponse::default(),
            default: AccessResponse::default(),
            mutable: None,
            persistent: None,
        };
        register.update(slot, response);
        Ok(register)
    }

    /// Merge a response into `slot`.
    ///
    /// The response replaces the stored one only if its timestamp is newer,
    /// or if it is zero.  Anomalies (type-check failure, flag changes,
    /// writable shadow slots) are logged and never block the update.
    /// Returns whether the slot was replaced.
    pub fn update(&mut self, slot: Slot, response: AccessResponse) -> bool {
        self.type_check(slot, &response);

        if slot.is_shadow() {
            if !shadow_flags_ok(&response) {
                tracing::warn!(
                    register = %wire_name(&self.name, slot),
                    "special function register should be persistent and immutable"
                );
            }
        } else {
            let reported = (Some(response.mutable), Some(response.persistent));
            if (self.mutable, self.persistent) != reported {
                if self.mutable.is_some() || self.persistent.is_some() {
                    tracing::warn!(
                        register = %self.name,
                        mutable = response.mutable,
                        persistent = response.persistent,
                        "register changed flags"
                    );
                }
                self.mutable = Some(response.mutable);
                self.persistent = Some(response.persistent);
            }
        }

        let current = self.slot_mut(slot);
        let apply = current.timestamp < response.timestamp || response.timestamp.is_unknown();
        if apply {
            *current = response;
        }
        apply
    }

    fn type_check(&self, slot: Slot, response: &AccessResponse) {
        let round_trip = self
            .codec
            .to_native(&response.value)
            .and_then(|native| self.codec.to_wire(&native));
        match round_trip {
            Ok(wire) if wire == response.value => {}
            Ok(wire) => tracing::warn!(
                register = %wire_name(&self.name, slot),
                expected = ?wire,
                got = ?response.value,
                "type check failed"
            ),
            Err(e) => tracing::warn!(
                register = %wire_name(&self.name, slot),
                dtype = %self.dtype(),
                error = %e,
                "type check failed"
            ),
        }
    }

    fn slot_ref(&self, slot: Slot) -> &AccessResponse {
        match slot {
            Slot::Value => &self.value,
            Slot::Min => &self.min,
            Slot::Max => &self.max,
            Slot::Default => &self.default,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut AccessResponse {
        match slot {
            Slot::Value => &mut self.value,
            Slot::Min => &mut self.min,
            Slot::Max => &mut self.max,
            Slot::Default => &mut self.default,
        }
    }

    /// Base name, without slot marker.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    /// Wire type as a string, e.g. `"natural16[1]"`.
    pub fn dtype(&self) -> String {
        self.codec.dtype()
    }

    /// Decoded content of `slot`; `NativeValue::None` if never received.
    pub fn slot(&self, slot: Slot) -> Result<NativeValue, CodecError> {
        self.codec.to_native(&self.slot_ref(slot).value)
    }

    /// Last raw response merged into `slot`.
    pub fn response(&self, slot: Slot) -> &AccessResponse {
        self.slot_ref(slot)
    }

    pub fn value(&self) -> Result<NativeValue, CodecError> {
        self.slot(Slot::Value)
    }

    pub fn min(&self) -> Result<NativeValue, CodecError> {
        self.slot(Slot::Min)
    }

    pub fn max(&self) -> Result<NativeValue, CodecError> {
        self.slot(Slot::Max)
    }

    pub fn default_value(&self) -> Result<NativeValue, CodecError> {
        self.slot(Slot::Default)
    }

    pub fn has_slot(&self, slot: Slot) -> bool {
        !self.slot_ref(slot).value.is_empty()
    }

    pub fn has_min(&self) -> bool {
        self.has_slot(Slot::Min)
    }

    pub fn has_max(&self) -> bool {
        self.has_slot(Slot::Max)
    }

    pub fn has_default(&self) -> bool {
        self.has_slot(Slot::Default)
    }

    pub fn mutable(&self) -> bool {
        self.mutable.unwrap_or(false)
    }

    pub fn persistent(&self) -> bool {
        self.persistent.unwrap_or(false)
    }

    /// Device time of the value slot, in seconds.
    pub fn timestamp(&self) -> f64 {
        self.value.timestamp.as_secs_f64()
    }

    pub fn timestamp_us(&self) -> u64 {
        self.value.timestamp.microsecond
    }

    pub fn snapshot(&self) -> RegisterSnapshot {
        RegisterSnapshot {
            name: self.name.clone(),
            dtype: self.dtype(),
            value: self.value().ok(),
            min: self.min().ok().filter(|v| !v.is_none()),
            max: self.max().ok().filter(|v| !v.is_none()),
            default: self.default_value().ok().filter(|v| !v.is_none()),
            mutable: self.mutable(),
            persistent: self.persistent(),
            timestamp: self.value.timestamp,
        }
    }
}

/// Shadow slots must be immutable and persistent.  An absent shadow answers
/// `Empty` with default flags, which is not an anomaly.
fn shadow_flags_ok(response: &AccessResponse) -> bool {
    response.value.is_empty() || (!response.mutable && response.persistent)
}

/// `natural16[1] navlight.brightness: value=100, default=300, mutable=true, persistent=true`
impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:", self.dtype(), self.name)?;
        let mut sep = " ";
        for (label, slot) in [
            ("value", Slot::Value),
            ("min", Slot::Min),
            ("max", Slot::Max),
            ("default", Slot::Default),
        ] {
            match self.slot(slot) {
                Ok(NativeValue::None) => continue,
                Ok(v) => write!(f, "{sep}{label}={v}")?,
                Err(e) => write!(f, "{sep}{label}=<{e}>")?,
            }
            sep = ", ";
        }
        if let Some(mutable) = self.mutable {
            write!(f, "{sep}mutable={mutable}")?;
            sep = ", ";
        }
        if let Some(persistent) = self.persistent {
            write!(f, "{sep}persistent={persistent}")?;
        }
        Ok(())
    }
}

/// Serializable point-in-time view of a register.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterSnapshot {
    pub name: String,
    pub dtype: String,
    pub value: Option<NativeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<NativeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<NativeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<NativeValue>,
    pub mutable: bool,
    pub persistent: bool,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyd_protocol::WireValue;

    fn resp(values: Vec<u16>, ts: u64, mutable: bool, persistent: bool) -> AccessResponse {
        AccessResponse {
            timestamp: Timestamp::from_micros(ts),
            mutable,
            persistent,
            value: WireValue::Natural16(values),
        }
    }

    fn brightness() -> Register {
        Register::new("navlight.brightness", Slot::Value, resp(vec![100], 1, true, true)).unwrap()
    }

    #[test]
    fn new_binds_codec_and_flags() {
        let reg = brightness();
        assert_eq!(reg.name(), "navlight.brightness");
        assert_eq!(reg.dtype(), "natural16[1]");
        assert_eq!(reg.value().unwrap(), NativeValue::Integer(100));
        assert!(reg.mutable());
        assert!(reg.persistent());
        assert!(!reg.has_default());
        assert_eq!(reg.timestamp_us(), 1);
    }

    #[test]
    fn empty_response_cannot_create_register() {
        let empty = AccessResponse::default();
        assert_eq!(
            Register::new("a.b", Slot::Value, empty).unwrap_err(),
            CodecError::Untyped
        );
    }

    #[test]
    fn register_created_from_shadow_slot_first() {
        let reg = Register::new("a.b", Slot::Default, resp(vec![3], 1, false, true)).unwrap();
        assert!(reg.has_default());
        assert_eq!(reg.value().unwrap(), NativeValue::None);
        assert!(!reg.mutable());
    }

    #[test]
    fn merge_is_idempotent() {
        let mut reg = brightness();
        let r = resp(vec![7], 5, true, true);
        assert!(reg.update(Slot::Value, r.clone()));
        let before = reg.response(Slot::Value).clone();
        assert!(!reg.update(Slot::Value, r));
        assert_eq!(reg.response(Slot::Value), &before);
    }

    #[test]
    fn merge_follows_timestamps() {
        let mut reg = brightness();
        assert!(reg.update(Slot::Value, resp(vec![10], 10, true, true)));
        assert_eq!(reg.value().unwrap(), NativeValue::Integer(10));

        assert!(!reg.update(Slot::Value, resp(vec![5], 5, true, true)));
        assert_eq!(reg.value().unwrap(), NativeValue::Integer(10));

        assert!(reg.update(Slot::Value, resp(vec![0], 0, true, true)));
        assert_eq!(reg.value().unwrap(), NativeValue::Integer(0));
    }

    #[test]
    fn shadow_slots_are_independent() {
        let mut reg = brightness();
        reg.update(Slot::Min, resp(vec![0], 1, false, true));
        reg.update(Slot::Max, resp(vec![1000], 1, false, true));
        assert_eq!(reg.min().unwrap(), NativeValue::Integer(0));
        assert_eq!(reg.max().unwrap(), NativeValue::Integer(1000));
        assert!(!reg.has_default());
        assert_eq!(reg.value().unwrap(), NativeValue::Integer(100));
    }

    #[test]
    fn shadow_flags_do_not_touch_register_flags() {
        let mut reg = brightness();
        reg.update(Slot::Default, resp(vec![300], 1, true, false));
        assert!(reg.mutable());
        assert!(reg.persistent());
    }

    #[test]
    fn absent_shadow_is_not_a_flag_anomaly() {
        let absent = AccessResponse {
            timestamp: Timestamp::from_micros(3),
            ..AccessResponse::default()
        };
        assert!(shadow_flags_ok(&absent));
        assert!(shadow_flags_ok(&resp(vec![300], 1, false, true)));
        assert!(!shadow_flags_ok(&resp(vec![300], 1, true, true)));
        assert!(!shadow_flags_ok(&resp(vec![300], 1, false, false)));

        let mut reg = brightness();
        reg.update(Slot::Max, absent);
        assert!(!reg.has_max());
        assert!(reg.mutable());
    }

    #[test]
    fn value_flags_follow_latest_value_response() {
        let mut reg = brightness();
        reg.update(Slot::Value, resp(vec![100], 2, false, true));
        assert!(!reg.mutable());
    }

    #[test]
    fn mismatched_response_is_still_merged() {
        let mut reg = brightness();
        let odd = AccessResponse {
            timestamp: Timestamp::from_micros(9),
            mutable: true,
            persistent: true,
            value: WireValue::Natural16(vec![1, 2]),
        };
        assert!(reg.update(Slot::Value, odd));
        assert!(matches!(
            reg.value(),
            Err(CodecError::LengthMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn display_omits_absent_slots() {
        let mut reg = brightness();
        reg.update(Slot::Default, resp(vec![300], 1, false, true));
        assert_eq!(
            reg.to_string(),
            "natural16[1] navlight.brightness: value=100, default=300, mutable=true, persistent=true"
        );
    }

    #[test]
    fn snapshot_serializes() {
        let reg = brightness();
        let json = serde_json::to_value(reg.snapshot()).unwrap();
        assert_eq!(json["name"], "navlight.brightness");
        assert_eq!(json["dtype"], "natural16[1]");
        assert_eq!(json["value"], 100);
        assert!(json.get("default").is_none());
    }
}
