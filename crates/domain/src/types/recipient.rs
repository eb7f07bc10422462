//! Recipient records for the integrated content-mapping API

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One email/domain pairing submitted for content mapping.
///
/// The submission vocabulary is fixed: sixteen fields, of which
/// `recipient`, `list` and `domain` are mandatory. Every field is
/// optional at the type level; mandatory presence is enforced when a
/// batch is assigned to a mapping request, so a partially-built record
/// is representable but never serialized.
///
/// After a mapping round trip the record additionally carries the
/// reconciled outcome: `success`, the retained `error` sub-fields, and
/// any response-supplied fields under `mapped`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    // Submission fields, in wire order
    pub recipient: Option<String>,
    pub list: Option<String>,
    pub domain: Option<String>,
    pub subid: Option<String>,
    pub sendingdomain: Option<String>,
    pub sendingip: Option<String>,
    pub numberofrecipients: Option<u32>,
    pub redirect: Option<String>,
    pub countrycode: Option<String>,
    pub metrocode: Option<String>,
    pub state: Option<String>,
    pub postalcode: Option<String>,
    pub gender: Option<String>,
    pub dayofbirth: Option<u8>,
    pub monthofbirth: Option<u8>,
    pub yearofbirth: Option<u16>,

    // Reconciled mapping outcome; unset until a response entry matched
    // this recipient by correlation key.
    pub success: Option<bool>,
    pub error: Option<MappingError>,
    pub mapped: BTreeMap<String, String>,
}

/// The retained sub-fields of a mapping error entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingError {
    pub str: String,
    pub num: String,
}

impl Recipient {
    /// Create a recipient with the three mandatory fields set.
    pub fn new(
        recipient: impl Into<String>,
        list: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            recipient: Some(recipient.into()),
            list: Some(list.into()),
            domain: Some(domain.into()),
            ..Self::default()
        }
    }

    /// The first missing mandatory field, if any.
    pub fn missing_mandatory_field(&self) -> Option<&'static str> {
        if self.recipient.is_none() {
            Some("recipient")
        } else if self.list.is_none() {
            Some("list")
        } else if self.domain.is_none() {
            Some("domain")
        } else {
            None
        }
    }

    /// The set submission fields as `(wire name, value)` pairs, in fixed
    /// vocabulary order, numeric values stringified.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let entries: [(&'static str, Option<String>); 16] = [
            ("recipient", self.recipient.clone()),
            ("list", self.list.clone()),
            ("domain", self.domain.clone()),
            ("subid", self.subid.clone()),
            ("sendingdomain", self.sendingdomain.clone()),
            ("sendingip", self.sendingip.clone()),
            ("numberofrecipients", self.numberofrecipients.map(|n| n.to_string())),
            ("redirect", self.redirect.clone()),
            ("countrycode", self.countrycode.clone()),
            ("metrocode", self.metrocode.clone()),
            ("state", self.state.clone()),
            ("postalcode", self.postalcode.clone()),
            ("gender", self.gender.clone()),
            ("dayofbirth", self.dayofbirth.map(|n| n.to_string())),
            ("monthofbirth", self.monthofbirth.map(|n| n.to_string())),
            ("yearofbirth", self.yearofbirth.map(|n| n.to_string())),
        ];
        entries.into_iter().filter_map(|(name, value)| value.map(|v| (name, v))).collect()
    }
}
