//! Indicator metadata: wire types, indexed-field extraction, and the
//! `MetadataService` seam
//!
//! The remote engine describes every indicator at runtime: a `Before` group
//! (the indicator's own numeric inputs) and an `After` group (companion
//! functions, each with its own inputs). Records have variable shape - the
//! numeric inputs arrive as indexed keys (`a_label1`/`a_value1`,
//! `a_label2`/`a_value2`, ...) rather than an array. Parsing converts that
//! convention into explicit ordered field lists exactly once, so the rest of
//! the crate never probes string keys.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Deserialize;

use crate::types::MetadataError;

/// One configurable numeric input of an indicator or companion function
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub label: String,
    pub default_value: f64,
}

/// A named record with its discovered numeric inputs, in discovery order.
///
/// Field order must survive into the encoded condition string: the encoding
/// is positional and carries no field names, so reordering corrupts the
/// backtest request silently.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGroup {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// Parsed descriptor for one indicator
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndicatorDescriptor {
    pub before: Vec<FieldGroup>,
    pub after: Vec<FieldGroup>,
}

impl IndicatorDescriptor {
    pub fn from_raw(raw: RawDescriptor) -> Self {
        IndicatorDescriptor {
            before: raw.before.iter().map(FieldGroup::from_record).collect(),
            after: raw.after.iter().map(FieldGroup::from_record).collect(),
        }
    }

    /// The indicator's own inputs (first `Before` record, if any)
    pub fn indicator_fields(&self) -> &[FieldDef] {
        self.before.first().map(|g| g.fields.as_slice()).unwrap_or(&[])
    }

    /// Companion function looked up by exact name
    pub fn function(&self, name: &str) -> Option<&FieldGroup> {
        self.after.iter().find(|f| f.name == name)
    }

    /// First companion function, auto-selected after a metadata load
    pub fn first_function(&self) -> Option<&FieldGroup> {
        self.after.first()
    }
}

impl FieldGroup {
    fn from_record(record: &RawRecord) -> Self {
        FieldGroup {
            name: record.name.clone(),
            fields: extract_fields(record),
        }
    }
}

/// Raw `/technical_param` response before field discovery
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDescriptor {
    #[serde(rename = "Before", default)]
    pub before: Vec<RawRecord>,
    #[serde(rename = "After", default)]
    pub after: Vec<RawRecord>,
}

/// One descriptor record with its variable-shape indexed keys kept verbatim
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRecord {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Generic `{ "Name": ... }` list entry used by dropdown-style responses
#[derive(Debug, Clone, Deserialize)]
pub struct NamedEntry {
    #[serde(rename = "Name")]
    pub name: String,
}

/// Scan one record's indexed keys into an ordered field list.
///
/// 1-based contiguous scan: `a_label1`, `a_label2`, ... until the first
/// missing or empty label. A gap terminates the scan - this is a contract
/// with the metadata source, not a sparse map. A field whose `a_value{i}`
/// is absent or non-numeric defaults to 1.
pub fn extract_fields(record: &RawRecord) -> Vec<FieldDef> {
    let mut fields = Vec::new();
    let mut index = 1usize;

    loop {
        let label = match record.extra.get(&format!("a_label{index}")) {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ => break,
        };

        let default_value = record
            .extra
            .get(&format!("a_value{index}"))
            .and_then(value_as_f64)
            .unwrap_or(1.0);

        fields.push(FieldDef {
            label,
            default_value,
        });
        index += 1;
    }

    fields
}

fn value_as_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Service seam
// ============================================================================

/// Read side of the remote engine: indicator descriptors and the preset
/// catalog. The HTTP implementation lives in `api`; tests substitute mocks.
pub trait MetadataService {
    fn indicator_descriptor(
        &self,
        indicator: &str,
    ) -> impl std::future::Future<Output = Result<IndicatorDescriptor, MetadataError>>;

    fn preset_catalog(
        &self,
    ) -> impl std::future::Future<Output = Result<crate::preset::PresetCatalog, MetadataError>>;
}

/// Fetch a descriptor, degrading to the static fallback dataset on failure.
///
/// Returns the descriptor and whether the fallback was substituted, so the
/// caller can surface degraded mode to the trader.
pub async fn descriptor_or_fallback<M: MetadataService>(
    service: &M,
    indicator: &str,
) -> (IndicatorDescriptor, bool) {
    match service.indicator_descriptor(indicator).await {
        Ok(descriptor) => (descriptor, false),
        Err(err) => {
            tracing::warn!("descriptor load failed for {indicator}, using fallback: {err}");
            (fallback_descriptor(), true)
        }
    }
}

// ============================================================================
// Static fallback dataset (offline/degraded mode)
// ============================================================================

/// Hard-coded descriptor substituted when the metadata service is down.
/// Price series have no tunable inputs, so both groups carry empty fields.
pub fn fallback_descriptor() -> IndicatorDescriptor {
    let plain = |name: &str| FieldGroup {
        name: name.to_string(),
        fields: Vec::new(),
    };
    IndicatorDescriptor {
        before: ["Close", "Open", "High", "Low"].map(plain).to_vec(),
        after: ["SMA", "EMA"].map(plain).to_vec(),
    }
}

/// Indicator names offered when the catalog omits its own list
pub const FALLBACK_INDICATORS: &[&str] = &[
    "ADX",
    "Aroon Oscillator",
    "ATR",
    "Bollinger Band Lower",
    "Bollinger Band Middle",
    "Bollinger Band Upper",
    "CCI",
    "Close",
    "Day High",
    "Day Low",
    "Day Open",
    "DI Minus",
    "DI Plus",
    "EMA",
    "EMA High",
    "EMA Low",
    "High",
    "Low",
    "MACD",
    "MACD Signal",
    "Momentum",
    "Money Flow Index",
    "Open",
    "Parabolic SAR",
    "RSI",
    "Super Trend",
];

/// Display label -> API request value.
///
/// Most labels pass through unchanged; the raw price series are lowercased
/// on the wire. Unknown labels are lowercased with whitespace collapsed.
static INDICATOR_API_VALUES: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        HashMap::from([
            ("EMA", "EMA"),
            ("EMA High", "EMA High"),
            ("EMA Low", "EMA Low"),
            ("SMA", "SMA"),
            ("MACD", "MACD"),
            ("MACD Signal", "MACD Signal"),
            ("Super Trend", "Super Trend"),
            ("Parabolic SAR", "Parabolic SAR"),
            ("Bollinger Band Middle", "Bollinger Band Middle"),
            ("Bollinger Band Upper", "Bollinger Band Upper"),
            ("Bollinger Band Lower", "Bollinger Band Lower"),
            ("Close", "close"),
            ("Open", "open"),
            ("High", "high"),
            ("Low", "low"),
        ])
    });

pub fn indicator_api_value(label: &str) -> String {
    if let Some(value) = INDICATOR_API_VALUES.get(label) {
        return (*value).to_string();
    }
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
