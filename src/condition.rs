//! Per-side condition state and the canonical condition encoding
//!
//! One `ConditionBuilder` exists per side (entry, exit). It accumulates the
//! trader's working selection - indicator, parameter values, operator,
//! companion function, combinator - and encodes a snapshot into one flat
//! comma-delimited string when the condition is finalized. The encoding is
//! positional: `indicator, params..., operator, function, functionParams...,
//! combinator`, with parameter values in metadata discovery order.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::metadata::{indicator_api_value, FieldDef, IndicatorDescriptor, MetadataService};
use crate::types::{Combinator, MetadataError};

/// Comparison operators offered by the engine, in display form
pub const OPERATORS: &[&str] = &[
    "Greater Than ( > )",
    "Lesser Than ( < )",
    "Equals ( = )",
    "Greater Than/Equal ( >= )",
    "Lesser Than/Equal ( <= )",
    "Crosses Above",
    "Crosses Below",
];

/// Symmetric polarity-inversion table over both display names and the raw
/// comparison symbols used by preset descriptors. `=` maps to itself.
static OPERATOR_INVERSIONS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        HashMap::from([
            ("Greater Than ( > )", "Lesser Than ( < )"),
            ("Lesser Than ( < )", "Greater Than ( > )"),
            ("Greater Than/Equal ( >= )", "Lesser Than/Equal ( <= )"),
            ("Lesser Than/Equal ( <= )", "Greater Than/Equal ( >= )"),
            ("Crosses Above", "Crosses Below"),
            ("Crosses Below", "Crosses Above"),
            ("Equals ( = )", "Equals ( = )"),
            (">", "<"),
            ("<", ">"),
            (">=", "<="),
            ("<=", ">="),
            ("=", "="),
        ])
    });

/// Polarity-inverted operator; operators outside the table pass through
pub fn invert_operator(operator: &str) -> &str {
    OPERATOR_INVERSIONS
        .get(operator)
        .copied()
        .unwrap_or(operator)
}

/// One finalized, immutable condition string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Condition(String);

impl Condition {
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Condition {
    fn from(s: String) -> Self {
        Condition(s)
    }
}

impl From<&str> for Condition {
    fn from(s: &str) -> Self {
        Condition(s.to_string())
    }
}

/// Ordered, append-only collection of finalized conditions for one side.
/// Order is evaluation and display order; removal is by position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
}

impl ConditionSet {
    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    /// Remove by position; out-of-range indices are ignored
    pub fn remove(&mut self, index: usize) -> Option<Condition> {
        if index < self.conditions.len() {
            Some(self.conditions.remove(index))
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Ticket identifying one metadata load request. Applying a result with a
/// stale ticket is a no-op, which gives last-selection-wins cancellation
/// when the trader switches indicators before a fetch resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Working selection for one side of the strategy
#[derive(Debug, Clone, Default)]
pub struct ConditionBuilder {
    indicator: String,
    descriptor: Option<IndicatorDescriptor>,
    params: Vec<(String, f64)>,
    operator: String,
    function: String,
    function_params: Vec<(String, f64)>,
    combinator: Option<Combinator>,
    generation: u64,
    loading: bool,
    load_error: bool,
    fallback: bool,
}

impl ConditionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indicator(&self) -> &str {
        &self.indicator
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator.unwrap_or(Combinator::And)
    }

    pub fn params(&self) -> &[(String, f64)] {
        &self.params
    }

    pub fn function_params(&self) -> &[(String, f64)] {
        &self.function_params
    }

    pub fn descriptor(&self) -> Option<&IndicatorDescriptor> {
        self.descriptor.as_ref()
    }

    /// A metadata load is in flight for the current selection
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The last metadata load for the current selection failed
    pub fn has_load_error(&self) -> bool {
        self.load_error
    }

    /// The current descriptor is the offline fallback dataset
    pub fn is_degraded(&self) -> bool {
        self.fallback
    }

    /// Record a new indicator selection and clear all metadata-derived
    /// state. Stale parameter values must not leak across indicator
    /// switches, so params and the companion function reset immediately;
    /// operator and combinator survive (they are indicator-independent).
    pub fn begin_indicator_load(&mut self, indicator: impl Into<String>) -> LoadTicket {
        self.indicator = indicator.into();
        self.generation += 1;
        self.loading = true;
        self.descriptor = None;
        self.params.clear();
        self.function.clear();
        self.function_params.clear();
        LoadTicket(self.generation)
    }

    /// Install a loaded descriptor: seed params from the indicator's own
    /// field defaults and auto-select the first companion function with its
    /// defaults. Returns false (and changes nothing) if the ticket is stale.
    pub fn apply_descriptor(
        &mut self,
        ticket: LoadTicket,
        descriptor: IndicatorDescriptor,
        fallback: bool,
    ) -> bool {
        if ticket.0 != self.generation {
            return false;
        }

        self.params = seed_from(descriptor.indicator_fields());
        if let Some(function) = descriptor.first_function() {
            self.function = function.name.clone();
            self.function_params = seed_from(&function.fields);
        } else {
            self.function.clear();
            self.function_params.clear();
        }
        self.descriptor = Some(descriptor);
        self.loading = false;
        self.load_error = false;
        self.fallback = fallback;
        true
    }

    /// Record a failed load: metadata stays cleared and the per-side error
    /// flag is raised. Stale tickets are ignored.
    pub fn fail_load(&mut self, ticket: LoadTicket) -> bool {
        if ticket.0 != self.generation {
            return false;
        }
        self.descriptor = None;
        self.params.clear();
        self.function.clear();
        self.function_params.clear();
        self.loading = false;
        self.load_error = true;
        self.fallback = false;
        true
    }

    /// Switch the companion function. Only names present in the loaded
    /// descriptor take effect; on success the function's params are reseeded
    /// to its defaults, discarding prior values.
    pub fn select_function(&mut self, name: &str) -> bool {
        let Some(fields) = self
            .descriptor
            .as_ref()
            .and_then(|d| d.function(name))
            .map(|f| f.fields.clone())
        else {
            return false;
        };
        self.function = name.to_string();
        self.function_params = seed_from(&fields);
        true
    }

    /// Update one indicator parameter by label; unknown labels are ignored
    pub fn set_param(&mut self, label: &str, value: f64) -> bool {
        set_by_label(&mut self.params, label, value)
    }

    /// Update one companion-function parameter by label
    pub fn set_function_param(&mut self, label: &str, value: f64) -> bool {
        set_by_label(&mut self.function_params, label, value)
    }

    pub fn set_operator(&mut self, operator: impl Into<String>) {
        self.operator = operator.into();
    }

    pub fn set_combinator(&mut self, combinator: Combinator) {
        self.combinator = Some(combinator);
    }

    /// Replace the parameter values wholesale. Used by preset seeding,
    /// which writes the preset's values after the metadata load resolves.
    pub fn seed_params(&mut self, params: Vec<(String, f64)>) {
        self.params = params;
    }

    /// Set the companion function and its values directly (preset seeding)
    pub fn seed_function(&mut self, name: impl Into<String>, params: Vec<(String, f64)>) {
        self.function = name.into();
        self.function_params = params;
    }

    /// Encode the current selection into its canonical flat string.
    ///
    /// No semantic validation happens here: operator/indicator compatibility
    /// is the engine's concern, not the composer's.
    pub fn finalize(&self) -> Condition {
        let mut tokens = Vec::with_capacity(4 + self.params.len() + self.function_params.len());
        tokens.push(self.indicator.clone());
        tokens.extend(self.params.iter().map(|(_, v)| format_number(*v)));
        tokens.push(self.operator.clone());
        tokens.push(self.function.clone());
        tokens.extend(self.function_params.iter().map(|(_, v)| format_number(*v)));
        tokens.push(self.combinator().to_string());
        Condition(tokens.join(","))
    }
}

/// Select an indicator by display label and load its metadata.
///
/// Structurally enforces load-then-seed ordering: the builder is seeded from
/// the descriptor only after the fetch for this exact selection resolves. A
/// newer selection made while the fetch is in flight wins via the ticket.
pub async fn select_indicator<M: MetadataService>(
    builder: &mut ConditionBuilder,
    service: &M,
    label: &str,
) -> Result<(), MetadataError> {
    let ticket = builder.begin_indicator_load(label);
    match service.indicator_descriptor(&indicator_api_value(label)).await {
        Ok(descriptor) => {
            builder.apply_descriptor(ticket, descriptor, false);
            Ok(())
        }
        Err(err) => {
            builder.fail_load(ticket);
            Err(err)
        }
    }
}

fn seed_from(fields: &[FieldDef]) -> Vec<(String, f64)> {
    fields
        .iter()
        .map(|f| (f.label.clone(), f.default_value))
        .collect()
}

fn set_by_label(params: &mut [(String, f64)], label: &str, value: f64) -> bool {
    for (name, slot) in params.iter_mut() {
        if name == label {
            *slot = value;
            return true;
        }
    }
    false
}

/// Render a numeric value the way the engine expects: integral values
/// without a trailing `.0`, fractional values as-is.
pub(crate) fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(json: serde_json::Value) -> IndicatorDescriptor {
        IndicatorDescriptor::from_raw(serde_json::from_value(json).unwrap())
    }

    fn ema_descriptor() -> IndicatorDescriptor {
        descriptor(json!({
            "Before": [{ "Name": "EMA", "a_label1": "Period", "a_value1": 9 }],
            "After": [
                { "Name": "EMA", "a_label1": "Period", "a_value1": 21 },
                { "Name": "SMA", "a_label1": "Period", "a_value1": 50 },
            ],
        }))
    }

    #[test]
    fn test_operator_inversion_is_involutive() {
        for op in OPERATORS {
            assert_eq!(invert_operator(invert_operator(op)), *op);
        }
        for sym in [">", "<", ">=", "<=", "="] {
            assert_eq!(invert_operator(invert_operator(sym)), sym);
        }
    }

    #[test]
    fn test_unknown_operator_passes_through() {
        assert_eq!(invert_operator("Divergence"), "Divergence");
    }

    #[test]
    fn test_apply_descriptor_seeds_defaults() {
        let mut builder = ConditionBuilder::new();
        let ticket = builder.begin_indicator_load("EMA");
        assert!(builder.is_loading());
        assert!(builder.apply_descriptor(ticket, ema_descriptor(), false));
        assert!(!builder.is_loading());
        assert_eq!(builder.params(), &[("Period".to_string(), 9.0)]);
        assert_eq!(builder.function(), "EMA");
        assert_eq!(builder.function_params(), &[("Period".to_string(), 21.0)]);
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let mut builder = ConditionBuilder::new();
        let old = builder.begin_indicator_load("EMA");
        let new = builder.begin_indicator_load("RSI");

        // Result from the superseded EMA fetch must not apply
        assert!(!builder.apply_descriptor(old, ema_descriptor(), false));
        assert!(builder.descriptor().is_none());
        assert!(builder.is_loading());

        let rsi = descriptor(json!({
            "Before": [{ "Name": "RSI", "a_label1": "Period", "a_value1": 14 }],
            "After": [{ "Name": "SMA", "a_label1": "Period", "a_value1": 20 }],
        }));
        assert!(builder.apply_descriptor(new, rsi, false));
        assert_eq!(builder.indicator(), "RSI");
        assert_eq!(builder.params(), &[("Period".to_string(), 14.0)]);
    }

    #[test]
    fn test_failed_load_clears_state() {
        let mut builder = ConditionBuilder::new();
        let ticket = builder.begin_indicator_load("EMA");
        builder.apply_descriptor(ticket, ema_descriptor(), false);

        let ticket = builder.begin_indicator_load("RSI");
        assert!(builder.fail_load(ticket));
        assert!(builder.has_load_error());
        assert!(builder.descriptor().is_none());
        assert!(builder.params().is_empty());
        assert!(builder.function().is_empty());
    }

    #[test]
    fn test_select_function_reseeds_params() {
        let mut builder = ConditionBuilder::new();
        let ticket = builder.begin_indicator_load("EMA");
        builder.apply_descriptor(ticket, ema_descriptor(), false);

        builder.set_function_param("Period", 34.0);
        assert!(builder.select_function("SMA"));
        assert_eq!(builder.function(), "SMA");
        // Prior values must not carry over to the new function
        assert_eq!(builder.function_params(), &[("Period".to_string(), 50.0)]);

        assert!(!builder.select_function("WMA"));
        assert_eq!(builder.function(), "SMA");
    }

    #[test]
    fn test_finalize_token_layout() {
        let mut builder = ConditionBuilder::new();
        let ticket = builder.begin_indicator_load("EMA");
        builder.apply_descriptor(ticket, ema_descriptor(), false);
        builder.set_param("Period", 7.0);
        builder.set_operator("Greater Than ( > )");
        builder.set_combinator(Combinator::And);

        let condition = builder.finalize();
        assert_eq!(condition.value(), "EMA,7,Greater Than ( > ),EMA,21,AND");

        let tokens: Vec<_> = condition.value().split(',').collect();
        assert_eq!(
            tokens.len(),
            4 + builder.params().len() + builder.function_params().len()
        );
        assert_eq!(tokens[0], "EMA");
        assert_eq!(*tokens.last().unwrap(), "AND");
    }

    #[test]
    fn test_finalize_renders_fractional_values() {
        let mut builder = ConditionBuilder::new();
        let st = descriptor(json!({
            "Before": [{
                "Name": "Super Trend",
                "a_label1": "Period", "a_value1": 7,
                "a_label2": "Multiplier", "a_value2": 3,
            }],
            "After": [{ "Name": "Close" }],
        }));
        let ticket = builder.begin_indicator_load("Super Trend");
        builder.apply_descriptor(ticket, st, false);
        builder.set_param("Multiplier", 2.5);
        builder.set_operator(">");
        builder.set_combinator(Combinator::Or);

        assert_eq!(builder.finalize().value(), "Super Trend,7,2.5,>,Close,OR");
    }

    #[test]
    fn test_set_param_unknown_label_ignored() {
        let mut builder = ConditionBuilder::new();
        let ticket = builder.begin_indicator_load("EMA");
        builder.apply_descriptor(ticket, ema_descriptor(), false);
        assert!(!builder.set_param("Multiplier", 2.0));
        assert_eq!(builder.params(), &[("Period".to_string(), 9.0)]);
    }

    #[test]
    fn test_condition_set_removal_by_position() {
        let mut set = ConditionSet::default();
        set.push("A,1,>,B,2,AND".into());
        set.push("C,3,<,D,4,OR".into());
        set.push("E,5,=,F,6,AND".into());

        assert_eq!(set.remove(1).unwrap().value(), "C,3,<,D,4,OR");
        assert_eq!(set.len(), 2);
        assert!(set.remove(5).is_none());
        let values: Vec<_> = set.iter().map(|c| c.value()).collect();
        assert_eq!(values, ["A,1,>,B,2,AND", "E,5,=,F,6,AND"]);
    }
}
