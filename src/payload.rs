//! Payload compiler: the deterministic transform from composer state to the
//! engine's submission structure
//!
//! Field names below are the remote engine's contract and must match
//! exactly, including its misspelled `AT_DailyParamters` key. All numeric
//! leg fields travel as strings. The compiler performs no I/O and never
//! builds a partial payload: validation either passes and the full snapshot
//! is assembled, or it fails with an enumerated reason.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::condition::{format_number, ConditionSet};
use crate::legs::{TradeLeg, TradeLegSet};
use crate::types::{
    BacktestPeriod, ExpiryType, RiskParams, Schedule, TradingDay, ValidationError, Validity,
};

pub const TABNAME: &str = "AT_Backtest";
pub const REQUEST_ADD: &str = "ADD";

/// Read-only view of everything the compiler needs. Borrowed from the
/// composer at submit time; the compiler never mutates source state.
#[derive(Debug, Clone, Copy)]
pub struct StrategySnapshot<'a> {
    pub symbol: &'a str,
    pub exchange: &'a str,
    pub validity: Validity,
    pub expiry_type: ExpiryType,
    pub time_frame: &'a str,
    pub entry_legs: &'a TradeLegSet,
    pub entry_conditions: &'a ConditionSet,
    pub exit_conditions: &'a ConditionSet,
    pub schedule: &'a Schedule,
    pub risk: &'a RiskParams,
    pub period: &'a BacktestPeriod,
}

/// Complete submission payload in wire shape
#[derive(Debug, Clone, Serialize)]
pub struct BacktestRequest {
    pub validation: String,
    #[serde(rename = "Tabname")]
    pub tabname: &'static str,
    #[serde(rename = "Request")]
    pub request: &'static str,
    #[serde(rename = "Validity")]
    pub validity: String,
    pub symbolchart: String,
    pub exchange: String,
    #[serde(rename = "ExpiryType")]
    pub expiry_type: String,
    #[serde(rename = "TimeFrame")]
    pub time_frame: String,
    #[serde(rename = "AT_EntryParameters")]
    pub entry_parameters: Vec<LegRecord>,
    #[serde(rename = "AT_EntryParameters_Reverse")]
    pub entry_parameters_reverse: Vec<LegRecord>,
    #[serde(rename = "AT_TargetParameters")]
    pub target_parameters: Vec<TargetRecord>,
    #[serde(rename = "AT_ExitParameters")]
    pub exit_parameters: Vec<StopLossRecord>,
    // The engine's key really is spelled this way
    #[serde(rename = "AT_DailyParamters")]
    pub daily_parameters: Vec<DailyRecord>,
    #[serde(rename = "AT_TechnicalParameters")]
    pub technical_parameters: Vec<TechnicalRecord>,
    #[serde(rename = "AT_TechnicalParametersExit")]
    pub technical_parameters_exit: Vec<TechnicalRecord>,
    #[serde(rename = "AT_ComputationTime")]
    pub computation_time: Vec<ComputationRecord>,
    #[serde(rename = "AT_BackTestParameters")]
    pub backtest_parameters: Vec<DateRangeRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegRecord {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Instrument")]
    pub instrument: String,
    #[serde(rename = "BuySell")]
    pub buy_sell: String,
    #[serde(rename = "Qty")]
    pub qty: String,
    #[serde(rename = "StrikeType")]
    pub strike_type: String,
    #[serde(rename = "Type")]
    pub price_type: String,
    #[serde(rename = "Tgt")]
    pub target: String,
    #[serde(rename = "SL")]
    pub stoploss: String,
    #[serde(rename = "TrailTGT")]
    pub trail_target: String,
    #[serde(rename = "TrailSL")]
    pub trail_stoploss: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetRecord {
    #[serde(rename = "FixedProfit")]
    pub fixed_profit: String,
    #[serde(rename = "Type")]
    pub basis: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopLossRecord {
    #[serde(rename = "FixedLoss")]
    pub fixed_loss: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyRecord {
    #[serde(rename = "Monday")]
    pub monday: String,
    #[serde(rename = "Tuesday")]
    pub tuesday: String,
    #[serde(rename = "Wednesday")]
    pub wednesday: String,
    #[serde(rename = "Thursday")]
    pub thursday: String,
    #[serde(rename = "Friday")]
    pub friday: String,
    #[serde(rename = "TimeFrame")]
    pub time_frame: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TechnicalRecord {
    pub value: String,
    #[serde(rename = "TimeFrame")]
    pub time_frame: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputationRecord {
    #[serde(rename = "EntryTime")]
    pub entry_time: String,
    #[serde(rename = "ExitTime")]
    pub exit_time: String,
    pub nooftimes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRangeRecord {
    pub fromdate: String,
    pub todate: String,
}

/// Compile the snapshot at the current local time
pub fn compile(snapshot: &StrategySnapshot<'_>) -> Result<BacktestRequest, ValidationError> {
    compile_at(snapshot, Local::now())
}

/// Compile the snapshot with an explicit timestamp (deterministic for tests)
pub fn compile_at(
    snapshot: &StrategySnapshot<'_>,
    now: DateTime<Local>,
) -> Result<BacktestRequest, ValidationError> {
    validate(snapshot)?;

    let legs: Vec<LegRecord> = snapshot
        .entry_legs
        .legs()
        .iter()
        .map(|leg| leg_record(snapshot.symbol, leg))
        .collect();
    let mirrored: Vec<LegRecord> = snapshot
        .entry_legs
        .mirror()
        .iter()
        .map(|leg| leg_record(snapshot.symbol, leg))
        .collect();

    Ok(BacktestRequest {
        validation: validation_timestamp(now),
        tabname: TABNAME,
        request: REQUEST_ADD,
        validity: snapshot.validity.to_string(),
        symbolchart: snapshot.symbol.to_string(),
        exchange: snapshot.exchange.to_string(),
        expiry_type: snapshot.expiry_type.to_string(),
        time_frame: snapshot.time_frame.to_string(),
        entry_parameters: legs,
        entry_parameters_reverse: mirrored,
        target_parameters: vec![TargetRecord {
            fixed_profit: format_number(snapshot.risk.fixed_profit),
            basis: snapshot.risk.target_basis.as_str().to_string(),
        }],
        exit_parameters: vec![StopLossRecord {
            fixed_loss: format_number(snapshot.risk.stop_loss),
        }],
        daily_parameters: vec![daily_record(snapshot.schedule)],
        technical_parameters: technical_records(snapshot.entry_conditions, snapshot.time_frame),
        technical_parameters_exit: technical_records(snapshot.exit_conditions, snapshot.time_frame),
        computation_time: vec![ComputationRecord {
            entry_time: snapshot.schedule.start.format("%H:%M").to_string(),
            exit_time: snapshot.schedule.end.format("%H:%M").to_string(),
            nooftimes: snapshot.schedule.no_of_times.to_string(),
        }],
        backtest_parameters: vec![DateRangeRecord {
            fromdate: snapshot.period.from.format("%Y-%m-%d").to_string(),
            todate: snapshot.period.to.format("%Y-%m-%d").to_string(),
        }],
    })
}

/// Pre-submit gate. Reasons are checked in display order; the first failure
/// blocks submission.
pub fn validate(snapshot: &StrategySnapshot<'_>) -> Result<(), ValidationError> {
    if snapshot.symbol.trim().is_empty() {
        return Err(ValidationError::NoSymbol);
    }
    if snapshot.entry_legs.is_empty() {
        return Err(ValidationError::NoEntryLegs);
    }
    if snapshot.schedule.days.is_empty() {
        return Err(ValidationError::NoTradingDays);
    }
    if snapshot.period.from > snapshot.period.to {
        return Err(ValidationError::InvalidDateRange {
            from: snapshot.period.from,
            to: snapshot.period.to,
        });
    }
    if snapshot.entry_conditions.is_empty() {
        return Err(ValidationError::NoEntryConditions);
    }
    Ok(())
}

/// 17-character `yyyyMMddHHmmssSSS` request id
pub fn validation_timestamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d%H%M%S%3f").to_string()
}

fn leg_record(symbol: &str, leg: &TradeLeg) -> LegRecord {
    LegRecord {
        symbol: symbol.to_string(),
        instrument: leg.instrument.to_string(),
        buy_sell: leg.side.to_string(),
        qty: leg.quantity.to_string(),
        strike_type: leg.strike.to_string(),
        price_type: leg.price_type.to_string(),
        target: format_number(leg.target),
        stoploss: format_number(leg.stoploss),
        trail_target: "0".to_string(),
        trail_stoploss: "0".to_string(),
    }
}

fn daily_record(schedule: &Schedule) -> DailyRecord {
    let flag = |day| {
        if schedule.has_day(day) {
            "True".to_string()
        } else {
            "False".to_string()
        }
    };
    DailyRecord {
        monday: flag(TradingDay::Monday),
        tuesday: flag(TradingDay::Tuesday),
        wednesday: flag(TradingDay::Wednesday),
        thursday: flag(TradingDay::Thursday),
        friday: flag(TradingDay::Friday),
        time_frame: "Weekly".to_string(),
    }
}

fn technical_records(conditions: &ConditionSet, time_frame: &str) -> Vec<TechnicalRecord> {
    conditions
        .iter()
        .map(|c| TechnicalRecord {
            value: c.value().to_string(),
            time_frame: time_frame.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Instrument;
    use chrono::{NaiveDate, TimeZone};

    fn period(from: (i32, u32, u32), to: (i32, u32, u32)) -> BacktestPeriod {
        BacktestPeriod {
            from: NaiveDate::from_ymd_opt(from.0, from.1, from.2).unwrap(),
            to: NaiveDate::from_ymd_opt(to.0, to.1, to.2).unwrap(),
        }
    }

    struct Fixture {
        legs: TradeLegSet,
        entry_conditions: ConditionSet,
        exit_conditions: ConditionSet,
        schedule: Schedule,
        risk: RiskParams,
        period: BacktestPeriod,
    }

    impl Fixture {
        fn nifty() -> Self {
            let mut entry_conditions = ConditionSet::default();
            entry_conditions.push("EMA,7,Greater Than ( > ),EMA,21,AND".into());
            Fixture {
                legs: TradeLegSet::entry(65, Instrument::Ce),
                entry_conditions,
                exit_conditions: ConditionSet::default(),
                schedule: Schedule::default(),
                risk: RiskParams::default(),
                period: period((2026, 1, 30), (2026, 2, 6)),
            }
        }

        fn snapshot(&self) -> StrategySnapshot<'_> {
            StrategySnapshot {
                symbol: "NIFTY",
                exchange: "NFO",
                validity: Validity::Intraday,
                expiry_type: ExpiryType::Weekly,
                time_frame: "5",
                entry_legs: &self.legs,
                entry_conditions: &self.entry_conditions,
                exit_conditions: &self.exit_conditions,
                schedule: &self.schedule,
                risk: &self.risk,
                period: &self.period,
            }
        }
    }

    #[test]
    fn test_nifty_scenario_payload() {
        let fixture = Fixture::nifty();
        let request = compile(&fixture.snapshot()).unwrap();

        assert_eq!(request.tabname, "AT_Backtest");
        assert_eq!(request.request, "ADD");
        assert_eq!(request.symbolchart, "NIFTY");
        assert_eq!(request.exchange, "NFO");

        assert_eq!(request.entry_parameters.len(), 1);
        let leg = &request.entry_parameters[0];
        assert_eq!(leg.qty, "65");
        assert_eq!(leg.buy_sell, "BUY");
        assert_eq!(leg.instrument, "CE");
        assert_eq!(leg.strike_type, "ATM");
        assert_eq!(leg.price_type, "Pts");
        assert_eq!(leg.target, "0");
        assert_eq!(leg.trail_target, "0");

        assert_eq!(request.entry_parameters_reverse.len(), 1);
        assert_eq!(request.entry_parameters_reverse[0].buy_sell, "SELL");
        assert_eq!(request.entry_parameters_reverse[0].qty, "65");

        let daily = &request.daily_parameters[0];
        for flag in [&daily.monday, &daily.tuesday, &daily.wednesday, &daily.thursday, &daily.friday] {
            assert_eq!(flag, "True");
        }
        assert_eq!(daily.time_frame, "Weekly");

        assert_eq!(request.technical_parameters.len(), 1);
        assert_eq!(
            request.technical_parameters[0].value,
            "EMA,7,Greater Than ( > ),EMA,21,AND"
        );
        assert_eq!(request.technical_parameters[0].time_frame, "5");
        assert!(request.technical_parameters_exit.is_empty());

        assert_eq!(request.computation_time[0].entry_time, "09:15");
        assert_eq!(request.computation_time[0].exit_time, "15:30");
        assert_eq!(request.computation_time[0].nooftimes, "0");

        assert_eq!(request.backtest_parameters[0].fromdate, "2026-01-30");
        assert_eq!(request.backtest_parameters[0].todate, "2026-02-06");
    }

    #[test]
    fn test_validation_timestamp_is_17_chars() {
        let now = Local.with_ymd_and_hms(2026, 2, 6, 9, 15, 30).unwrap();
        let ts = validation_timestamp(now);
        assert_eq!(ts.len(), 17);
        assert!(ts.starts_with("20260206091530"));
    }

    #[test]
    fn test_wire_field_names() {
        let fixture = Fixture::nifty();
        let request = compile(&fixture.snapshot()).unwrap();
        let json = serde_json::to_value(&request).unwrap();

        for key in [
            "validation",
            "Tabname",
            "Request",
            "Validity",
            "symbolchart",
            "exchange",
            "ExpiryType",
            "TimeFrame",
            "AT_EntryParameters",
            "AT_EntryParameters_Reverse",
            "AT_TargetParameters",
            "AT_ExitParameters",
            "AT_DailyParamters",
            "AT_TechnicalParameters",
            "AT_TechnicalParametersExit",
            "AT_ComputationTime",
            "AT_BackTestParameters",
        ] {
            assert!(json.get(key).is_some(), "missing wire key {key}");
        }

        let leg = &json["AT_EntryParameters"][0];
        for key in [
            "Symbol", "Instrument", "BuySell", "Qty", "StrikeType", "Type", "Tgt", "SL",
            "TrailTGT", "TrailSL",
        ] {
            assert!(leg.get(key).is_some(), "missing leg key {key}");
        }
        assert_eq!(json["AT_TargetParameters"][0]["Type"], "Value");
        assert_eq!(json["AT_ExitParameters"][0]["FixedLoss"], "0");
        assert_eq!(json["AT_ComputationTime"][0]["nooftimes"], "0");
    }

    #[test]
    fn test_validation_failures_trigger_independently() {
        let base = Fixture::nifty();

        let mut f = Fixture::nifty();
        f.schedule.days.clear();
        assert_eq!(validate(&f.snapshot()), Err(ValidationError::NoTradingDays));

        let mut f = Fixture::nifty();
        f.period = period((2026, 2, 6), (2026, 1, 30));
        assert!(matches!(
            validate(&f.snapshot()),
            Err(ValidationError::InvalidDateRange { .. })
        ));

        let mut f = Fixture::nifty();
        f.entry_conditions = ConditionSet::default();
        assert_eq!(
            validate(&f.snapshot()),
            Err(ValidationError::NoEntryConditions)
        );

        let mut snapshot = base.snapshot();
        snapshot.symbol = "  ";
        assert_eq!(validate(&snapshot), Err(ValidationError::NoSymbol));

        let empty_legs = TradeLegSet::exit(65, Instrument::Ce);
        let mut snapshot = base.snapshot();
        snapshot.entry_legs = &empty_legs;
        assert_eq!(validate(&snapshot), Err(ValidationError::NoEntryLegs));
    }

    #[test]
    fn test_no_payload_on_validation_failure() {
        let mut fixture = Fixture::nifty();
        fixture.entry_conditions = ConditionSet::default();
        assert!(compile(&fixture.snapshot()).is_err());
    }
}
