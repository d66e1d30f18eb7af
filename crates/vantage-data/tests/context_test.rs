//! Integration tests for context loading, as-of filtering and extraction.

use chrono::NaiveDate;
use rstest::rstest;
use vantage_data::{CalculationContext, FieldKey, RawSeries, TemporalFilter, Value, extract};

const CONTEXTS: &str = r#"[
    {
        "ticker": "ACME",
        "asOfDate": "2024-05-15",
        "rawSeriesBySourceId": {
            "balance": [
                {"date": "2024-03-31", "equity": 410, "debt": {"long": 90, "short": 12}},
                {"date": "2024-06-30", "equity": 430, "debt": {"long": 80, "short": 10}},
                {"date": "2023-12-31T00:00:00", "equity": 400, "debt": {"long": 95, "short": 15}},
                {"date": "not a date", "equity": 1}
            ],
            "profile": {"sector": "Industrials", "shares": 50}
        }
    },
    {"ticker": "EMPTY", "asOfDate": "2024-05-15"}
]"#;

fn acme() -> CalculationContext {
    CalculationContext::many_from_json_str(CONTEXTS)
        .unwrap()
        .into_iter()
        .next()
        .unwrap()
}

#[test]
fn test_filter_then_extract_path() {
    let context = acme();
    let series = context.filtered_series(&TemporalFilter::default());

    let extraction = extract(&series["balance"], &FieldKey::from("equity"), "date");
    assert_eq!(extraction.value, Value::from(vec![410.0, 400.0]));

    let range = extraction.date_range.unwrap();
    assert_eq!(range.start, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
}

#[rstest]
#[case("debt.long", Value::from(vec![90.0, 95.0]))]
#[case("debt.missing", Value::List(vec![Value::Null, Value::Null]))]
fn test_dotted_paths(#[case] path: &str, #[case] expected: Value) {
    let context = acme();
    let series = context.filtered_series(&TemporalFilter::default());
    assert_eq!(extract(&series["balance"], &FieldKey::from(path), "date").value, expected);
}

#[test]
fn test_fields_map_on_snapshot() {
    let context = acme();
    let series = context.filtered_series(&TemporalFilter::default());
    assert!(matches!(series["profile"], RawSeries::Snapshot(_)));

    let key: FieldKey = serde_json::from_str(r#"{"name": "sector", "count": "shares"}"#).unwrap();
    let extraction = extract(&series["profile"], &key, "date");
    let Value::Map(map) = extraction.value else {
        panic!("expected a map");
    };
    assert_eq!(map["name"], Value::from("Industrials"));
    assert_eq!(map["count"], Value::Number(50.0));
    assert_eq!(extraction.date_range, None);
}

#[test]
fn test_context_without_series() {
    let contexts = CalculationContext::many_from_json_str(CONTEXTS).unwrap();
    assert_eq!(contexts.len(), 2);
    assert!(contexts[1].raw_series.is_empty());
    assert!(contexts[1].custom_values.is_empty());
}
