use chrono::NaiveDate;
use csv_scrub::data::{
    BooleanVocabulary, CoercionOptions, RawScalar, TypeTag, TypedValue, coerce, coerce_default,
    parse_timestamp, recast,
};
use proptest::prelude::*;

fn text(value: &str) -> RawScalar {
    RawScalar::Text(value.to_string())
}

#[test]
fn mixed_age_column_casts_to_integer_with_missing() {
    let ages = vec![text("28"), text("?"), RawScalar::Integer(29)];
    let cast = ages
        .iter()
        .map(|raw| coerce_default(raw, TypeTag::Integer))
        .collect::<Vec<_>>();
    assert_eq!(
        cast,
        vec![
            TypedValue::Integer(28),
            TypedValue::Missing,
            TypedValue::Integer(29)
        ]
    );
}

#[test]
fn integer_accepts_integral_float_text_only() {
    assert_eq!(
        coerce_default(&text(" 42.0 "), TypeTag::Integer),
        TypedValue::Integer(42)
    );
    assert!(coerce_default(&text("42.5"), TypeTag::Integer).is_missing());
    assert!(coerce_default(&RawScalar::Float(1.5), TypeTag::Integer).is_missing());
    assert_eq!(
        coerce_default(&RawScalar::Boolean(true), TypeTag::Integer),
        TypedValue::Integer(1)
    );
}

#[test]
fn large_integer_text_is_exact_or_missing() {
    assert_eq!(
        coerce_default(&text("12345678901234567.0"), TypeTag::Integer),
        TypedValue::Integer(12_345_678_901_234_567)
    );
    assert!(coerce_default(&text("12345678901234567.5"), TypeTag::Integer).is_missing());
    assert!(coerce_default(&text("1.2345678901234567e16"), TypeTag::Integer).is_missing());
    assert_eq!(
        coerce_default(&text("1e3"), TypeTag::Integer),
        TypedValue::Integer(1000)
    );
}

#[test]
fn non_finite_floats_become_missing() {
    assert!(coerce_default(&text("inf"), TypeTag::Float).is_missing());
    assert!(coerce_default(&text("NaN"), TypeTag::Float).is_missing());
    assert!(TypedValue::from_raw(RawScalar::Float(f64::NAN)).is_missing());
    assert_eq!(
        coerce_default(&text("170.5"), TypeTag::Float),
        TypedValue::Float(170.5)
    );
}

#[test]
fn boolean_vocabulary_is_case_insensitive_and_configurable() {
    assert_eq!(
        coerce_default(&text("YES"), TypeTag::Boolean),
        TypedValue::Boolean(true)
    );
    assert!(coerce_default(&text("maybe"), TypeTag::Boolean).is_missing());

    let options = CoercionOptions {
        booleans: BooleanVocabulary::new([("ja", true), ("nein", false)]),
        ..CoercionOptions::default()
    };
    assert_eq!(
        coerce(&text("Nein"), TypeTag::Boolean, &options),
        TypedValue::Boolean(false)
    );
    assert!(coerce(&text("yes"), TypeTag::Boolean, &options).is_missing());
}

#[test]
fn timestamps_accept_every_default_format() {
    let cases = [
        ("2024-03-01", (2024, 3, 1)),
        ("01/04/2024", (2024, 4, 1)),
        ("2024/05/10", (2024, 5, 10)),
        ("10-06-2024", (2024, 6, 10)),
    ];
    for (input, (y, m, d)) in cases {
        let expected = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            coerce_default(&text(input), TypeTag::Timestamp),
            TypedValue::Timestamp(expected),
            "input {input}"
        );
    }
    assert!(coerce_default(&text("invalid"), TypeTag::Timestamp).is_missing());
    assert!(parse_timestamp("2024-01-01 10:30:00", &["%Y-%m-%d %H:%M:%S"]).is_some());
}

#[test]
fn null_is_missing_for_every_target() {
    for tag in [
        TypeTag::Integer,
        TypeTag::Float,
        TypeTag::Boolean,
        TypeTag::Text,
        TypeTag::Timestamp,
    ] {
        assert!(coerce_default(&RawScalar::Null, tag).is_missing(), "{tag}");
    }
}

#[test]
fn recast_keeps_values_already_of_target_type() {
    let options = CoercionOptions::default();
    let value = TypedValue::Float(2.0);
    assert_eq!(recast(&value, TypeTag::Float, &options), value);
    assert_eq!(
        recast(&value, TypeTag::Integer, &options),
        TypedValue::Integer(2)
    );
    assert_eq!(
        recast(&value, TypeTag::Text, &options),
        TypedValue::Text("2".into())
    );
}

#[test]
fn equality_is_variant_strict() {
    assert_ne!(TypedValue::Integer(1), TypedValue::Float(1.0));
    assert_eq!(TypedValue::Float(0.0), TypedValue::Float(-0.0));
}

proptest! {
    #[test]
    fn integer_text_round_trips(value in any::<i64>()) {
        let coerced = coerce_default(&RawScalar::Text(value.to_string()), TypeTag::Integer);
        prop_assert_eq!(coerced, TypedValue::Integer(value));
    }

    #[test]
    fn integral_decimal_text_keeps_every_digit(
        value in (1i64 << 53)..i64::MAX,
        zeros in 1usize..4,
        negative in any::<bool>(),
    ) {
        let value = if negative { -value } else { value };
        let text = format!("{value}.{}", "0".repeat(zeros));
        let coerced = coerce_default(&RawScalar::Text(text), TypeTag::Integer);
        prop_assert_eq!(coerced, TypedValue::Integer(value));
    }

    #[test]
    fn float_text_round_trips(value in -1.0e12f64..1.0e12) {
        let coerced = coerce_default(&RawScalar::Text(value.to_string()), TypeTag::Float);
        prop_assert_eq!(coerced, TypedValue::Float(value));
    }

    #[test]
    fn alphabetic_text_is_not_numeric(input in "[a-zA-Z]{1,8}") {
        prop_assert!(coerce_default(&RawScalar::Text(input.clone()), TypeTag::Integer).is_missing());
        prop_assert!(coerce_default(&RawScalar::Text(input), TypeTag::Float).is_missing());
    }

    #[test]
    fn coercion_is_total(input in ".{0,16}", tag_idx in 0usize..5) {
        let tag = [
            TypeTag::Integer,
            TypeTag::Float,
            TypeTag::Boolean,
            TypeTag::Text,
            TypeTag::Timestamp,
        ][tag_idx];
        let coerced = coerce_default(&RawScalar::Text(input), tag);
        prop_assert!(coerced.is_missing() || coerced.type_tag() == Some(tag));
    }
}
