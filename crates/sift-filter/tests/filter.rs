//! End-to-end filter scenarios: create from a description, accept samples on
//! both the writer path (native sample) and the reader path (serialized key
//! fields).

use sift_filter::{
    encode_key_fields, ContentFilter, ExpressionFilter, FieldKind, FieldValue, Filter,
    FilterError, FilterFn, FilterParam, FunctionFilter, KeyField, SampleInfo, SampleView,
    TopicDescriptor,
};
use std::sync::Arc;

type Sample = Vec<(&'static str, FieldValue)>;

fn int(i: i64) -> FieldValue {
    FieldValue::Integer(i)
}

fn text(s: &str) -> FieldValue {
    FieldValue::Text(s.to_owned())
}

fn expr_filter(expression: &str, params: Vec<FilterParam>) -> ContentFilter {
    ContentFilter::Expression(ExpressionFilter::with_params(expression, params))
}

/// Creates the filter and runs the sample through both accept paths,
/// asserting they agree.
fn accepts(
    expression: &str,
    params: Vec<FilterParam>,
    topic: &TopicDescriptor,
    sample: &Sample,
) -> bool {
    let description = expr_filter(expression, params);
    let mut filter = Filter::create(0, &description, topic).expect(expression);

    let writer_verdict = filter.writer_accept(&&sample[..]);

    let bytes = encode_key_fields(topic, &&sample[..]).unwrap();
    let reader_verdict = filter.reader_accept(&bytes, &SampleInfo::default());

    assert_eq!(
        writer_verdict, reader_verdict,
        "writer and reader disagree for {expression:?}"
    );
    writer_verdict
}

fn enum_topic() -> TopicDescriptor {
    TopicDescriptor::new(
        "Space_invalid_data",
        vec![
            KeyField::new("e1", FieldKind::Int32),
            KeyField::new("bm1", FieldKind::UInt32),
        ],
    )
}

fn key_order_topic() -> TopicDescriptor {
    TopicDescriptor::new(
        "SerdataKeyOrderId",
        vec![
            KeyField::new("a", FieldKind::UInt8),
            KeyField::new("b", FieldKind::UInt16),
            KeyField::new("c", FieldKind::UInt32),
        ],
    )
}

#[test]
fn test_enum_key_equality() {
    // scenario 1: e1 = 0 with e1 == 0
    let topic = enum_topic();
    let sample: Sample = vec![("e1", int(0)), ("bm1", int(0))];
    assert!(accepts("e1=0", vec![], &topic, &sample));
}

#[test]
fn test_bitmask_shift() {
    // scenario 2: bm1 = (1 << 0) with bm1 == 1
    let topic = enum_topic();
    let sample: Sample = vec![("e1", int(0)), ("bm1", int(1))];
    assert!(accepts("bm1=(1 << 0)", vec![], &topic, &sample));
}

#[test]
fn test_bounded_string_key() {
    // scenario 3: b = 'abc' on a bounded-string field
    let topic = TopicDescriptor::new(
        "SerdataKeyStringBounded",
        vec![
            KeyField::new("a", FieldKind::UInt32),
            KeyField::new("b", FieldKind::BoundedStr(32)),
        ],
    );
    let sample: Sample = vec![("a", int(1)), ("b", text("abc"))];
    assert!(accepts("b = 'abc'", vec![], &topic, &sample));
    let other: Sample = vec![("a", int(1)), ("b", text("abx"))];
    assert!(!accepts("b = 'abc'", vec![], &topic, &other));
}

#[test]
fn test_unbounded_string_key() {
    let topic = TopicDescriptor::new(
        "SerdataKeyString",
        vec![
            KeyField::new("a", FieldKind::UInt32),
            KeyField::new("b", FieldKind::Str),
        ],
    );
    let sample: Sample = vec![("a", int(1)), ("b", text("abcd"))];
    assert!(accepts("b == 'abcd'", vec![], &topic, &sample));
}

#[test]
fn test_parameter_product_short_circuits() {
    // scenario 4: a + b OR ?1 * c with ?1 = 0
    let topic = key_order_topic();
    let sample: Sample = vec![("a", int(1)), ("b", int(0)), ("c", int(0))];
    assert!(accepts(
        "a + b OR ?1 * c",
        vec![FilterParam::Integer(0)],
        &topic,
        &sample
    ));
}

#[test]
fn test_nested_field_names() {
    // scenario 5: x AND y OR z.b
    let topic = TopicDescriptor::new(
        "SerdataKeyOrderFinalNestedMutable",
        vec![
            KeyField::new("x", FieldKind::UInt8),
            KeyField::new("y", FieldKind::UInt32),
            KeyField::new("z.a", FieldKind::UInt16),
            KeyField::new("z.b", FieldKind::UInt32),
        ],
    );
    let sample: Sample = vec![
        ("x", int(0)),
        ("y", int(0)),
        ("z.a", int(0)),
        ("z.b", int(1)),
    ];
    assert!(accepts("x AND y OR z.b", vec![], &topic, &sample));
}

#[test]
fn test_deeply_nested_rejection() {
    // scenario 6: d.x AND d.z.c OR e.x, all deciding fields falsy
    let topic = TopicDescriptor::new(
        "SerdataKeyNestedFinalImplicit",
        vec![
            KeyField::new("d.x", FieldKind::UInt8),
            KeyField::new("d.z.a", FieldKind::UInt32),
            KeyField::new("d.z.c", FieldKind::UInt32),
            KeyField::new("e.x", FieldKind::UInt8),
        ],
    );
    let sample: Sample = vec![
        ("d.x", int(1)),
        ("d.z.a", int(0)),
        ("d.z.c", int(0)),
        ("e.x", int(0)),
    ];
    assert!(!accepts("d.x AND d.z.c OR e.x", vec![], &topic, &sample));
}

#[test]
fn test_reduced_descriptor_contains_referenced_fields_only() {
    let topic = key_order_topic();

    let mut filter = Filter::create(0, &expr_filter("a + b + c", vec![]), &topic).unwrap();
    let names: Vec<_> = filter
        .reduced_descriptor()
        .unwrap()
        .keyed_fields()
        .iter()
        .map(|k| k.name.clone())
        .collect();
    assert_eq!(names, ["a", "b", "c"]);

    // ?1 = 0 short-circuits `?1 * c`, so c is not a required field
    filter = Filter::create(
        0,
        &expr_filter("a + b OR ?1 * c", vec![FilterParam::Integer(0)]),
        &topic,
    )
    .unwrap();
    let names: Vec<_> = filter
        .reduced_descriptor()
        .unwrap()
        .keyed_fields()
        .iter()
        .map(|k| k.name.clone())
        .collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn test_constant_expression_needs_no_fields() {
    // the comparison folds at build; no sample field is ever deserialized
    let topic = key_order_topic();
    let description = expr_filter(
        "?1 = x'414243'",
        vec![FilterParam::Blob(b"ABC".to_vec())],
    );
    let mut filter = Filter::create(0, &description, &topic).unwrap();
    assert!(filter.reduced_descriptor().unwrap().keyed_fields().is_empty());
    let sample: Sample = vec![("a", int(9)), ("b", int(9)), ("c", int(9))];
    assert!(filter.writer_accept(&&sample[..]));
}

#[test]
fn test_short_circuit_spares_unbound_subtree() {
    // g alone decides; bob is never deserialized or bound
    let topic = TopicDescriptor::new(
        "Shorty",
        vec![
            KeyField::new("bob", FieldKind::Int32),
            KeyField::new("g", FieldKind::Int32),
            KeyField::new("height", FieldKind::Int32),
            KeyField::new("length", FieldKind::Int32),
        ],
    );
    let description = expr_filter(
        "NOT ((2 + (bob+8/2+7) - 5) AND (?1 + ((?2 + height - 1) * length) - 3)) OR g",
        vec![FilterParam::Integer(1), FilterParam::Integer(1)],
    );
    let mut filter = Filter::create(0, &description, &topic).unwrap();
    let sample: Sample = vec![
        ("bob", int(5)),
        ("g", int(1)),
        ("height", int(2)),
        ("length", int(3)),
    ];
    assert!(filter.writer_accept(&&sample[..]));
}

#[test]
fn test_parse_error_reports_offset() {
    let topic = key_order_topic();
    assert_eq!(
        Filter::create(0, &expr_filter("?1 + ?", vec![]), &topic).unwrap_err(),
        FilterError::Expression { pos: 6 }
    );
    assert_eq!(
        Filter::create(0, &expr_filter(".a", vec![]), &topic).unwrap_err(),
        FilterError::Expression { pos: 1 }
    );
}

#[test]
fn test_unknown_field_is_bad_parameter() {
    let topic = key_order_topic();
    assert_eq!(
        Filter::create(0, &expr_filter("nosuch = 1", vec![]), &topic).unwrap_err(),
        FilterError::BadParameter
    );
}

#[test]
fn test_excess_parameter_is_bad_parameter() {
    let topic = key_order_topic();
    assert_eq!(
        Filter::create(
            0,
            &expr_filter("?1 * c", vec![FilterParam::Integer(1), FilterParam::Integer(2)]),
            &topic
        )
        .unwrap_err(),
        FilterError::BadParameter
    );
}

#[test]
fn test_unsupported_key_kinds() {
    let topic = TopicDescriptor::new(
        "WithU64",
        vec![
            KeyField::new("ok", FieldKind::Int32),
            KeyField::new("big", FieldKind::UInt64),
        ],
    );
    // referencing the u64 key is refused at create
    assert!(matches!(
        Filter::create(0, &expr_filter("big = 1", vec![]), &topic),
        Err(FilterError::Unsupported(_))
    ));
    // not referencing it is fine; the codec just skips over it
    let mut filter = Filter::create(0, &expr_filter("ok = 1", vec![]), &topic).unwrap();
    let sample: Sample = vec![("ok", int(1)), ("big", int(7))];
    let bytes = encode_key_fields(&topic, &&sample[..]).unwrap();
    assert!(filter.reader_accept(&bytes, &SampleInfo::default()));

    let wide = TopicDescriptor::new(
        "WithWide",
        vec![
            KeyField::new("ok", FieldKind::Int32),
            KeyField::new("w", FieldKind::WStr),
        ],
    );
    assert!(matches!(
        Filter::create(0, &expr_filter("ok = 1", vec![]), &wide),
        Err(FilterError::Unsupported(_))
    ));
}

#[test]
fn test_update_rebinds_same_expression() {
    let topic = key_order_topic();
    let sample: Sample = vec![("a", int(5)), ("b", int(0)), ("c", int(0))];

    let mut filter = Filter::create(
        0,
        &expr_filter("a = ?1", vec![FilterParam::Integer(5)]),
        &topic,
    )
    .unwrap();
    assert!(filter.writer_accept(&&sample[..]));

    // same text, new parameter: only a rebind + rebuild
    filter
        .update(
            &expr_filter("a = ?1", vec![FilterParam::Integer(6)]),
            &topic,
        )
        .unwrap();
    assert!(!filter.writer_accept(&&sample[..]));
}

#[test]
fn test_update_recreates_on_new_expression() {
    let topic = key_order_topic();
    let sample: Sample = vec![("a", int(5)), ("b", int(3)), ("c", int(0))];

    let mut filter = Filter::create(0, &expr_filter("a = 5", vec![]), &topic).unwrap();
    assert!(filter.writer_accept(&&sample[..]));

    filter.update(&expr_filter("b = 7", vec![]), &topic).unwrap();
    assert!(!filter.writer_accept(&&sample[..]));
    assert!(filter.matches_description(&expr_filter("b = 7", vec![])));
}

#[test]
fn test_update_failure_keeps_previous_filter() {
    let topic = key_order_topic();
    let sample: Sample = vec![("a", int(5)), ("b", int(0)), ("c", int(0))];

    let mut filter = Filter::create(0, &expr_filter("a = 5", vec![]), &topic).unwrap();
    assert_eq!(
        filter.update(&expr_filter("?1 + ?", vec![]), &topic),
        Err(FilterError::Expression { pos: 6 })
    );
    // the old filter still answers
    assert!(filter.writer_accept(&&sample[..]));
    assert!(filter.matches_description(&expr_filter("a = 5", vec![])));
}

#[test]
fn test_idempotent_update_is_structurally_unchanged() {
    let topic = key_order_topic();
    let description = expr_filter("a + b OR ?1 * c", vec![FilterParam::Integer(0)]);

    let mut filter = Filter::create(0, &description, &topic).unwrap();
    let before = format!("{filter:?}");
    filter.update(&description, &topic).unwrap();
    assert_eq!(before, format!("{filter:?}"));
}

#[test]
fn test_description_compare_is_element_wise() {
    let topic = key_order_topic();
    let description = expr_filter(
        "a = ?1 AND b = ?2",
        vec![FilterParam::Integer(1), FilterParam::Integer(2)],
    );
    let filter = Filter::create(0, &description, &topic).unwrap();

    assert!(filter.matches_description(&description));
    // differing LAST parameter must not compare equal
    assert!(!filter.matches_description(&expr_filter(
        "a = ?1 AND b = ?2",
        vec![FilterParam::Integer(1), FilterParam::Integer(3)],
    )));
    // differing parameter type must not compare equal either
    assert!(!filter.matches_description(&expr_filter(
        "a = ?1 AND b = ?2",
        vec![FilterParam::Integer(1), FilterParam::Real(2.0)],
    )));
    // and a different expression never matches
    assert!(!filter.matches_description(&expr_filter(
        "a = ?1 AND b = ?3",
        vec![FilterParam::Integer(1), FilterParam::Integer(2)],
    )));
}

#[test]
fn test_parameter_round_trip() {
    // bind a parameter, observe it back through evaluation byte-for-byte:
    // the blob equality only holds if the stored bytes are identical
    let topic = key_order_topic();
    let payload = vec![0x00u8, 0xff, 0x10, 0x7f];
    let description = expr_filter(
        "?1 = x'00FF107F'",
        vec![FilterParam::Blob(payload)],
    );
    let mut filter = Filter::create(0, &description, &topic).unwrap();
    let sample: Sample = vec![("a", int(0)), ("b", int(0)), ("c", int(0))];
    assert!(filter.writer_accept(&&sample[..]));
}

#[test]
fn test_missing_filter_accepts_everything() {
    let sample: Sample = vec![("a", int(0))];
    assert!(sift_filter::writer_accept(None, &&sample[..]));
    assert!(sift_filter::reader_accept(None, &[], &SampleInfo::default()));
}

// ---------------------------------------------------------------------------
// function filters
// ---------------------------------------------------------------------------

fn sample_is_a_positive(sample: &dyn SampleView) -> bool {
    matches!(sample.key_field("a"), Some(FieldValue::Integer(i)) if i > 0)
}

#[test]
fn test_function_filter_sample_mode() {
    let topic = key_order_topic();
    let description = ContentFilter::Function(FunctionFilter::new(FilterFn::Sample(
        sample_is_a_positive,
    )));
    let mut filter = Filter::create(0, &description, &topic).unwrap();

    let pass: Sample = vec![("a", int(3)), ("b", int(0)), ("c", int(0))];
    let fail: Sample = vec![("a", int(0)), ("b", int(0)), ("c", int(0))];
    assert!(filter.writer_accept(&&pass[..]));
    assert!(!filter.writer_accept(&&fail[..]));

    // the reader path deserializes the sample for this mode
    let bytes = encode_key_fields(&topic, &&pass[..]).unwrap();
    assert!(filter.reader_accept(&bytes, &SampleInfo::default()));
    let bytes = encode_key_fields(&topic, &&fail[..]).unwrap();
    assert!(!filter.reader_accept(&bytes, &SampleInfo::default()));
}

#[test]
fn test_function_filter_sampleinfo_mode() {
    fn valid_only(info: &SampleInfo, _arg: Option<&sift_filter::FilterArg>) -> bool {
        info.valid_data
    }

    let topic = key_order_topic();
    let description =
        ContentFilter::Function(FunctionFilter::new(FilterFn::SampleInfoArg(valid_only)));
    let mut filter = Filter::create(0, &description, &topic).unwrap();

    // no deserialization happens; garbage bytes are fine
    let info = SampleInfo {
        valid_data: true,
        ..SampleInfo::default()
    };
    assert!(filter.reader_accept(b"garbage", &info));
    assert!(!filter.reader_accept(b"garbage", &SampleInfo::default()));

    // the writer side has no sample info for this mode
    let sample: Sample = vec![("a", int(0)), ("b", int(0)), ("c", int(0))];
    assert!(filter.writer_accept(&&sample[..]));
}

#[test]
fn test_function_filter_arg_update() {
    fn threshold(sample: &dyn SampleView, arg: Option<&sift_filter::FilterArg>) -> bool {
        let limit = arg
            .and_then(|a| a.downcast_ref::<i64>())
            .copied()
            .unwrap_or(0);
        matches!(sample.key_field("a"), Some(FieldValue::Integer(i)) if i > limit)
    }

    let topic = key_order_topic();
    let mut filter = Filter::create(
        0,
        &ContentFilter::Function(FunctionFilter::with_arg(
            FilterFn::SampleArg(threshold),
            Arc::new(2i64),
        )),
        &topic,
    )
    .unwrap();

    let sample: Sample = vec![("a", int(3)), ("b", int(0)), ("c", int(0))];
    assert!(filter.writer_accept(&&sample[..]));

    // same callback, new argument: update swaps the argument in place
    filter
        .update(
            &ContentFilter::Function(FunctionFilter::with_arg(
                FilterFn::SampleArg(threshold),
                Arc::new(5i64),
            )),
            &topic,
        )
        .unwrap();
    assert!(!filter.writer_accept(&&sample[..]));
}

#[test]
fn test_function_filter_compare() {
    let topic = key_order_topic();
    let description = ContentFilter::Function(FunctionFilter::new(FilterFn::Sample(
        sample_is_a_positive,
    )));
    let filter = Filter::create(0, &description, &topic).unwrap();

    assert!(filter.matches_description(&description));
    fn other(_: &dyn SampleView) -> bool {
        true
    }
    assert!(!filter.matches_description(&ContentFilter::Function(FunctionFilter::new(
        FilterFn::Sample(other)
    ))));
    assert!(!filter.matches_description(&expr_filter("a = 1", vec![])));
}
