//! End-to-end tests for the TML parser and serializer.

use tml_cfg::{
    parse_str, parse_str_with_options, to_string, to_string_with_options, writer, EmitOptions,
    ParseOptions, Value, ValueKind,
};

fn round_trip(source: &str) {
    let first = parse_str("t.tml", source).unwrap();
    let text = to_string(&first).unwrap();
    let second = parse_str("t.tml", &text).unwrap();
    assert!(
        first.content_eq(&second),
        "round trip changed the tree:\nsource: {:?}\nemitted: {:?}",
        source,
        text
    );
}

#[test]
fn test_object_and_array_scenario() {
    let root = parse_str("t.tml", "obj\n\ta = 1\n\tb = 2\narr = 1 3 5\n").unwrap();
    let pairs = root.as_object().unwrap();
    assert_eq!(pairs.len(), 2);

    let obj = pairs[0].value.as_object().unwrap();
    assert!(pairs[0].name.text_eq("obj"));
    assert_eq!(obj[0].value.as_i32(), Some(1));
    assert_eq!(obj[1].value.as_i32(), Some(2));

    let arr = pairs[1].value.as_array().unwrap();
    assert_eq!(
        arr.iter().map(|v| v.as_i32().unwrap()).collect::<Vec<_>>(),
        vec![1, 3, 5]
    );

    round_trip("obj\n\ta = 1\n\tb = 2\narr = 1 3 5\n");
}

#[test]
fn test_round_trips() {
    let cases = [
        "",
        "a = 1\n",
        "# comment only\n",
        "\n\n",
        "single-token\n",
        "null = true\n",
        "7 = text\n",
        "0.1 1.2 3.4 = a b c d e f\n",
        "object\n\ta = 1\n\t# a comment\n\tsubobj\n\t\taa = a\n\t\tbb = b\n\tb = 2\n",
        "quoted = \"with space\"\n",
        "esc = \"a\\tb\\nc\\\\d\\\"e\"\n",
        "looks-like-number = \"123\"\n",
        "deep\n\ta\n\t\tb\n\t\t\tc = end\n",
    ];
    for source in cases {
        round_trip(source);
    }
}

#[test]
fn test_number_classification_round_trip() {
    let root = parse_str("t.tml", "i = 42\nf = 1.5\nneg = -7\nt = 1.2.3\n").unwrap();
    let pairs = root.as_object().unwrap();
    assert!(pairs[0].value.is_int());
    assert!(pairs[1].value.is_float());
    assert_eq!(pairs[2].value.as_i32(), Some(-7));
    assert!(pairs[3].value.is_text());
    round_trip("i = 42\nf = 1.5\nneg = -7\nt = 1.2.3\n");
}

#[test]
fn test_depth_normalization() {
    // stored depths deviate after manual editing; recomputed emission
    // follows nesting
    let mut root = parse_str("t.tml", "obj\n\ta = 1\n").unwrap();
    if let ValueKind::Object(pairs) = &mut root.kind {
        pairs[0].depth = 5;
        if let ValueKind::Object(children) = &mut pairs[0].value.kind {
            children[0].depth = 9;
        }
    }
    let text = to_string(&root).unwrap();
    assert_eq!(text, "obj\n\ta = 1\n");

    let stored = to_string_with_options(&root, &EmitOptions::new().with_stored_depth(true)).unwrap();
    assert_eq!(stored, "\t\t\t\t\tobj\n\t\t\t\t\t\t\t\t\ta = 1\n");
}

#[test]
fn test_crlf_and_missing_final_newline() {
    let root = parse_str("t.tml", "a = 1\r\nb = 2").unwrap();
    let pairs = root.as_object().unwrap();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[1].value.as_i32(), Some(2));
}

#[test]
fn test_space_indent_unit() {
    let root = parse_str("t.tml", "obj\n    a = 1\n    b\n        c = 2\n").unwrap();
    let obj = root.object_get_value("obj").unwrap();
    assert_eq!(obj.object_get_int("a"), Some(1));
    let b = obj.object_get_value("b").unwrap();
    assert_eq!(b.object_get_int("c"), Some(2));
}

#[test]
fn test_values_only_matches_stripped_parse() {
    let source = "# head\na = 1\n\nobj\n\t# inner\n\tb = 2\n";
    let stripped = parse_str_with_options("t.tml", source, &ParseOptions::values_only()).unwrap();
    assert_eq!(to_string(&stripped).unwrap(), "a = 1\nobj\n\tb = 2\n");
}

#[test]
fn test_structured_lines_equal_flat_output() {
    let source = "obj\n\ta = 1\narr = []\n";
    let root = parse_str("t.tml", source).unwrap();
    let options = EmitOptions::new();
    let lines = writer::value_to_lines(0, &root, &options).unwrap();
    assert_eq!(
        writer::lines_to_string(&lines),
        to_string(&root).unwrap()
    );
}

#[test]
fn test_parser_reports_position() {
    let err = parse_str("bad.tml", "ok = 1\nbad = = x\n").unwrap_err();
    assert!(err.to_string().starts_with("bad.tml:2"));
}

#[test]
fn test_complex_array_emission() {
    // complex arrays only arise programmatically; they emit [] plus one
    // element per line
    let value = Value::object(vec![tml_cfg::Pair::new(
        Value::text("arr"),
        Value::array(vec![
            Value::array(vec![Value::int(1), Value::int(2)]),
            Value::int(3),
        ]),
    )]);
    assert_eq!(to_string(&value).unwrap(), "arr = []\n\t1 2\n\t3\n");
}
