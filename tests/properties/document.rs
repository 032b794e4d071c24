//! Property tests for configuration document parsing.

use proptest::prelude::*;

use archive_relay::Document;

/// Fragments that look like build-file text, so generated input reaches the
/// parser instead of stopping at the first unexpected character.
fn fragment() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "go_deps", ".", "archive_override", "http_archive", "(", ")", "[", "]", "{", "}",
        ",", "=", "==", " = ", "path", "\"pkg/x\"", "'y'", "\"\"\"doc\"\"\"", "r\"raw\\\"",
        "42", "\n", "\n    ", "\t", " ", "# note", ";", ":", "if", "else", "\\\n", "+", "\r\n",
    ])
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: Parsing arbitrary text never panics.
    #[test]
    fn property_parse_never_panics(input in "\\PC{0,200}") {
        let _ = Document::parse("MODULE.bazel", input.as_bytes());
    }

    /// PROPERTY: Parsing arbitrary bytes never panics.
    #[test]
    fn property_parse_bytes_never_panics(input in proptest::collection::vec(any::<u8>(), 0..200)) {
        let _ = Document::parse("MODULE.bazel", &input);
    }

    /// PROPERTY: Whatever parses formats back to the exact input.
    #[test]
    fn property_format_is_identity(pieces in proptest::collection::vec(fragment(), 0..40)) {
        let input = pieces.concat();
        if let Ok(doc) = Document::parse("MODULE.bazel", input.as_bytes()) {
            prop_assert_eq!(doc.format(), input);
        }
    }
}
