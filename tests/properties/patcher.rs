//! Property tests for declaration patching.

use proptest::prelude::*;

use archive_relay::document::Value;
use archive_relay::{DeclarationPatcher, DeclarationShape, Document};

const KEY: &str = "github.com/example/lib";

/// Printable ASCII, quotes and backslashes included.
fn attr_text() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[ -~]{0,24}").unwrap()
}

fn unrelated_line() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "module(name = \"app\")",
        "bazel_dep(name = \"gazelle\", version = \"0.35.0\")",
        "# keep this comment",
        "",
        "go_deps.module(path = \"other\", sum = \"h1:x\")",
        "use_repo(go_deps, \"com_github_other\")",
    ])
    .prop_map(str::to_string)
}

fn declaration() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "go_deps.archive_override(path = \"github.com/example/lib\")",
        "go_deps.archive_override(\n    path = \"github.com/example/lib\",\n    sha256 = \"old\",\n    urls = [\"http://old\"],\n)",
        "go_deps.archive_override(\n    path = \"github.com/example/lib\",\n    strip_prefix = \"lib\"\n)",
        "go_deps.archive_override(path=\"github.com/example/lib\", urls=[],)",
    ])
    .prop_map(str::to_string)
}

fn patch(input: &str, sha256: &str, url: &str) -> (bool, String) {
    let patcher = DeclarationPatcher::new(DeclarationShape::archive_override(), KEY);
    let mut doc = Document::parse("MODULE.bazel", input.as_bytes()).unwrap();
    let values = [
        ("sha256", Value::from(sha256)),
        ("urls", Value::from(vec![url.to_string()])),
    ];
    let changed = patcher.update(&mut doc, &values).unwrap();
    (changed, doc.format())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: Patching twice gives the same output as patching once, and
    /// the declaration reads back the written values.
    #[test]
    fn property_update_is_idempotent(
        before in proptest::collection::vec(unrelated_line(), 0..4),
        decl in declaration(),
        after in proptest::collection::vec(unrelated_line(), 0..4),
        sha256 in attr_text(),
        url in attr_text(),
    ) {
        let prefix: String = before.iter().map(|l| format!("{l}\n")).collect();
        let suffix: String = after.iter().map(|l| format!("{l}\n")).collect();
        let input = format!("{prefix}{decl}\n{suffix}");

        let (changed, once) = patch(&input, &sha256, &url);
        prop_assert!(changed);
        let (_, twice) = patch(&once, &sha256, &url);
        prop_assert_eq!(&twice, &once);

        // Text around the declaration is untouched.
        prop_assert!(once.starts_with(&prefix));
        prop_assert!(once.ends_with(&suffix));

        let doc = Document::parse("MODULE.bazel", once.as_bytes()).unwrap();
        let (_, call) = doc
            .calls()
            .find(|(_, c)| c.function_name() == "archive_override")
            .unwrap();
        prop_assert_eq!(call.attr_string("sha256"), Some(sha256.as_str()));
        prop_assert_eq!(
            call.attr("urls").and_then(|a| a.value.as_string_list()),
            Some(&[url.clone()][..])
        );
    }

    /// PROPERTY: Without a matching declaration nothing changes.
    #[test]
    fn property_miss_leaves_document_alone(
        lines in proptest::collection::vec(unrelated_line(), 0..6),
        sha256 in attr_text(),
    ) {
        let input: String = lines.iter().map(|l| format!("{l}\n")).collect();
        let (changed, output) = patch(&input, &sha256, "http://relay/x.tar.gz");
        prop_assert!(!changed);
        prop_assert_eq!(output, input);
    }
}
