//! Property tests for parsing and resolution invariants.

use httprex::models::{HttpMethod, VariableMap};
use httprex::parser::lexer::{extract_file_variables, extract_variables, resolve_variables};
use httprex::parser::parse_request;
use httprex::variables::{VariableContext, VariableResolver};
use proptest::prelude::*;

fn method_strategy() -> impl Strategy<Value = HttpMethod> {
    prop::sample::select(HttpMethod::ALL.to_vec())
}

/// Mixes the case of every ASCII letter in `s` according to `mask`.
fn mix_case(s: &str, mask: &[bool]) -> String {
    s.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| {
            if *upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn test_method_and_url_round_trip(
        method in method_strategy(),
        mask in prop::collection::vec(any::<bool>(), 1..8),
        host in "[a-z]{1,12}",
        path in "(/[a-z0-9_-]{1,8}){0,4}",
        https in any::<bool>(),
    ) {
        let scheme = if https { "https" } else { "http" };
        let url = format!("{}://{}.example.com{}", scheme, host, path);
        let text = format!("{} {}", mix_case(method.as_str(), &mask), url);

        let result = parse_request(&text);
        prop_assert!(result.success, "{:?}", result.errors);
        let request = result.data.unwrap();
        prop_assert_eq!(request.method, method);
        prop_assert_eq!(request.url, url);
        prop_assert!(request.headers.is_empty());
        prop_assert!(request.body.is_absent());
    }

    #[test]
    fn test_text_without_placeholders_is_left_alone(
        text in "[^{]*",
        pairs in prop::collection::vec(("[a-z]{1,6}", "[a-z0-9]{0,6}"), 0..5),
    ) {
        let variables: VariableMap = pairs.into_iter().collect();
        prop_assert!(extract_variables(&text, 1).is_empty());
        prop_assert_eq!(resolve_variables(&text, &variables), text.clone());

        let resolver = VariableResolver::new(VariableContext::with_file_variables(variables));
        prop_assert_eq!(resolver.resolve_string(&text), text);
    }

    #[test]
    fn test_resolution_with_irrelevant_map_is_identity(
        names in prop::collection::vec("[a-z]{1,8}", 1..5),
        other in "[A-Z]{1,8}",
    ) {
        let text = names
            .iter()
            .map(|n| format!("{{{{{}}}}}", n))
            .collect::<Vec<_>>()
            .join("/");
        let mut variables = VariableMap::new();
        variables.insert(other, "value".to_string());

        prop_assert_eq!(resolve_variables(&text, &variables), text.clone());
        let resolver = VariableResolver::new(VariableContext::with_file_variables(variables));
        prop_assert_eq!(resolver.resolve_string(&text), text);
    }

    #[test]
    fn test_last_file_variable_assignment_wins(
        name in "[a-zA-Z_][a-zA-Z0-9_]{0,10}",
        values in prop::collection::vec("[a-z0-9]{1,8}", 1..5),
    ) {
        let lines: Vec<String> = values.iter().map(|v| format!("@{} = {}", name, v)).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

        let variables = extract_file_variables(&refs);
        let last = variables.iter().rev().find(|v| v.name == name).unwrap();
        prop_assert_eq!(&last.value, values.last().unwrap());
    }
}

#[test]
fn test_duplicate_headers_merge() {
    let request = parse_request(
        "GET https://x\nAccept: A\nAccept: B\nSet-Cookie: a=1\nSet-Cookie: b=2",
    )
    .data
    .unwrap();

    assert_eq!(request.headers["accept"], "A, B");
    assert_eq!(request.headers["set-cookie"], "a=1\nb=2");
}

#[test]
fn test_file_variables_last_write_wins() {
    let variables = extract_file_variables(&["@x = 1", "@x = 2"]);
    let map: VariableMap = variables.into_iter().map(|v| (v.name, v.value)).collect();
    assert_eq!(map["x"], "2");
}
