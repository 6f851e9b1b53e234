//! Tests for compiling schema text into pipelines

use super::*;
use crate::parser::tokenizer::{Keyword, KEYWORDS};
use crate::parser::{ErrorTag, ValidatorData};
use crate::runtime::{self, Injected, PathSegment, Validator};
use serde_json::{json, Value};

// ============================================================================
// Helper Functions
// ============================================================================

fn pipeline(text: &str) -> Pipeline {
    compile(text).unwrap().pipeline()
}

fn with_errors(text: &str, errors: &[&str]) -> Pipeline {
    compile(text)
        .unwrap()
        .bind(Bindings::new().errors(errors.iter().copied()))
}

/// Run a pipeline and collect `(payload, path)` pairs
fn run(pipeline: &Pipeline, value: Value) -> (Option<Value>, Vec<(Value, String)>) {
    let mut errors = Vec::new();
    let mut meta = Meta::new();
    let result = pipeline.validate(
        value,
        &mut |error, meta: &Meta| errors.push((error, meta.path_string())),
        &mut meta,
    );
    (result, errors)
}

fn compose(forest: Vec<Param>) -> Result<Template, CompileError> {
    Composer::new().compose(&forest)
}

fn node(name: &str, params: Vec<Param>) -> Param {
    Param::Validator(ValidatorData::new(name, params))
}

/// A schema exercising one keyword, spelled as `name`
fn keyword_schema(keyword: &Keyword, name: &str) -> String {
    match keyword.long {
        "object" => format!("{}( x : @n!'nan' )!'obj'", name),
        "array" => format!("{}(@n!'nan')!'arr'", name),
        "compare" => format!("{}(>=2)!'cmp'", name),
        "length" => format!("{}(<=2)!'len'", name),
        "regex" => format!("{}('^a')!'re'", name),
        "equal" | "notEqual" => format!("{}('a')!'eq'", name),
        "oneOf" => format!("{}('a', 2)!'of'", name),
        "~error" => format!("@o( x : @n!'nan' ) {}", name),
        "~meta" => format!("@n!'nan' {}", name),
        _ => format!("{}!'prim'", name),
    }
}

/// `{value, children: [...]}` nested `depth` levels deep
fn tree(depth: usize, leaf: Value) -> Value {
    let mut current = json!({ "value": leaf, "children": [] });
    for level in 0..depth {
        current = json!({ "value": level, "children": [current] });
    }
    current
}

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn test_object_reports_positional_errors_at_field_paths() {
    let pipeline = with_errors(
        "object( id : number!0 : compare(>=0)!1, name : string!2 )",
        &["numErr", "gteErr", "strErr"],
    );

    // Failed fields stay in the output as null
    let (result, errors) = run(&pipeline, json!({ "id": -1, "name": 5 }));
    assert_eq!(result, Some(json!({ "id": null, "name": null })));
    assert_eq!(
        errors,
        vec![
            (json!("gteErr"), "id".to_string()),
            (json!("strErr"), "name".to_string()),
        ]
    );

    let (result, errors) = run(&pipeline, json!({ "id": 3, "name": "ok" }));
    assert_eq!(result, Some(json!({ "id": 3, "name": "ok" })));
    assert!(errors.is_empty());
}

#[test]
fn test_short_aliases_compile_to_the_same_behavior() {
    let errors = ["numErr", "gteErr", "strErr"];
    let long = with_errors(
        "object( id : number!0 : compare(>=0)!1, name : string!2 )",
        &errors,
    );
    let short = with_errors("@o( id @n!0 @c(>=0)!1, name @s!2 )", &errors);

    for input in [
        json!({ "id": -1, "name": 5 }),
        json!({ "id": "x" }),
        json!({ "id": "7", "name": "ok", "extra": true }),
        json!([]),
    ] {
        assert_eq!(run(&long, input.clone()), run(&short, input));
    }
}

#[test]
fn test_every_keyword_alias_matches_its_long_form() {
    let inputs = [
        json!({ "x": "1" }),
        json!({ "x": "y" }),
        json!([1, "2"]),
        json!(["a", "bb", "ccc"]),
        json!("a"),
        json!("abc"),
        json!(""),
        json!("1"),
        json!("1970-01-02"),
        json!(2),
        json!(1.5),
        json!(true),
        Value::Null,
    ];

    for keyword in KEYWORDS {
        let (long, short) = if keyword.long.starts_with('~') {
            (keyword.long.to_string(), keyword.short.to_string())
        } else {
            (format!("@{}", keyword.long), format!("@{}", keyword.short))
        };
        let long = pipeline(&keyword_schema(keyword, &long));
        let short = pipeline(&keyword_schema(keyword, &short));

        for input in &inputs {
            assert_eq!(
                run(&long, input.clone()),
                run(&short, input.clone()),
                "{} vs {} on {}",
                keyword.long,
                keyword.short,
                input
            );
        }
    }
}

#[test]
fn test_compiling_twice_gives_identical_pipelines() {
    let text = "#node( @o( id : @n!0 : @c(>=$0)!1, tags : @a(@s!2), \
                kids : @a(##node), limit : @n : @c(>id)!'order' ) ) ~e";
    let bind = || {
        compile(text)
            .unwrap()
            .bind(Bindings::new().injections([0.0]).errors(["nan", "neg", "tag"]))
    };
    let first = bind();
    let second = bind();

    for input in [
        json!({ "id": 1, "tags": ["a"], "kids": [], "limit": 2 }),
        json!({ "id": -1, "tags": [1], "kids": [{ "id": "x", "kids": [] }], "limit": 0 }),
        json!({ "id": "3", "tags": "no", "kids": [{ "id": 4, "tags": [], "kids": [], "limit": 9 }] }),
        json!([]),
        Value::Null,
    ] {
        assert_eq!(run(&first, input.clone()), run(&second, input));
    }
}

#[test]
fn test_recursive_schema_validates_every_depth() {
    let template = compile("#tree( @o( value : @n!'nan', children : @a(##tree) ) )").unwrap();
    assert_eq!(template.schema_count(), 1);
    let pipeline = template.pipeline();

    for depth in [0, 1, 5] {
        let (result, errors) = run(&pipeline, tree(depth, json!(1)));
        assert_eq!(result, Some(tree(depth, json!(1))), "depth {}", depth);
        assert!(errors.is_empty());
    }

    let (result, errors) = run(&pipeline, tree(5, json!("deep")));
    assert_eq!(result, Some(tree(5, Value::Null)));
    let path = format!("{}value", "children.0.".repeat(5));
    assert_eq!(errors, vec![(json!("nan"), path)]);
}

#[test]
fn test_reference_before_definition() {
    let pipeline = pipeline("@o( list : @a(##item), first : #item( @s!'text' ) )");

    let (result, errors) = run(&pipeline, json!({ "list": ["a", 1], "first": "b" }));
    assert_eq!(result, Some(json!({ "list": ["a", null], "first": "b" })));
    assert_eq!(errors, vec![(json!("text"), "list.1".to_string())]);
}

// ============================================================================
// Error Resolution
// ============================================================================

#[test]
fn test_positional_errors_resolve_at_tagged_nodes() {
    let pipeline = with_errors("@n!0 : @c(>=0)!1", &["e0", "e1"]);

    assert_eq!(run(&pipeline, json!("x")), (None, vec![(json!("e0"), String::new())]));
    assert_eq!(run(&pipeline, json!(-1)), (None, vec![(json!("e1"), String::new())]));
    assert_eq!(run(&pipeline, json!("2")), (Some(json!(2)), vec![]));
}

#[test]
fn test_missing_positional_error_reports_null() {
    let pipeline = pipeline("@n!3");
    assert_eq!(run(&pipeline, json!("x")), (None, vec![(Value::Null, String::new())]));
}

#[test]
fn test_untagged_failure_reports_nothing() {
    let (result, errors) = run(&pipeline("@n : @s!'unreachable'"), json!("x"));
    assert_eq!(result, None);
    assert!(errors.is_empty());
}

#[test]
fn test_literal_error() {
    let (_, errors) = run(&pipeline("@i!'not an integer'"), json!(1.5));
    assert_eq!(errors, vec![(json!("not an integer"), String::new())]);
}

#[test]
fn test_error_function_sees_failed_check() {
    let template = compile("@c(>=0)!0").unwrap();
    let pipeline = template.bind(Bindings::new().errors([Injected::func(|_, meta| {
        json!({ "validator": meta.validator, "params": meta.params })
    })]));

    let (_, errors) = run(&pipeline, json!(-5));
    assert_eq!(
        errors,
        vec![(json!({ "validator": "compare", "params": [">=", 0] }), String::new())]
    );
}

// ============================================================================
// Validators
// ============================================================================

#[test]
fn test_primitives_coerce() {
    assert_eq!(run(&pipeline("@n"), json!(" 4 ")).0, Some(json!(4)));
    assert_eq!(run(&pipeline("@b"), json!("true")).0, Some(json!(true)));
    assert_eq!(run(&pipeline("@i"), json!(12)).0, Some(json!(12)));
    assert_eq!(run(&pipeline("@i"), json!("12")).0, None);
    assert_eq!(run(&pipeline("@s"), json!(12)).0, None);
    assert_eq!(
        run(&pipeline("@d"), json!("1970-01-02")).0,
        Some(json!(86_400_000))
    );
    assert_eq!(run(&pipeline("@em"), json!("")).0, Some(json!("")));
    assert_eq!(run(&pipeline("@em"), json!("x")).0, None);
}

#[test]
fn test_equality() {
    let equal = pipeline("@eq('x')");
    assert_eq!(run(&equal, json!("x")).0, Some(json!("x")));
    assert_eq!(run(&equal, json!("y")).0, None);

    let not_null = pipeline("@ne(null)");
    assert_eq!(run(&not_null, json!(0)).0, Some(json!(0)));
    assert_eq!(run(&not_null, Value::Null).0, None);

    // Strict: no cross-type equality
    assert_eq!(run(&pipeline("@eq(1)"), json!("1")).0, None);
}

#[test]
fn test_one_of() {
    let pipeline = pipeline("@of(1, 'two', true)");
    assert_eq!(run(&pipeline, json!(1)).0, Some(json!(1)));
    assert_eq!(run(&pipeline, json!("two")).0, Some(json!("two")));
    assert_eq!(run(&pipeline, json!("1")).0, None);
    assert_eq!(run(&pipeline, Value::Null).0, None);
}

#[test]
fn test_regex() {
    let pipeline = pipeline(r"@r('^\d+$')!'digits'");
    assert_eq!(run(&pipeline, json!("123")).0, Some(json!("123")));
    assert_eq!(run(&pipeline, json!(123)).0, Some(json!(123)));
    assert_eq!(
        run(&pipeline, json!("12a")),
        (None, vec![(json!("digits"), String::new())])
    );
}

#[test]
fn test_length() {
    let pipeline = pipeline("@l(<=3)!'long'");
    assert_eq!(run(&pipeline, json!("abc")).0, Some(json!("abc")));
    assert_eq!(run(&pipeline, json!([1, 2, 3, 4])).1, vec![(json!("long"), String::new())]);
    assert_eq!(run(&pipeline, json!(5)).0, None);
}

#[test]
fn test_compare_against_date_literal() {
    let pipeline = pipeline("@d : @c(>'2020-01-01')");
    assert!(run(&pipeline, json!("2021-05-05")).0.is_some());
    assert!(run(&pipeline, json!("2019-05-05")).0.is_none());
}

#[test]
fn test_object_keeps_declared_fields_only() {
    let pipeline = pipeline("@o( a : @n!'req' )");
    assert_eq!(run(&pipeline, json!({ "a": "1", "b": 2 })).0, Some(json!({ "a": 1 })));
    assert_eq!(
        run(&pipeline, json!({})),
        (Some(json!({ "a": null })), vec![(json!("req"), "a".to_string())])
    );
}

#[test]
fn test_object_without_fields_accepts_any_object() {
    let pipeline = pipeline("@o!'obj'");
    assert_eq!(run(&pipeline, json!({ "x": 1 })).0, Some(json!({ "x": 1 })));
    assert_eq!(run(&pipeline, json!(5)), (None, vec![(json!("obj"), String::new())]));
}

#[test]
fn test_quoted_and_keyword_field_names() {
    let pipeline = pipeline("@o( 'first name' @s, date @d )");
    let (result, _) = run(&pipeline, json!({ "first name": "Ada", "date": 0 }));
    assert_eq!(result, Some(json!({ "first name": "Ada", "date": 0 })));
}

#[test]
fn test_array_items() {
    let numbers = pipeline("@a(@n!'nan')!'arr'");
    assert_eq!(run(&numbers, json!([1, "2"])).0, Some(json!([1, 2])));
    assert_eq!(
        run(&numbers, json!([1, "x", 3])),
        (Some(json!([1, null, 3])), vec![(json!("nan"), "1".to_string())])
    );
    assert_eq!(run(&numbers, json!("x")).1, vec![(json!("arr"), String::new())]);

    let anything = pipeline("@a");
    assert_eq!(run(&anything, json!([null])).0, Some(json!([null])));
}

// ============================================================================
// Dependencies
// ============================================================================

#[test]
fn test_cross_field_dependency() {
    let pipeline = pipeline("@o( start : @d, end : @d : @c(>start)!'order' )");

    let (result, errors) = run(&pipeline, json!({ "start": "2024-01-01", "end": "2023-12-31" }));
    assert_eq!(result, Some(json!({ "start": 1_704_067_200_000i64, "end": null })));
    assert_eq!(errors, vec![(json!("order"), "end".to_string())]);

    let (result, errors) = run(&pipeline, json!({ "start": "2024-01-01", "end": "2024-02-01" }));
    assert!(result.is_some());
    assert!(errors.is_empty());
}

#[test]
fn test_keyword_field_as_dependency() {
    let pipeline = pipeline("object( date : date, end : date : compare(>=date)!'early' )");

    let (result, errors) = run(&pipeline, json!({ "date": "2024-01-02", "end": "2024-01-01" }));
    assert_eq!(result, Some(json!({ "date": 1_704_153_600_000i64, "end": null })));
    assert_eq!(errors, vec![(json!("early"), "end".to_string())]);

    let (_, errors) = run(&pipeline, json!({ "date": "2024-01-01", "end": "2024-01-01" }));
    assert!(errors.is_empty());
}

#[test]
fn test_recursive_schema_shares_dependencies_across_depths() {
    let pipeline = pipeline("#node( @o( v : @n, kids : @a(##node), w : @n : @c(>=v)!'lt' ) )");

    assert!(run(&pipeline, json!({ "v": 1, "kids": [], "w": 5 })).1.is_empty());

    // The child publishes `v` last, so the outer `w` is compared against 10
    let (result, errors) = run(
        &pipeline,
        json!({ "v": 1, "kids": [{ "v": 10, "kids": [], "w": 10 }], "w": 5 }),
    );
    assert_eq!(errors, vec![(json!("lt"), "w".to_string())]);
    assert_eq!(
        result,
        Some(json!({ "v": 1, "kids": [{ "v": 10, "kids": [], "w": 10 }], "w": null }))
    );
}

#[test]
fn test_nested_object_sees_outer_field() {
    let pipeline = pipeline("@o( min : @n, inner : @o( v : @n : @c(>=min)!'low' ) )");

    let (_, errors) = run(&pipeline, json!({ "min": 5, "inner": { "v": 3 } }));
    assert_eq!(errors, vec![(json!("low"), "inner.v".to_string())]);
    assert!(run(&pipeline, json!({ "min": 5, "inner": { "v": 8 } })).0.is_some());
}

#[test]
fn test_failed_dependency_fails_dependents() {
    let pipeline = pipeline("@o( min : @n!'nan', max : @n : @c(>min)!'order' )");
    let (_, errors) = run(&pipeline, json!({ "min": "x", "max": 3 }));
    assert_eq!(
        errors,
        vec![
            (json!("nan"), "min".to_string()),
            (json!("order"), "max".to_string()),
        ]
    );
}

#[test]
fn test_forward_dependency_is_rejected() {
    let err = compile("@o( a : @n : @c(<b), b : @n )").unwrap_err();
    assert!(matches!(
        err,
        CompileError::ForwardDependency { ref field, ref dependency } if field == "a" && dependency == "b"
    ));

    let err = compile("@o( a : @n : @c(<a) )").unwrap_err();
    assert!(matches!(err, CompileError::ForwardDependency { .. }));
}

#[test]
fn test_unknown_dependency_is_rejected() {
    let err = compile("@o( a : @n : @c(<zzz) )").unwrap_err();
    assert!(matches!(err, CompileError::UnknownDependency(ref name) if name == "zzz"));

    let err = compile("@c(>x)").unwrap_err();
    assert!(matches!(err, CompileError::UnknownDependency(_)));
}

// ============================================================================
// Injections and Suffixes
// ============================================================================

#[test]
fn test_injected_values_and_functions() {
    let template = compile("@c(>=$0)").unwrap();
    let pipeline = template.bind(Bindings::new().injections([10.0]));
    assert!(run(&pipeline, json!(10)).0.is_some());
    assert!(run(&pipeline, json!(5)).0.is_none());

    // Functions receive the value under validation
    let template = compile("@of($0, $1)").unwrap();
    let pipeline = template.bind(Bindings::new().injections([
        Injected::from("a"),
        Injected::func(|value, _| value),
    ]));
    assert!(run(&pipeline, json!("anything")).0.is_some());
}

#[test]
fn test_error_suffix_collects_failures() {
    let pipeline = pipeline("@o( a : @n!'nan', b : @s!'str' ) ~e");

    let (result, errors) = run(&pipeline, json!({ "a": "x", "b": 1 }));
    assert!(errors.is_empty());
    assert_eq!(
        result,
        Some(json!({ "result": { "a": null, "b": null }, "errors": ["nan", "str"] }))
    );

    // A failing type guard leaves no result at all
    let (result, _) = run(&pipeline, json!("x"));
    assert_eq!(result, Some(json!({ "result": null, "errors": null })));

    let (result, _) = run(&pipeline, json!({ "a": 1, "b": "y" }));
    assert_eq!(result, Some(json!({ "result": { "a": 1, "b": "y" }, "errors": null })));
}

#[test]
fn test_error_suffix_with_processor() {
    let template = compile("@o( a : @n!'nan' ) ~e($0)").unwrap();
    let pipeline = template.bind(Bindings::new().injections([Injected::func(|error, meta| {
        json!({ "error": error, "at": meta.path_string() })
    })]));

    let (result, _) = run(&pipeline, json!({ "a": "x" }));
    assert_eq!(
        result,
        Some(json!({ "result": { "a": null }, "errors": [{ "error": "nan", "at": "a" }] }))
    );
}

#[test]
fn test_meta_suffix_ignores_caller_meta() {
    let plain = pipeline("@n!'nan'");
    let fresh = pipeline("@n!'nan' ~m");

    let path_of = |pipeline: &Pipeline| {
        let mut paths = Vec::new();
        let mut meta = Meta::new();
        meta.path.push(PathSegment::from("outer"));
        pipeline.validate(
            json!("x"),
            &mut |_, meta: &Meta| paths.push(meta.path_string()),
            &mut meta,
        );
        paths
    };

    assert_eq!(path_of(&plain), vec!["outer".to_string()]);
    assert_eq!(path_of(&fresh), vec![String::new()]);
}

// ============================================================================
// Pipelines
// ============================================================================

#[test]
fn test_pipeline_is_reusable() {
    let pipeline = pipeline("@o( min : @n, max : @n : @c(>min)!'order' )");
    let input = json!({ "min": 1, "max": 2 });

    let first = run(&pipeline, input.clone());
    let second = run(&pipeline, input);
    assert_eq!(first, second);
    assert!(first.0.is_some());
}

#[test]
fn test_pipeline_is_shared_across_threads() {
    let pipeline = pipeline("@o( n : @n!'nan' : @c(>=0)!'neg' )");
    std::thread::scope(|scope| {
        for i in 0..4 {
            let pipeline = &pipeline;
            scope.spawn(move || {
                assert_eq!(run(pipeline, json!({ "n": i })).0, Some(json!({ "n": i })));
                assert_eq!(run(pipeline, json!({ "n": -i - 1 })).1, vec![(json!("neg"), "n".to_string())]);
            });
        }
    });
}

#[test]
fn test_report_collects_failures() {
    let report = pipeline("@o( id : @n!'id' )").report(json!({ "id": "x" }));
    assert!(!report.is_valid());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].error, json!("id"));
    assert_eq!(report.failures[0].path, vec![PathSegment::from("id")]);
    assert_eq!(report.failures[0].validator.as_deref(), Some("number"));
}

#[test]
fn test_pipelines_mix_with_runtime_combinators() {
    let text: Validator = Arc::new(pipeline("@s!'str'"));
    let list: Validator = Arc::new(pipeline("@a!'arr'"));
    let either = runtime::or(vec![text, list]);

    let mut errors = Vec::new();
    let mut meta = Meta::new();
    assert!(either
        .validate(json!("x"), &mut |e, _: &Meta| errors.push(e), &mut meta)
        .is_some());
    assert!(either
        .validate(json!([1]), &mut |e, _: &Meta| errors.push(e), &mut meta)
        .is_some());
    assert!(either
        .validate(json!(5), &mut |e, _: &Meta| errors.push(e), &mut meta)
        .is_none());
    // Every candidate failed, so both failures are reported
    assert_eq!(errors, vec![json!("str"), json!("arr")]);
}

// ============================================================================
// Compile Errors
// ============================================================================

#[test]
fn test_parse_errors_pass_through() {
    assert!(matches!(compile("@n %"), Err(CompileError::Parse(_))));
    assert!(matches!(compile("@n)"), Err(CompileError::Parse(_))));
}

#[test]
fn test_duplicate_schema() {
    let err = compile("@o( x : #a(@n), y : #a(@s) )").unwrap_err();
    assert!(matches!(err, CompileError::DuplicateSchema(ref name) if name == "a"));
}

#[test]
fn test_undefined_schema() {
    let err = compile("@a(##missing)").unwrap_err();
    assert!(matches!(err, CompileError::UndefinedSchema(ref name) if name == "missing"));
}

#[test]
fn test_invalid_regex() {
    let err = compile("@r('(')").unwrap_err();
    assert!(matches!(err, CompileError::InvalidRegex { ref pattern, .. } if pattern == "("));
}

#[test]
fn test_invalid_params() {
    let err = compile("@l(>'abc')").unwrap_err();
    assert!(matches!(err, CompileError::InvalidParams { ref validator, .. } if validator == "length"));

    let err = compile("@o( a : @n, a : @s )").unwrap_err();
    assert!(matches!(err, CompileError::InvalidParams { .. }));

    let err = compose(vec![node("number", vec![Param::Text("x".into())])]).unwrap_err();
    assert!(matches!(err, CompileError::InvalidParams { .. }));

    let tagged = ValidatorData {
        error: Some(ErrorTag::Positional(0)),
        ..ValidatorData::new("define", vec![])
    };
    let err = compose(vec![Param::Validator(tagged)]).unwrap_err();
    assert!(matches!(err, CompileError::InvalidParams { .. }));
}

#[test]
fn test_unknown_validator() {
    let err = compose(vec![node("bogus", vec![])]).unwrap_err();
    assert!(matches!(err, CompileError::UnknownValidator(ref name) if name == "bogus"));
}

#[test]
fn test_misplaced_suffix() {
    let err = compose(vec![node("~error", vec![]), node("number", vec![])]).unwrap_err();
    assert!(matches!(err, CompileError::MisplacedSuffix(ref name) if name == "~error"));

    let inner = node("array", vec![node("~meta", vec![])]);
    let err = compose(vec![inner]).unwrap_err();
    assert!(matches!(err, CompileError::MisplacedSuffix(ref name) if name == "~meta"));

    let err = compose(vec![node("~meta", vec![])]).unwrap_err();
    assert!(matches!(err, CompileError::InvalidParams { .. }));
}
