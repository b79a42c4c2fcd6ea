use hsl_script::lang::ast::print_program;
use hsl_script::lang::{parse, tokenize};
use hsl_script::{CaptureSink, ErrorReporter, Phase, Script, Status};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn phases(source: &str) -> Vec<(Phase, usize)> {
    let mut script = Script::new(source).with_output(Arc::new(CaptureSink::new()));
    script
        .evaluate()
        .diagnostics()
        .iter()
        .map(|d| (d.phase, d.line))
        .collect()
}

#[test]
fn test_bad_declaration_recovers() {
    let mut reporter = ErrorReporter::new();
    let tokens = tokenize("var = ;\nvar ok = 2;", &mut reporter);
    let statements = parse(tokens, &mut reporter);

    assert_eq!(reporter.diagnostics().len(), 1);
    assert_eq!(reporter.diagnostics()[0].phase, Phase::Parsing);
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].to_string(), "var ok = 2;");
}

#[test]
fn test_lexing_errors_keep_going() {
    assert_eq!(
        phases("var a = 1 @;\nvar b = 2 #;"),
        vec![(Phase::Lexing, 1), (Phase::Lexing, 2)]
    );
}

#[test]
fn test_front_end_stops_before_resolving() {
    // The resolver would also object to `this`, but parsing failed first
    let mut script = Script::new("print this;\nvar = 1;");
    let ctx = script.evaluate();

    assert_eq!(ctx.status(), &Status::Rejected(Phase::Parsing));
    assert!(ctx.diagnostics().iter().all(|d| d.phase == Phase::Parsing));
}

#[test]
fn test_resolving_errors_accumulate() {
    assert_eq!(
        phases("break;\n{ var a = 1; var a = 2; }\nprint this;"),
        vec![
            (Phase::Resolving, 1),
            (Phase::Resolving, 2),
            (Phase::Resolving, 3)
        ]
    );
}

#[test]
fn test_diagnostic_display_and_json() {
    let mut script = Script::new("print (1;");
    let ctx = script.evaluate();

    let diagnostic = &ctx.diagnostics()[0];
    assert_eq!(diagnostic.to_string(), "[parsing error] line 1:9 at ';': Expected ')' after expression.");

    let json = ctx.diagnostics_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed[0]["phase"], "parsing");
    assert_eq!(parsed[0]["lexeme"], ";");
}

#[test]
fn test_printed_program_reparses_identically() {
    let source = r#"
class Counter extends Base {
    Counter(start) { this.n = start; }
    next() { return this.n++; }
}
fun pick(a, b) { return a ?: b ? 1 : 2; }
for (var i = 0; i < 3; i = i + 1) print -i * (2 + 3) >> 1;
var f = fun (x) { return [x, x and !x]; };
"#;
    let mut reporter = ErrorReporter::new();
    let first = print_program(&parse(tokenize(source, &mut reporter), &mut reporter));
    assert!(!reporter.has_errors());

    let second = print_program(&parse(tokenize(&first, &mut reporter), &mut reporter));
    assert!(!reporter.has_errors());
    assert_eq!(first, second);
}

#[test]
fn test_deep_nesting_is_a_parse_error() {
    let depth = 5_000;
    let source = format!("var x = {}1{};", "[".repeat(depth), "]".repeat(depth));
    let mut script = Script::new(source).with_output(Arc::new(CaptureSink::new()));
    let ctx = script.evaluate();

    assert_eq!(ctx.status(), &Status::Rejected(Phase::Parsing));
    assert_eq!(ctx.diagnostics()[0].message, "Expression nested too deeply.");
}
