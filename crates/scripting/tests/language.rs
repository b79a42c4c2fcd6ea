use hsl_config::EngineConfig;
use hsl_script::{CaptureSink, Phase, Script, ScriptContext, Status, Value};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn run(source: &str) -> (ScriptContext, Vec<String>) {
    run_with(source, EngineConfig::default())
}

fn run_with(source: &str, config: EngineConfig) -> (ScriptContext, Vec<String>) {
    let sink = CaptureSink::new();
    let mut script = Script::new(source)
        .with_config(config)
        .with_output(Arc::new(sink.clone()));
    let ctx = script.evaluate();
    (ctx, sink.lines())
}

fn printed(source: &str) -> Vec<String> {
    let (ctx, lines) = run(source);
    assert!(ctx.is_success(), "diagnostics: {:?}", ctx.diagnostics());
    lines
}

#[test]
fn test_nested_shadowing() {
    assert_eq!(
        printed("{ var x = 1; { var x = 2; print x; } print x; }"),
        vec!["2", "1"]
    );
}

#[test]
fn test_closure_sees_later_mutation() {
    let source = r#"
var x = "before";
fun show() { print x; }
x = "after";
show();

fun make() {
    var n = 1;
    fun get() { return n; }
    n = 10;
    return get;
}
print make()();
"#;
    assert_eq!(printed(source), vec!["after", "10"]);
}

#[test]
fn test_deep_return_ends_only_that_call() {
    let source = r#"
fun find() {
    {
        {
            {
                return "found";
            }
        }
    }
    print "unreachable";
}
print find();
print "after";
"#;
    assert_eq!(printed(source), vec!["found", "after"]);
}

#[test]
fn test_resolve_versus_evaluate() {
    let mut script = Script::new("var a = 1;");

    let resolved = script.resolve();
    assert!(resolved.is_declared("a"));
    assert!(resolved.bindings().is_empty());

    let evaluated = script.evaluate();
    let names: Vec<_> = evaluated.bindings().keys().cloned().collect();
    assert_eq!(names, vec!["a".to_string()]);
    assert_eq!(evaluated.get("a"), Some(&Value::Number(1.0)));
}

#[test]
fn test_truthiness() {
    let source = r#"
if (0) print "zero";
if ("") print "empty";
if (nil) print "nil"; else print "not nil";
if (none) print "none"; else print "not none";
if (false) print "false"; else print "not false";
"#;
    assert_eq!(
        printed(source),
        vec!["zero", "empty", "not nil", "not none", "not false"]
    );
}

#[test]
fn test_conditional_precedence() {
    let source = r#"
var a = nil;
var b = true ? 1 : 2 + 10;
print b;
print false ? 1 : true ? 2 : 3;
print a ?: "default";
var c = a ?: 3 + 4;
print c;
print 1 < 2 ? "lt" : "ge";
"#;
    assert_eq!(printed(source), vec!["1", "2", "default", "7", "lt"]);
}

#[test]
fn test_classes_and_constructors() {
    let source = r#"
class Point {
    Point(x, y) {
        this.x = x;
        this.y = y;
    }
    sum() { return this.x + this.y; }
}
class Point3 extends Point {
    Point3(x, y, z) {
        super.Point(x, y);
        this.z = z;
    }
    sum() { return super.sum() + this.z; }
}
var p = Point(1, 2);
print p.sum();
print Point3(1, 2, 3).sum();
var m = p.sum;
p.x = 10;
print m();
"#;
    assert_eq!(printed(source), vec!["3", "6", "12"]);
}

#[test]
fn test_lambdas_and_arrays() {
    let source = r#"
var add = fun (a, b) { return a + b; };
var xs = [1, 2, 3];
xs[0] = add(xs[0], 10);
push(xs, 4);
print xs;
print len(xs);
print pop(xs);
print [] == [];
var ys = xs;
ys[1] = "two";
print xs[1];
print "abc"[1];
"#;
    assert_eq!(
        printed(source),
        vec!["[11, 2, 3, 4]", "4", "4", "false", "two", "b"]
    );
}

#[test]
fn test_char_literal_is_string() {
    assert_eq!(printed("print 'a' + 'b'; print type('z');"), vec!["ab", "string"]);
}

#[test]
fn test_runtime_error_is_terminal() {
    let (ctx, lines) = run("print 1;\nprint nope;\nprint 2;");

    assert_eq!(lines, vec!["1"]);
    assert!(matches!(ctx.status(), Status::Failed(err) if err.line == 2));
    assert_eq!(ctx.diagnostics().len(), 1);
    assert_eq!(ctx.diagnostics()[0].phase, Phase::Interpreting);
    assert_eq!(ctx.diagnostics()[0].message, "Undefined variable 'nope'.");
    assert!(ctx.into_result().is_err());
}

#[test]
fn test_test_blocks() {
    let source = r#"
module math;
fun square(n) { return n * n; }
test "squares" { assert(square(3) == 9); }
test "broken" { assert(square(2) == 5, "2 squared"); }
print "done";
"#;
    let (ctx, lines) = run(source);

    assert!(ctx.is_success());
    assert_eq!(lines, vec!["done"]);
    assert_eq!(ctx.module_name(), Some("math"));
    assert_eq!(ctx.tests().len(), 2);
    assert!(ctx.tests()[0].passed);
    let failed: Vec<_> = ctx.failed_tests().map(|t| t.name.as_str()).collect();
    assert_eq!(failed, vec!["broken"]);
    assert!(ctx.tests()[1]
        .message
        .as_deref()
        .is_some_and(|m| m.contains("2 squared")));
}

#[test]
fn test_top_level_return_value() {
    let (ctx, lines) = run("print \"start\"; return 6 * 7;");
    assert_eq!(lines, vec!["start"]);
    assert_eq!(ctx.result(), Some(&Value::Number(42.0)));
}

#[test]
fn test_without_resolver() {
    let config = EngineConfig {
        resolve: false,
        ..EngineConfig::default()
    };
    let (ctx, lines) = run_with("var a = 1; { var a = 2; print a; } print a;", config.clone());
    assert!(ctx.is_success());
    assert_eq!(lines, vec!["2", "1"]);

    // Resolver errors surface at runtime instead
    let (ctx, _) = run_with("while (false) {} break;", config.clone());
    assert!(matches!(ctx.status(), Status::Failed(_)));
    assert_eq!(ctx.diagnostics()[0].phase, Phase::Interpreting);

    let (ctx, lines) = run_with("test \"t\" { return 1; print \"x\"; }", config);
    assert!(ctx.is_success());
    assert!(lines.is_empty());
    assert_eq!(ctx.failed_tests().count(), 1);
    assert!(ctx.tests()[0]
        .message
        .as_deref()
        .is_some_and(|m| m.contains("Can't return from a test block.")));
}

#[test]
fn test_without_builtins() {
    let config = EngineConfig {
        builtins: false,
        ..EngineConfig::default()
    };
    let (ctx, _) = run_with("print clock();", config);
    assert!(matches!(ctx.status(), Status::Failed(_)));
    assert!(ctx.natives().is_empty());
}

#[test]
fn test_recursion_limit() {
    let config = EngineConfig {
        max_call_depth: 20,
        ..EngineConfig::default()
    };
    let (ctx, _) = run_with(
        "fun down(n) { if (n == 0) return 0; return down(n - 1); } print down(10); down(50);",
        config,
    );
    assert!(matches!(ctx.status(), Status::Failed(err) if err.to_string().contains("Stack overflow")));
}

#[test]
fn test_deep_recursion_with_default_config() {
    let (ctx, lines) = run(
        "fun down(n) { if (n == 0) return 0; { { return down(n - 1); } } } print down(20); down(100000);",
    );
    assert_eq!(lines, vec!["0"]);
    assert!(matches!(ctx.status(), Status::Failed(err) if err.to_string().contains("Stack overflow")));
}

#[test]
fn test_subclass_constructor_chains_to_parent() {
    let source = r#"
class Animal {
    Animal(name) { this.name = name; }
    describe() { return this.name + " the " + this.kind; }
}
class Dog extends Animal {
    Dog(name) {
        super.Animal(name);
        this.kind = "dog";
    }
}
class Puppy extends Dog {
    Puppy(name) { super.Dog(name + " jr"); }
}
print Dog("Rex").describe();
print Puppy("Rex").describe();
"#;
    assert_eq!(printed(source), vec!["Rex the dog", "Rex jr the dog"]);
}
