//! End-to-end tests: source text in, JavaScript out.

use std::io::Write;

use icedcoffee::{compile, compile_file, CompileError, CompileOptions};

fn js(source: &str) -> String {
    compile(source, &CompileOptions::default()).unwrap()
}

fn js_unoptimized(source: &str) -> String {
    compile(source, &CompileOptions::unoptimized()).unwrap()
}

#[test]
fn test_small_program() {
    assert_eq!(
        js("int x = 3\nx += 1\nbool y = true\nprint((y && y) || x != 5)"),
        "let x = 3;\nx += 1;\nlet y = true;\nconsole.log(((y && y) || (x !== 5)));"
    );
}

#[test]
fn test_array_iteration() {
    assert_eq!(
        js("array[int] a = [1, 2, 3]\nfor v in a {\n  print(v)\n}"),
        "let a = [1, 2, 3];\nfor (const v of a) {\n  console.log(v);\n}"
    );
}

#[test]
fn test_void_function_returning_value() {
    let err = compile(
        "int z = 1\nfunc f() -> void {\n  return z\n}",
        &CompileOptions::default(),
    )
    .unwrap_err();
    match err {
        CompileError::Semantic(e) => {
            assert_eq!(e.message, "Cannot return in a void function");
            assert_eq!(e.position.map(|p| (p.line, p.column)), Some((3, 3)));
        }
        other => panic!("Expected semantic error, got {:?}", other),
    }
}

#[test]
fn test_syntax_error_position() {
    let err = compile("int x = 1\nprint(7 * ((2 _ 3)", &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
    assert!(
        err.to_string().starts_with("Syntax error: Line 2, col 15"),
        "{}",
        err
    );
}

#[test]
fn test_functions_and_recursion() {
    let source = "\
func fact(n: int) -> int {
  if n <= 1 {
    return 1
  }
  return n * fact(n - 1)
}
print(fact(5))";
    assert_eq!(
        js(source),
        "function fact(n) {\n  if ((n <= 1)) {\n    return 1;\n  }\n  return (n * fact((n - 1)));\n}\nconsole.log(fact(5));"
    );
}

#[test]
fn test_optimizer_in_pipeline() {
    let source = "int x = 2\nif false {\n  print(1)\n} else {\n  print(x * 1 + 2 ^ 3)\n}\nwhile false {\n  x = x\n}";
    assert_eq!(js(source), "let x = 2;\nconsole.log((x + 8));");
    assert_eq!(
        js_unoptimized(source),
        "let x = 2;\nif (false) {\n  console.log(1);\n} else {\n  console.log(((x * 1) + (2 ** 3)));\n}\nwhile (false) {\n  x = x;\n}"
    );
}

#[test]
fn test_int_range_loop_and_strings() {
    assert_eq!(
        js("for i in 3 {\n  print(\"tab\\there\")\n}"),
        "for (let i = 0; i < 3; i++) {\n  console.log(\"tab\\there\");\n}"
    );
}

#[test]
fn test_compile_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "## greeting").unwrap();
    writeln!(file, "string name = \"world\"").unwrap();
    writeln!(file, "print(name)").unwrap();

    let output = compile_file(file.path(), &CompileOptions::default()).unwrap();
    assert_eq!(output, "let name = \"world\";\nconsole.log(name);");
}

#[test]
fn test_compile_file_reports_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "print(missing)").unwrap();

    let err = compile_file(file.path(), &CompileOptions::default()).unwrap_err();
    let diagnostic = serde_json::to_value(err.diagnostic()).unwrap();
    assert_eq!(diagnostic["kind"], "semantic");
    assert_eq!(diagnostic["line"], 1);
    assert_eq!(diagnostic["column"], 7);
}

#[test]
fn test_deeply_nested_expression() {
    let depth = 2000;
    let mut source = String::from("print(");
    source.push_str(&"(1 + ".repeat(depth));
    source.push('1');
    source.push_str(&")".repeat(depth));
    source.push(')');

    let output = js(&source);
    assert_eq!(output, format!("console.log({});", depth + 1));
}

#[test]
fn test_declaration_in_if_visible_after_it() {
    let source = "int x = 1\nif x > 0 {\n int y = 2\n}\nprint(y)";
    let expected = "let x = 1;\nlet y;\nif ((x > 0)) {\n  y = 2;\n}\nconsole.log(y);";
    assert_eq!(js_unoptimized(source), expected);
    assert_eq!(js(source), expected);
}

#[test]
fn test_loop_over_shadowed_name() {
    assert_eq!(
        js("int i = 3\nfor i in i {\n  print(i)\n}"),
        "let i = 3;\nfor (let i_2 = 0; i_2 < i; i_2++) {\n  console.log(i_2);\n}"
    );
}
