//! IcedCoffee CLI - компилятор и интерактивная оболочка.
//!
//! Использование:
//!   icedcoffee                 - запустить REPL
//!   icedcoffee <file.ic>       - скомпилировать файл
//!   icedcoffee -e "source"     - скомпилировать фрагмент
//!   icedcoffee --help          - справка

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use std::fs;
use std::process;

use icedcoffee::{compile, compile_file, CompileError, CompileOptions};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP: &str = r#"
IcedCoffee - a tiny typed language that compiles to JavaScript

USAGE:
    icedcoffee                   Start REPL (interactive mode)
    icedcoffee <file.ic>         Compile a file and print JavaScript
    icedcoffee -e "<source>"     Compile a snippet
    icedcoffee --help, -h        Show this help
    icedcoffee --version, -v     Show version

OPTIONS:
    --no-optimize                Skip the optimizer
    --json                       Print errors as JSON diagnostics

REPL COMMANDS:
    :help, :h                Show help
    :quit, :q, :exit         Exit REPL
    :reset, :r               Forget everything entered so far
    :optimize, :o            Toggle the optimizer
    :source, :s              Show the accumulated source
    :load <file>             Load a file into the session

EXAMPLES:
    icedcoffee -e "print(5 + 8)"
    icedcoffee --no-optimize program.ic

SYNTAX:
    int x = 3                    ## Declaration
    x += 1                       ## Compound assignment
    print(x > 2 ? x : 0)         ## Ternary
    array[int] xs = [1, 2, 3]
    for v in xs { print(v) }
    func square(n: int) -> int {
      return n * n
    }
"#;

/// Разобранные аргументы командной строки.
struct Args {
    options: CompileOptions,
    json: bool,
    positional: Vec<String>,
}

fn parse_args() -> Args {
    let mut options = CompileOptions::default();
    let mut json = false;
    let mut positional = Vec::new();

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--no-optimize" => options.optimize = false,
            "--json" => json = true,
            _ => positional.push(arg),
        }
    }

    Args {
        options,
        json,
        positional,
    }
}

fn main() {
    env_logger::init();

    let args = parse_args();
    let positional: Vec<&str> = args.positional.iter().map(String::as_str).collect();

    match positional.as_slice() {
        [] => run_repl(args.options),
        ["--help" | "-h"] => println!("{}", HELP),
        ["--version" | "-v"] => println!("IcedCoffee {}", VERSION),
        ["-e" | "--eval", source] => {
            report(compile(source, &args.options), args.json);
        }
        [flag] if flag.starts_with('-') => {
            eprintln!("Unknown option: {}", flag);
            eprintln!("Use --help for usage information.");
            process::exit(1);
        }
        [file] => report(compile_file(file, &args.options), args.json),
        _ => {
            eprintln!("Too many arguments.");
            eprintln!("Use --help for usage information.");
            process::exit(1);
        }
    }
}

/// Напечатать результат компиляции; при ошибке выйти с кодом 1.
fn report(result: Result<String, CompileError>, json: bool) {
    match result {
        Ok(js) => {
            if !js.is_empty() {
                println!("{}", js);
            }
        }
        Err(e) => {
            if json {
                let diagnostic = serde_json::to_string(&e.diagnostic()).unwrap_or_else(|_| e.to_string());
                println!("{}", diagnostic);
            } else {
                eprintln!("{}", e);
            }
            process::exit(1);
        }
    }
}

// === REPL ===

/// Состояние сессии REPL.
///
/// Каждый ввод компилируется вместе со всем, что было принято раньше,
/// чтобы объявления оставались видны. Печатаются только новые строки.
struct Session {
    source: String,
    options: CompileOptions,
    /// Сколько строк JS уже показано
    emitted: usize,
}

impl Session {
    fn new(options: CompileOptions) -> Self {
        Self {
            source: String::new(),
            options,
            emitted: 0,
        }
    }

    /// Скомпилировать фрагмент в контексте сессии.
    ///
    /// При ошибке сессия не меняется.
    fn submit(&mut self, chunk: &str) -> Result<Vec<String>, CompileError> {
        let candidate = if self.source.is_empty() {
            chunk.to_string()
        } else {
            format!("{}\n{}", self.source, chunk)
        };
        let js = compile(&candidate, &self.options)?;
        let lines: Vec<String> = js.lines().map(String::from).collect();
        let fresh = lines.get(self.emitted..).unwrap_or_default().to_vec();
        self.source = candidate;
        self.emitted = lines.len();
        Ok(fresh)
    }

    fn toggle_optimize(&mut self) -> Result<(), CompileError> {
        self.options.optimize = !self.options.optimize;
        let js = compile(&self.source, &self.options)?;
        self.emitted = js.lines().count();
        Ok(())
    }
}

/// Запустить REPL.
fn run_repl(options: CompileOptions) {
    println!("IcedCoffee {} - compiles to JavaScript", VERSION);
    println!("Type :help for commands, :quit to exit.\n");

    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Failed to initialize readline: {}", e);
            process::exit(1);
        }
    };

    let mut session = Session::new(options);
    let history_path = dirs_next::data_dir()
        .map(|p| p.join("icedcoffee").join("history.txt"))
        .unwrap_or_else(|| std::path::PathBuf::from(".icedcoffee_history"));

    // Загрузить историю
    let _ = rl.load_history(&history_path);

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "ic> " } else { "...> " };
        match rl.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    if trimmed.starts_with(':') {
                        match handle_command(trimmed, &mut session) {
                            CommandResult::Continue => continue,
                            CommandResult::Exit => break,
                            CommandResult::Reset => {
                                session = Session::new(session.options);
                                println!("Session reset.");
                                continue;
                            }
                        }
                    }
                } else {
                    let _ = rl.add_history_entry(line.trim());
                }

                buffer.push_str(&line);
                buffer.push('\n');

                // Блок не закрыт: читать дальше
                if open_braces(&buffer) > 0 {
                    continue;
                }

                execute_chunk(&mut session, &buffer);
                buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    // Сохранить историю
    if let Some(parent) = history_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = rl.save_history(&history_path);
}

enum CommandResult {
    Continue,
    Exit,
    Reset,
}

fn handle_command(cmd: &str, session: &mut Session) -> CommandResult {
    let parts: Vec<&str> = cmd.splitn(2, ' ').collect();
    let command = parts[0];
    let arg = parts.get(1).map(|s| s.trim());

    match command {
        ":help" | ":h" => {
            println!("{}", HELP);
            CommandResult::Continue
        }
        ":quit" | ":q" | ":exit" => CommandResult::Exit,
        ":reset" | ":r" => CommandResult::Reset,
        ":optimize" | ":o" => {
            match session.toggle_optimize() {
                Ok(()) => println!(
                    "Optimizer {}.",
                    if session.options.optimize { "on" } else { "off" }
                ),
                Err(e) => eprintln!("{}", e),
            }
            CommandResult::Continue
        }
        ":source" | ":s" => {
            if session.source.is_empty() {
                println!("No source entered yet.");
            } else {
                println!("{}", session.source);
            }
            CommandResult::Continue
        }
        ":load" | ":l" => {
            if let Some(path) = arg {
                load_file(path, session);
            } else {
                println!("Usage: :load <file.ic>");
            }
            CommandResult::Continue
        }
        _ => {
            println!("Unknown command: {}", command);
            println!("Type :help for available commands.");
            CommandResult::Continue
        }
    }
}

fn execute_chunk(session: &mut Session, chunk: &str) {
    match session.submit(chunk.trim_end()) {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
        }
        Err(e) => eprintln!("{}", e),
    }
}

fn load_file(path: &str, session: &mut Session) {
    let source = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading '{}': {}", path, e);
            return;
        }
    };

    println!("Loading {}...", path);
    execute_chunk(session, &source);
}

/// Баланс фигурных скобок вне строковых литералов.
fn open_braces(text: &str) -> i32 {
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            // `##` до конца строки
            '#' if chars.peek() == Some(&'#') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
            }
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_braces_counts_blocks() {
        assert_eq!(open_braces("if x {\n"), 1);
        assert_eq!(open_braces("if x {\n}\n"), 0);
    }

    #[test]
    fn test_open_braces_ignores_strings_and_comments() {
        assert_eq!(open_braces("print(\"{\\\"{\")\n"), 0);
        assert_eq!(open_braces("print(1) ## {\n"), 0);
        assert_eq!(open_braces("while true { ## }\n"), 1);
        assert_eq!(open_braces("print(\"##\") {"), 1);
    }
}
