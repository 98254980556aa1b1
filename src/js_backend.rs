//! Модуль `js_backend`
//!
//! Генерация JavaScript из типизированного AST.
//!
//! Каждая инструкция превращается в одну или несколько строк; вложенные
//! блоки сдвигаются на два пробела, фигурная скобка остаётся на строке
//! с управляющей конструкцией. Выражения всегда берутся в скобки, так что
//! приоритеты операторов JS не важны.
//!
//! Каждая сущность получает своё имя JS в момент объявления: повторное
//! исходное имя (затенение, переименованное ключевое слово) получает
//! суффикс `_2`, `_3`, ... Поэтому `for i in i` не захватывает коллекцию
//! переменной цикла.
//!
//! Тела `if` не открывают области видимости, а блок JS открывает.
//! Объявления из веток выносятся в `let a, b;` перед `if`, а в самих
//! ветках становятся присваиваниями.

use std::collections::{HashMap, HashSet};

use crate::ast::{Call, Entities, Expression, FunctionId, IfStatement, Program, Statement, VariableId};
use crate::ops::{BinaryOp, UnaryOp};

/// Отступ одного уровня вложенности.
const INDENT: &str = "  ";

/// Зарезервированные слова JavaScript, которые нельзя использовать как имена.
const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
    "new", "null", "package", "private", "protected", "public", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while",
    "with", "yield", "console", "NaN", "Infinity",
];

/// JS backend.
pub struct JsBackend<'a> {
    /// Арена сущностей программы (имена переменных и функций)
    entities: &'a Entities,
    /// Уже сгенерированные строки
    lines: Vec<String>,
    /// Текущая глубина вложенности
    depth: usize,
    /// Выданные имена переменных
    variable_names: HashMap<VariableId, String>,
    /// Выданные имена функций
    function_names: HashMap<FunctionId, String>,
    /// Все занятые имена JS
    used_names: HashSet<String>,
    /// Переменные, уже объявленные через `let` перед `if`
    hoisted: HashSet<VariableId>,
}

impl<'a> JsBackend<'a> {
    /// Создать backend для программы с данной ареной.
    pub fn new(entities: &'a Entities) -> Self {
        Self {
            entities,
            lines: Vec::new(),
            depth: 0,
            variable_names: HashMap::new(),
            function_names: HashMap::new(),
            used_names: HashSet::new(),
            hoisted: HashSet::new(),
        }
    }

    /// Сгенерировать строки для списка инструкций верхнего уровня.
    pub fn compile(mut self, statements: &[Statement]) -> Vec<String> {
        self.emit_block(statements);
        log::debug!("js_backend: {} lines", self.lines.len());
        self.lines
    }

    fn emit(&mut self, line: String) {
        let mut indented = INDENT.repeat(self.depth);
        indented.push_str(&line);
        self.lines.push(indented);
    }

    fn emit_block(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.emit_statement(statement);
        }
    }

    fn emit_nested(&mut self, statements: &[Statement]) {
        self.depth += 1;
        self.emit_block(statements);
        self.depth -= 1;
    }

    fn emit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDeclaration {
                variable,
                initializer,
            } => {
                let value = self.expression(initializer);
                let line = if self.hoisted.contains(variable) {
                    format!("{} = {};", self.variable(*variable), value)
                } else {
                    format!("let {} = {};", self.declare_variable(*variable), value)
                };
                self.emit(line);
            }

            Statement::Assignment { target, op, source } => {
                let line = format!(
                    "{} {} {};",
                    self.variable(*target),
                    op.symbol(),
                    self.expression(source)
                );
                self.emit(line);
            }

            Statement::Print(argument) => {
                let line = format!("console.log({});", self.expression(argument));
                self.emit(line);
            }

            Statement::If(statement) => {
                self.hoist_branch_declarations(statement);
                let line = format!("if ({}) {{", self.expression(&statement.test));
                self.emit(line);
                self.emit_nested(&statement.consequent);
                for clause in &statement.else_ifs {
                    let line = format!("}} else if ({}) {{", self.expression(&clause.test));
                    self.emit(line);
                    self.emit_nested(&clause.body);
                }
                if let Some(alternate) = &statement.alternate {
                    self.emit("} else {".to_string());
                    self.emit_nested(alternate);
                }
                self.emit("}".to_string());
            }

            Statement::While { test, body } => {
                let line = format!("while ({}) {{", self.expression(test));
                self.emit(line);
                self.emit_nested(body);
                self.emit("}".to_string());
            }

            Statement::For {
                iterator,
                collection,
                body,
            } => {
                let collection_code = self.expression(collection);
                let name = self.declare_variable(*iterator);
                let line = if collection.ty(self.entities).is_array() {
                    format!("for (const {} of {}) {{", name, collection_code)
                } else {
                    format!(
                        "for (let {name} = 0; {name} < {}; {name}++) {{",
                        collection_code
                    )
                };
                self.emit(line);
                self.emit_nested(body);
                self.emit("}".to_string());
            }

            Statement::Return(value) => {
                let line = match value {
                    Some(value) => format!("return {};", self.expression(value)),
                    None => "return;".to_string(),
                };
                self.emit(line);
            }

            Statement::FunctionDeclaration { function, body } => {
                let name = self.declare_function(*function);
                let entities = self.entities;
                let params: Vec<String> = entities
                    .function(*function)
                    .parameters
                    .iter()
                    .map(|p| self.declare_variable(*p))
                    .collect();
                let line = format!("function {}({}) {{", name, params.join(", "));
                self.emit(line);
                self.emit_nested(body);
                self.emit("}".to_string());
            }

            Statement::Call(call) => {
                let line = format!("{};", self.call(call));
                self.emit(line);
            }
        }
    }

    /// Код выражения.
    pub fn expression(&self, expr: &Expression) -> String {
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || self.expression_inner(expr))
    }

    fn expression_inner(&self, expr: &Expression) -> String {
        match expr {
            Expression::Int(n) if *n < 0 => format!("({})", n),
            Expression::Int(n) => n.to_string(),
            Expression::Double(f) if f.is_sign_negative() => format!("({:?})", f),
            // `{:?}` печатает кратчайшее представление, которое читается обратно
            Expression::Double(f) => format!("{:?}", f),
            Expression::Bool(b) => b.to_string(),
            Expression::StringLiteral(s) => serde_json::Value::String(s.clone()).to_string(),
            Expression::Variable(id) => self.variable(*id),
            Expression::Binary {
                op, left, right, ..
            } => format!(
                "({} {} {})",
                self.expression(left),
                binary_symbol(*op),
                self.expression(right)
            ),
            Expression::Unary { op, operand, .. } => {
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                };
                format!("({}{})", symbol, self.expression(operand))
            }
            Expression::Ternary {
                test,
                consequent,
                alternate,
                ..
            } => format!(
                "({} ? {} : {})",
                self.expression(test),
                self.expression(consequent),
                self.expression(alternate)
            ),
            Expression::Call(call) => self.call(call),
            Expression::ArrayAccess { array, index, .. } => {
                format!("{}[{}]", self.expression(array), self.expression(index))
            }
            Expression::ArrayLiteral { elements, .. } => {
                let items: Vec<String> = elements.iter().map(|e| self.expression(e)).collect();
                format!("[{}]", items.join(", "))
            }
        }
    }

    fn call(&self, call: &Call) -> String {
        let args: Vec<String> = call.args.iter().map(|a| self.expression(a)).collect();
        format!("{}({})", self.function(call.callee), args.join(", "))
    }

    /// Объявить переменные из веток `if` одной строкой перед ним.
    fn hoist_branch_declarations(&mut self, statement: &IfStatement) {
        let mut declared = Vec::new();
        collect_branch_declarations(statement, &mut declared);

        let mut names = Vec::new();
        for variable in declared {
            if self.hoisted.insert(variable) {
                names.push(self.declare_variable(variable));
            }
        }
        if !names.is_empty() {
            self.emit(format!("let {};", names.join(", ")));
        }
    }

    /// Выдать переменной имя JS (один раз).
    fn declare_variable(&mut self, id: VariableId) -> String {
        if let Some(name) = self.variable_names.get(&id) {
            return name.clone();
        }
        let entities = self.entities;
        let name = self.fresh_name(&entities.variable(id).name);
        self.variable_names.insert(id, name.clone());
        name
    }

    fn declare_function(&mut self, id: FunctionId) -> String {
        if let Some(name) = self.function_names.get(&id) {
            return name.clone();
        }
        let entities = self.entities;
        let name = self.fresh_name(&entities.function(id).name);
        self.function_names.insert(id, name.clone());
        name
    }

    /// Свободное имя JS для исходного имени.
    fn fresh_name(&mut self, source: &str) -> String {
        let base = js_name(source);
        if self.used_names.insert(base.clone()) {
            return base;
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{}_{}", base, suffix);
            if self.used_names.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }

    // Ссылка на сущность, чьё объявление выбросил оптимизатор, получает
    // исходное имя.
    fn variable(&self, id: VariableId) -> String {
        match self.variable_names.get(&id) {
            Some(name) => name.clone(),
            None => js_name(&self.entities.variable(id).name),
        }
    }

    fn function(&self, id: FunctionId) -> String {
        match self.function_names.get(&id) {
            Some(name) => name.clone(),
            None => js_name(&self.entities.function(id).name),
        }
    }
}

/// Объявления, которые живут в области `if`: прямо в ветках и во
/// вложенных `if`, но не в телах циклов и функций.
fn collect_branch_declarations(statement: &IfStatement, out: &mut Vec<VariableId>) {
    let branches = std::iter::once(&statement.consequent)
        .chain(statement.else_ifs.iter().map(|clause| &clause.body))
        .chain(statement.alternate.iter());
    for branch in branches {
        for inner in branch {
            match inner {
                Statement::VariableDeclaration { variable, .. } => out.push(*variable),
                Statement::If(nested) => collect_branch_declarations(nested, out),
                _ => {}
            }
        }
    }
}

/// Имя, безопасное для JS: зарезервированным словам добавляется `_`.
pub fn js_name(name: &str) -> String {
    if RESERVED_WORDS.contains(&name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Pow => "**",
        BinaryOp::Ne => "!==",
        other => other.symbol(),
    }
}

/// Сгенерировать строки JavaScript.
pub fn generate_lines(program: &Program) -> Vec<String> {
    JsBackend::new(&program.entities).compile(&program.statements)
}

/// Сгенерировать JavaScript одной строкой (строки через `\n`).
pub fn generate(program: &Program) -> String {
    generate_lines(program).join("\n")
}
