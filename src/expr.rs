//! Embedded expression evaluation.
//!
//! A parsed TML document may contain array values with embedded
//! expressions, marked by a sentinel token (`_i`, `_ii`, `_fi`, `_ti`)
//! followed by a parenthesized token run:
//!
//! ```text
//! result = _i ( abs ( -123 ) )
//! ```
//!
//! The interpreter walks the tree, extracts each marked token slice, parses
//! it with a Pratt parser working on [`Value`] tokens and replaces the
//! whole sentinel span with the evaluated result. The sentinel chooses the
//! result coercion: `_i` takes the value as-is, `_ii` coerces like `int()`,
//! `_fi` widens numbers to float, `_ti` renders the serialized text.
//!
//! The expression language is deliberately small: the four arithmetic
//! operators, grouping, calls and a fixed set of built-in functions
//! (`abs`, `bool`, `int`; `float` and `str` are reserved and report that
//! they are not implemented).
//!
//! ## Usage
//!
//! ```rust
//! use tml_cfg::expr::interpret_and_replace;
//! use tml_cfg::parse_str;
//!
//! let mut root = parse_str("t.tml", "result = _i ( abs ( -123 ) )\n").unwrap();
//! interpret_and_replace(&mut root, false, true, true).unwrap();
//! assert_eq!(root.object_get_int("result"), Some(123));
//! ```

use crate::{writer, EmitOptions, Error, Result, Value, ValueKind};

/// Sentinel tokens that open an embedded expression.
const SENTINELS: [&str; 4] = ["_i", "_ii", "_fi", "_ti"];

/// Binding powers, ascending. Bigger numbers bind tighter. Assignment,
/// exponent and postfix have no registered operators yet but fix the
/// ladder.
#[allow(dead_code)]
mod precedence {
    pub const ASSIGNMENT: u8 = 1;
    pub const CONDITIONAL: u8 = 2;
    pub const SUM: u8 = 3;
    pub const PRODUCT: u8 = 4;
    pub const EXPONENT: u8 = 5;
    pub const PREFIX: u8 = 6;
    pub const POSTFIX: u8 = 7;
    pub const CALL: u8 = 8;
}

/// Kind of one expression token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    Comma,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Question,
    Colon,
    Value,
    End,
}

impl TokenKind {
    fn from_punctuator(ch: char) -> Option<TokenKind> {
        match ch {
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            ',' => Some(TokenKind::Comma),
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Asterisk),
            '/' => Some(TokenKind::Slash),
            '?' => Some(TokenKind::Question),
            ':' => Some(TokenKind::Colon),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Asterisk => "*",
            TokenKind::Slash => "/",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Value => "value",
            TokenKind::End => "end of expression",
        }
    }
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    value: Value,
}

/// Tokenizes a range of an array's elements.
///
/// One-character unquoted texts matching a punctuator become operator
/// tokens; comments and empty records are skipped; everything else is a
/// value token.
struct Lexer<'a> {
    values: &'a [Value],
    index: usize,
    end: usize,
    allow_quotes: bool,
}

impl<'a> Lexer<'a> {
    fn new(values: &'a [Value], begin: usize, end: usize, allow_quotes: bool) -> Self {
        Lexer {
            values,
            index: begin,
            end: end.min(values.len()),
            allow_quotes,
        }
    }

    fn next(&mut self) -> Token {
        while self.index < self.end {
            let value = &self.values[self.index];
            self.index += 1;
            if let ValueKind::Text { text, quoted } = &value.kind {
                if (self.allow_quotes || !quoted) && text.chars().count() == 1 {
                    if let Some(kind) = text.chars().next().and_then(TokenKind::from_punctuator) {
                        return Token {
                            kind,
                            value: value.clone(),
                        };
                    }
                }
            }
            if !value.is_empty() && !value.is_comment() {
                return Token {
                    kind: TokenKind::Value,
                    value: value.clone(),
                };
            }
        }
        Token {
            kind: TokenKind::End,
            value: Value::none(),
        }
    }
}

/// An expression AST node.
#[derive(Clone, Debug)]
pub enum Expr {
    Empty,
    ParseError(String),
    Call {
        function: Box<Expr>,
        args: Vec<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_arm: Box<Expr>,
        else_arm: Box<Expr>,
    },
    Literal(Value),
    Binary {
        left: Box<Expr>,
        op: TokenKind,
        right: Box<Expr>,
    },
    Postfix {
        left: Box<Expr>,
        op: TokenKind,
    },
    Prefix {
        op: TokenKind,
        right: Box<Expr>,
    },
}

/// Pratt parser over the token stream.
struct Parser<'a> {
    lexer: Lexer<'a>,
    read: Vec<Token>,
    errors: u32,
}

impl<'a> Parser<'a> {
    fn new(lexer: Lexer<'a>) -> Self {
        Parser {
            lexer,
            read: Vec::new(),
            errors: 0,
        }
    }

    fn look_ahead(&mut self, distance: usize) -> &Token {
        while self.read.len() <= distance {
            let token = self.lexer.next();
            self.read.push(token);
        }
        &self.read[distance]
    }

    fn consume(&mut self) -> Token {
        self.look_ahead(0);
        self.read.remove(0)
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.look_ahead(0).kind != kind {
            return false;
        }
        self.consume();
        true
    }

    fn expect(&mut self, kind: TokenKind) -> Option<Expr> {
        let found = self.look_ahead(0).kind;
        if found != kind {
            self.errors += 1;
            return Some(Expr::ParseError(format!(
                "expected token {} and found {}",
                kind.symbol(),
                found.symbol()
            )));
        }
        self.consume();
        None
    }

    /// Binding power of the upcoming infix token, 0 when there is none.
    fn infix_binding_power(&mut self) -> u8 {
        match self.look_ahead(0).kind {
            TokenKind::Plus | TokenKind::Minus => precedence::SUM,
            TokenKind::Asterisk | TokenKind::Slash => precedence::PRODUCT,
            TokenKind::Question => precedence::CONDITIONAL,
            TokenKind::LeftParen => precedence::CALL,
            _ => 0,
        }
    }

    /// Parses every expression whose binding power exceeds `min_bp`.
    ///
    /// Right-associative operators recurse with their power minus one.
    fn parse_expression(&mut self, min_bp: u8, allow_end: bool) -> Expr {
        let token = self.consume();
        if token.kind == TokenKind::End {
            if allow_end {
                return Expr::Empty;
            }
            self.errors += 1;
            return Expr::ParseError("could not parse, unexpected end of expression".to_string());
        }

        let mut left = match token.kind {
            TokenKind::Value => Expr::Literal(token.value),
            TokenKind::LeftParen => {
                let grouped = self.parse_expression(0, false);
                match self.expect(TokenKind::RightParen) {
                    Some(error) => error,
                    None => grouped,
                }
            }
            TokenKind::Plus | TokenKind::Minus => Expr::Prefix {
                op: token.kind,
                right: Box::new(self.parse_expression(precedence::PREFIX, false)),
            },
            other => {
                self.errors += 1;
                Expr::ParseError(format!("could not parse \"{}\"", other.symbol()))
            }
        };

        while min_bp < self.infix_binding_power() {
            let token = self.consume();
            left = match token.kind {
                TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Asterisk
                | TokenKind::Slash => {
                    let bp = if matches!(token.kind, TokenKind::Plus | TokenKind::Minus) {
                        precedence::SUM
                    } else {
                        precedence::PRODUCT
                    };
                    Expr::Binary {
                        left: Box::new(left),
                        op: token.kind,
                        right: Box::new(self.parse_expression(bp, false)),
                    }
                }
                TokenKind::Question => {
                    let then_arm = self.parse_expression(0, false);
                    if let Some(error) = self.expect(TokenKind::Colon) {
                        error
                    } else {
                        let else_arm = self.parse_expression(precedence::CONDITIONAL - 1, false);
                        Expr::Conditional {
                            condition: Box::new(left),
                            then_arm: Box::new(then_arm),
                            else_arm: Box::new(else_arm),
                        }
                    }
                }
                TokenKind::LeftParen => {
                    let mut args = Vec::new();
                    if !self.match_kind(TokenKind::RightParen) {
                        loop {
                            args.push(self.parse_expression(0, false));
                            if !self.match_kind(TokenKind::Comma) {
                                break;
                            }
                        }
                        if let Some(error) = self.expect(TokenKind::RightParen) {
                            error
                        } else {
                            Expr::Call {
                                function: Box::new(left),
                                args,
                            }
                        }
                    } else {
                        Expr::Call {
                            function: Box::new(left),
                            args,
                        }
                    }
                }
                other => {
                    self.errors += 1;
                    Expr::ParseError(format!("{} is not an infix operator", other.symbol()))
                }
            };
        }
        left
    }
}

/// Parses a slice of array elements as one expression.
///
/// # Errors
///
/// Returns an evaluation error when the tokens do not form a single valid
/// expression.
pub fn parse_values(values: &[Value], allow_quotes: bool) -> Result<Expr> {
    let end = values.len();
    let mut parser = Parser::new(Lexer::new(values, 0, end, allow_quotes));
    let expr = parser.parse_expression(0, false);
    if parser.errors > 0 {
        return Err(Error::eval(format!(
            "expression parse failed ({} error(s))",
            parser.errors
        )));
    }
    if parser.look_ahead(0).kind != TokenKind::End {
        return Err(Error::eval("unexpected tokens after the expression"));
    }
    Ok(expr)
}

/// Evaluation settings.
#[derive(Clone, Copy, Debug, Default)]
pub struct Context {
    pub allow_quotes: bool,
}

fn type_name(value: &Value) -> &'static str {
    match value.kind {
        ValueKind::None => "none",
        ValueKind::Null => "null",
        ValueKind::Bool(_) => "bool",
        ValueKind::Float(_) => "float",
        ValueKind::Int { .. } => "int",
        ValueKind::Text { .. } => "text",
        ValueKind::Comment(_) => "comment",
        ValueKind::Array(_) => "array",
        ValueKind::Object(_) => "object",
    }
}

fn value_as_string(value: &Value) -> String {
    let mut text =
        writer::value_to_string(0, value, &EmitOptions::new()).unwrap_or_default();
    if text.ends_with('\n') {
        text.pop();
    }
    text
}

fn convert_to_text(value: &Value) -> String {
    match value.as_str() {
        Some(text) => text.to_string(),
        None => value_as_string(value),
    }
}

fn check_arity(name: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(Error::eval(format!(
            "{}() can't be called with {} argument(s), exactly {} expected",
            name,
            args.len(),
            expected
        )));
    }
    Ok(())
}

fn check_numbers(name: &str, args: &[Value]) -> Result<()> {
    for (i, arg) in args.iter().enumerate() {
        if !arg.is_number() {
            return Err(Error::eval(format!(
                "{}(): argument {} must be a number",
                name,
                i + 1
            )));
        }
    }
    Ok(())
}

fn builtin_abs(name: &str, args: &[Value]) -> Result<Value> {
    check_arity(name, args, 1)?;
    check_numbers(name, args)?;
    match args[0].kind {
        ValueKind::Int { value, base } => Ok(Value::int_with_base(value.wrapping_abs(), base)),
        ValueKind::Float(f) => Ok(Value::float(f.abs())),
        _ => Err(Error::eval(format!("{}(): argument must be a number", name))),
    }
}

fn builtin_bool(name: &str, args: &[Value]) -> Result<Value> {
    check_arity(name, args, 1)?;
    let result = match &args[0].kind {
        ValueKind::Bool(b) => *b,
        ValueKind::Int { value, .. } => *value != 0,
        ValueKind::Float(f) => f.classify() != std::num::FpCategory::Zero,
        ValueKind::Text { text, .. } => text == "true",
        _ => false,
    };
    Ok(Value::bool(result))
}

fn builtin_int(name: &str, args: &[Value]) -> Result<Value> {
    check_arity(name, args, 1)?;
    match &args[0].kind {
        ValueKind::Bool(b) => Ok(Value::int_with_base(i32::from(*b), 2)),
        ValueKind::Int { .. } => Ok(args[0].clone()),
        ValueKind::Float(f) => Ok(Value::int(*f as i32)),
        ValueKind::Text { .. } => Err(Error::eval("text to int is not implemented for int()")),
        _ => Ok(Value::int(0)),
    }
}

/// Applies a sentinel's result coercion.
fn apply_sentinel(name: &str, args: &[Value]) -> Result<Value> {
    check_arity(name, args, 1)?;
    let value = &args[0];
    match name {
        "_i" => Ok(value.clone()),
        "_ii" => builtin_int(name, args),
        "_fi" => match value.as_f32_lossy() {
            Some(f) => Ok(Value::float(f)),
            None => Err(Error::eval(format!(
                "{}(): argument must be a number",
                name
            ))),
        },
        "_ti" => Ok(Value::text(convert_to_text(value))),
        _ => Err(Error::eval(format!("can't find function '{}'", name))),
    }
}

fn eval_call(function: &Expr, args: &[Expr], context: &Context) -> Result<Value> {
    let function_value = eval(function, context)?;
    let ValueKind::Text { text, quoted } = &function_value.kind else {
        return Err(Error::eval("the result for a function name must be a text"));
    };
    if *quoted {
        return Err(Error::eval("a function name must be without quotes"));
    }
    let name = text.as_str();

    let mut arg_values = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        let value = eval(arg, context).map_err(|e| {
            Error::eval(format!(
                "can't evaluate argument {} for the call of '{}': {}",
                i + 1,
                name,
                e
            ))
        })?;
        arg_values.push(value);
    }

    match name {
        "abs" => builtin_abs(name, &arg_values),
        "bool" => builtin_bool(name, &arg_values),
        "int" => builtin_int(name, &arg_values),
        "float" => Err(Error::eval("float() is not implemented")),
        "str" => Err(Error::eval("str() is not implemented")),
        _ if SENTINELS.contains(&name) => apply_sentinel(name, &arg_values),
        _ => Err(Error::eval(format!("can't find function '{}'", name))),
    }
}

fn eval_binary(left: &Value, op: TokenKind, right: &Value) -> Result<Value> {
    if op == TokenKind::Plus && (left.is_text() || right.is_text()) {
        return Ok(Value::text(format!(
            "{}{}",
            convert_to_text(left),
            convert_to_text(right)
        )));
    }
    if left.is_number() && right.is_number() {
        if let (
            ValueKind::Int {
                value: l, base: lb, ..
            },
            ValueKind::Int {
                value: r, base: rb, ..
            },
        ) = (&left.kind, &right.kind)
        {
            let base = if lb == rb { *lb } else { 10 };
            let result = match op {
                TokenKind::Plus => l.wrapping_add(*r),
                TokenKind::Minus => l.wrapping_sub(*r),
                TokenKind::Asterisk => l.wrapping_mul(*r),
                TokenKind::Slash => l
                    .checked_div(*r)
                    .ok_or_else(|| Error::eval("integer division by zero"))?,
                other => {
                    return Err(Error::eval(format!(
                        "{} is not supported as a binary arithmetic operator",
                        other.symbol()
                    )));
                }
            };
            return Ok(Value::int_with_base(result, base));
        }
        let l = left.as_f32_lossy().unwrap_or_default();
        let r = right.as_f32_lossy().unwrap_or_default();
        let result = match op {
            TokenKind::Plus => l + r,
            TokenKind::Minus => l - r,
            TokenKind::Asterisk => l * r,
            TokenKind::Slash => l / r,
            other => {
                return Err(Error::eval(format!(
                    "{} is not supported as a binary arithmetic operator",
                    other.symbol()
                )));
            }
        };
        return Ok(Value::float(result));
    }
    Err(Error::eval(format!(
        "{} {} {} is not supported for these types as a binary arithmetic expression",
        type_name(left),
        op.symbol(),
        type_name(right)
    )))
}

/// Evaluates an expression.
///
/// # Errors
///
/// Returns evaluation errors: unsupported operand types, unknown
/// functions, wrong argument counts and the reserved not-implemented
/// constructs (conditional, postfix, `float()`, `str()`).
pub fn eval(expr: &Expr, context: &Context) -> Result<Value> {
    match expr {
        Expr::Empty => Err(Error::eval("an empty expression can't be evaluated")),
        Expr::ParseError(msg) => Err(Error::eval(msg.clone())),
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Call { function, args } => eval_call(function, args, context),
        Expr::Conditional { .. } => {
            Err(Error::eval("the conditional expression is not implemented"))
        }
        Expr::Postfix { .. } => Err(Error::eval("postfix expressions are not implemented")),
        Expr::Prefix { op, right } => {
            let right = eval(right, context)?;
            match op {
                TokenKind::Plus if right.is_number() => Ok(right),
                TokenKind::Minus => match right.kind {
                    ValueKind::Int { value, base } => {
                        Ok(Value::int_with_base(value.wrapping_neg(), base))
                    }
                    ValueKind::Float(f) => Ok(Value::float(-f)),
                    _ => Err(Error::eval(format!(
                        "- {} is not supported for this type as a prefix expression",
                        type_name(&right)
                    ))),
                },
                other => Err(Error::eval(format!(
                    "{} {} is not supported for this type as a prefix expression",
                    other.symbol(),
                    type_name(&right)
                ))),
            }
        }
        Expr::Binary { left, op, right } => {
            let left = eval(left, context)?;
            let right = eval(right, context)?;
            eval_binary(&left, *op, &right)
        }
    }
}

fn is_unquoted_one_char(value: &Value, ch: char, allow_quotes: bool) -> bool {
    match &value.kind {
        ValueKind::Text { text, quoted } => {
            (allow_quotes || !quoted) && text.len() == ch.len_utf8() && text.starts_with(ch)
        }
        _ => false,
    }
}

fn sentinel_of(value: &Value, allow_quotes: bool) -> Option<&'static str> {
    let ValueKind::Text { text, quoted } = &value.kind else {
        return None;
    };
    if *quoted && !allow_quotes {
        return None;
    }
    SENTINELS.iter().find(|s| *s == text).copied()
}

/// Evaluates every sentinel expression inside one array value.
///
/// Returns the number of evaluated expressions; the array is only replaced
/// when at least one expression was found.
///
/// # Errors
///
/// Returns parse and evaluation errors; the array is unchanged on error.
pub fn interpret_expr_array(value: &mut Value, allow_quotes: bool) -> Result<u32> {
    let Some(elements) = value.as_array() else {
        return Ok(0);
    };
    let count = elements.len();
    let mut rewritten: Vec<Value> = Vec::new();
    let mut expression_count = 0u32;
    let mut next_start = 0usize;
    let mut i = 1usize;
    while i < count {
        if !is_unquoted_one_char(&elements[i], '(', allow_quotes) {
            i += 1;
            continue;
        }
        let Some(sentinel) = sentinel_of(&elements[i - 1], allow_quotes) else {
            i += 1;
            continue;
        };

        expression_count += 1;
        let start = i - 1;
        let open = i;
        for element in &elements[next_start..start] {
            rewritten.push(element.clone());
        }

        // find the matching ) with parenthesis balancing
        let mut balance = 1i32;
        let mut j = open + 1;
        while j < count && balance > 0 {
            if is_unquoted_one_char(&elements[j], '(', false) {
                balance += 1;
            } else if is_unquoted_one_char(&elements[j], ')', false) {
                balance -= 1;
            }
            j += 1;
        }
        if balance > 0 {
            return Err(Error::eval("can't find the closing parenthesis"));
        }

        // parse the group starting at the ( and coerce via the sentinel
        let expr = parse_values(&elements[open..j], allow_quotes)?;
        let context = Context { allow_quotes };
        let result = eval(&expr, &context)?;
        let result = apply_sentinel(sentinel, &[result])?;
        rewritten.push(result);

        next_start = j;
        i = j;
    }

    if expression_count > 0 {
        for element in &elements[next_start..count] {
            rewritten.push(element.clone());
        }
        if rewritten.len() == 1 {
            // a single remaining token is a scalar, matching what the
            // parser produces for a one-token side
            *value = rewritten.pop().unwrap_or_default();
        } else {
            value.kind = ValueKind::Array(rewritten);
        }
    }
    Ok(expression_count)
}

/// Walks a tree and evaluates all embedded expressions.
///
/// `allow_names`/`allow_values` choose which pair sides are examined.
/// Returns the total number of evaluated expressions. One invocation makes
/// one pass; results are not scanned for new sentinels.
///
/// # Errors
///
/// Returns parse and evaluation errors.
pub fn interpret_and_replace(
    value: &mut Value,
    allow_quotes: bool,
    allow_names: bool,
    allow_values: bool,
) -> Result<u32> {
    if value.is_array() {
        return interpret_expr_array(value, allow_quotes);
    }
    let ValueKind::Object(pairs) = &mut value.kind else {
        return Ok(0);
    };
    if !allow_names && !allow_values {
        return Ok(0);
    }
    let mut sum = 0u32;
    for pair in pairs {
        if allow_names && pair.name.is_array() {
            sum += interpret_expr_array(&mut pair.name, allow_quotes)?;
        }
        if allow_values && pair.value.is_array() {
            sum += interpret_expr_array(&mut pair.value, allow_quotes)?;
        }
        if pair.value.is_object() {
            sum += interpret_and_replace(&mut pair.value, allow_quotes, allow_names, allow_values)?;
        }
    }
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;

    fn interpret(source: &str) -> Value {
        let mut root = parse_str("t.tml", source).unwrap();
        interpret_and_replace(&mut root, false, true, true).unwrap();
        root
    }

    fn interpret_err(source: &str) -> Error {
        let mut root = parse_str("t.tml", source).unwrap();
        interpret_and_replace(&mut root, false, true, true).unwrap_err()
    }

    #[test]
    fn test_abs_call() {
        let root = interpret("result = _i ( abs ( -123 ) )\n");
        assert_eq!(root.object_get_int("result"), Some(123));
        assert_eq!(
            root.object_get_value("result").unwrap().parse_base(),
            Some(10)
        );
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        let root = interpret("r = _i ( 1 + 2 * 3 )\n");
        assert_eq!(root.object_get_int("r"), Some(7));

        let root = interpret("r = _i ( ( 1 + 2 ) * 3 )\n");
        assert_eq!(root.object_get_int("r"), Some(9));

        let root = interpret("r = _i ( 10 - 2 - 3 )\n");
        assert_eq!(root.object_get_int("r"), Some(5));

        let root = interpret("r = _i ( 7 / 2 )\n");
        assert_eq!(root.object_get_int("r"), Some(3));
    }

    #[test]
    fn test_widening_to_float() {
        let root = interpret("r = _i ( 1 + 0.5 )\n");
        assert_eq!(root.object_get_value("r").unwrap().as_f32(), Some(1.5));

        let root = interpret("r = _i ( 7.0 / 2 )\n");
        assert_eq!(root.object_get_value("r").unwrap().as_f32(), Some(3.5));
    }

    #[test]
    fn test_text_concatenation() {
        let root = interpret("r = _i ( ab + 1 )\n");
        assert_eq!(root.object_get_text("r"), Some("ab1"));
    }

    #[test]
    fn test_prefix_signs() {
        let root = interpret("r = _i ( - ( 1 + 2 ) )\n");
        assert_eq!(root.object_get_int("r"), Some(-3));

        let root = interpret("r = _i ( + 5 )\n");
        assert_eq!(root.object_get_int("r"), Some(5));
    }

    #[test]
    fn test_surrounding_tokens_survive() {
        let root = interpret("r = a1 _i ( 1 + 2 ) zz\n");
        let arr = root.object_get_value("r").unwrap().as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr[0].as_str(), Some("a1"));
        assert_eq!(arr[1].as_i32(), Some(3));
        assert_eq!(arr[2].as_str(), Some("zz"));
    }

    #[test]
    fn test_two_expressions_in_one_array() {
        let root = interpret("r = _i ( 1 + 1 ) mid _i ( 2 * 2 )\n");
        let arr = root.object_get_value("r").unwrap().as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr[0].as_i32(), Some(2));
        assert_eq!(arr[1].as_str(), Some("mid"));
        assert_eq!(arr[2].as_i32(), Some(4));
    }

    #[test]
    fn test_quoted_sentinel_is_ignored() {
        let root = interpret("r = \"_i\" ( 1 + 2 )\n");
        let arr = root.object_get_value("r").unwrap().as_array().unwrap();
        // nothing evaluated, all six tokens still there
        assert_eq!(arr.len(), 6);
    }

    #[test]
    fn test_sentinel_coercions() {
        let root = interpret("r = _ii ( 3.7 )\n");
        assert_eq!(root.object_get_int("r"), Some(3));

        let root = interpret("r = _fi ( 3 )\n");
        assert_eq!(root.object_get_value("r").unwrap().as_f32(), Some(3.0));

        let root = interpret("r = _ti ( 1 + 2 )\n");
        assert_eq!(root.object_get_text("r"), Some("3"));
    }

    #[test]
    fn test_builtin_bool_and_int() {
        let root = interpret("r = _i ( bool ( 0.25 ) )\n");
        assert_eq!(root.object_get_bool("r"), Some(true));

        let root = interpret("r = _i ( bool ( 0.0 ) )\n");
        assert_eq!(root.object_get_bool("r"), Some(false));

        let root = interpret("r = _i ( bool ( true ) )\n");
        assert_eq!(root.object_get_bool("r"), Some(true));

        let root = interpret("r = _i ( int ( true ) )\n");
        let v = root.object_get_value("r").unwrap();
        assert_eq!(v.as_i32(), Some(1));
        assert_eq!(v.parse_base(), Some(2));
    }

    #[test]
    fn test_reserved_functions_report_unimplemented() {
        assert!(interpret_err("r = _i ( float ( 1 ) )\n")
            .to_string()
            .contains("not implemented"));
        assert!(interpret_err("r = _i ( str ( 1 ) )\n")
            .to_string()
            .contains("not implemented"));
    }

    #[test]
    fn test_unknown_function_and_bad_types() {
        assert!(interpret_err("r = _i ( nosuch ( 1 ) )\n")
            .to_string()
            .contains("can't find function"));
        assert!(interpret_err("r = _i ( null + null )\n")
            .to_string()
            .contains("not supported"));
        assert!(interpret_err("r = _i ( abs ( 1 , 2 ) )\n")
            .to_string()
            .contains("exactly 1"));
    }

    #[test]
    fn test_unbalanced_parens() {
        assert!(interpret_err("r = _i ( 1 + 2\n")
            .to_string()
            .contains("closing parenthesis"));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(interpret_err("r = _i ( 1 / 0 )\n")
            .to_string()
            .contains("division by zero"));
    }

    #[test]
    fn test_expressions_in_nested_objects_and_names() {
        let root = interpret("obj\n\tr = _i ( 2 + 3 )\n");
        let obj = root.object_get_value("obj").unwrap();
        assert_eq!(obj.object_get_int("r"), Some(5));

        let root = interpret("_i ( 1 + 1 ) three = x\n");
        let pairs = root.as_object().unwrap();
        let name = pairs[0].name.as_array().unwrap();
        assert_eq!(name[0].as_i32(), Some(2));
        assert_eq!(name[1].as_str(), Some("three"));
    }

    #[test]
    fn test_purity() {
        // the same constant expression yields the same value anywhere
        let a = interpret("r = _i ( 2 * 21 )\n");
        let b = interpret("outer\n\tinner\n\t\tr = _i ( 2 * 21 )\n");
        let va = a.object_get_value("r").unwrap();
        let vb = b
            .object_get_value("outer")
            .unwrap()
            .object_get_value("inner")
            .unwrap()
            .object_get_value("r")
            .unwrap();
        assert!(va.content_eq(vb));
    }
}
