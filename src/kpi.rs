//! # KPI Evaluation
//! A small, closed expression language for user-authored goal formulas:
//! numeric literals, dotted metric paths, `+ - * /`, comparisons,
//! `&& ||`, unary minus, and parentheses. Hand-rolled tokenizer and
//! recursive-descent parser over a fixed grammar; anything outside it
//! is a parse error, never a general-purpose eval.
//!
//! Failures (syntax, unknown variable, type mismatch, non-finite
//! arithmetic) become a per-KPI `Error` outcome; they never abort the
//! other KPIs and are never coerced to 0 or false.

use serde::{Deserialize, Serialize};

use crate::delta::ArticleDelta;
use crate::model::Kpi;

// ---------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------

/// Aggregate metrics the expressions resolve against, summed over the
/// delta-adjusted article set. The note-side fields carry the period
/// delta sums; the X-side fields stay 0 because the measured X delta
/// is a merged confirmed-else-preliminary figure that cannot be
/// attributed to either source group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsScope {
    pub note_data: NoteScope,
    pub x_preliminary_data: XPreliminaryScope,
    pub x_confirmed_data: XConfirmedScope,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteScope {
    pub views: f64,
    pub likes: f64,
    pub comments: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct XPreliminaryScope {
    pub impressions: f64,
    pub likes: f64,
    pub replies: f64,
    pub retweets: f64,
    pub quotes: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct XConfirmedScope {
    pub impressions: f64,
    pub likes: f64,
    pub engagements: f64,
}

impl MetricsScope {
    /// Sum the period deltas of the current delta-adjusted set.
    pub fn from_deltas(rows: &[ArticleDelta]) -> Self {
        let mut scope = Self::default();
        for row in rows {
            scope.note_data.views += row.note_views_change as f64;
            scope.note_data.likes += row.note_likes_change as f64;
            scope.note_data.comments += row.note_comments_change as f64;
        }
        scope
    }

    /// Resolve a dotted metric path, e.g. `note_data.views`.
    fn lookup(&self, path: &str) -> Option<f64> {
        let (group, field) = path.split_once('.')?;
        match group {
            "note_data" => match field {
                "views" => Some(self.note_data.views),
                "likes" => Some(self.note_data.likes),
                "comments" => Some(self.note_data.comments),
                _ => None,
            },
            "x_preliminary_data" => match field {
                "impressions" => Some(self.x_preliminary_data.impressions),
                "likes" => Some(self.x_preliminary_data.likes),
                "replies" => Some(self.x_preliminary_data.replies),
                "retweets" => Some(self.x_preliminary_data.retweets),
                "quotes" => Some(self.x_preliminary_data.quotes),
                _ => None,
            },
            "x_confirmed_data" => match field {
                "impressions" => Some(self.x_confirmed_data.impressions),
                "likes" => Some(self.x_confirmed_data.likes),
                "engagements" => Some(self.x_confirmed_data.engagements),
                _ => None,
            },
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------

/// Tagged evaluation outcome, serialized for the presentation layer.
/// A boolean result is its own pass/fail check and is never compared
/// against the numeric target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KpiOutcome {
    Number { value: f64, achieved: bool },
    Bool { achieved: bool },
    Error { message: String },
}

/// One KPI with its evaluation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiEvaluation {
    pub id: String,
    pub kpi_name: String,
    pub expression: String,
    pub target_value: f64,
    pub outcome: KpiOutcome,
}

/// Evaluate every KPI independently against one scope. A failing KPI
/// yields its error outcome without disturbing the others.
pub fn evaluate_all(kpis: &[Kpi], scope: &MetricsScope) -> Vec<KpiEvaluation> {
    kpis.iter().map(|k| evaluate_kpi(k, scope)).collect()
}

/// Parse and evaluate one KPI expression, applying the achievement rule.
pub fn evaluate_kpi(kpi: &Kpi, scope: &MetricsScope) -> KpiEvaluation {
    let outcome = match evaluate_expression(&kpi.expression, scope) {
        Ok(Value::Number(value)) => KpiOutcome::Number {
            value,
            achieved: value >= kpi.target_value,
        },
        Ok(Value::Bool(achieved)) => KpiOutcome::Bool { achieved },
        Err(e) => KpiOutcome::Error { message: e.0 },
    };
    KpiEvaluation {
        id: kpi.id.clone(),
        kpi_name: kpi.kpi_name.clone(),
        expression: kpi.expression.clone(),
        target_value: kpi.target_value,
        outcome,
    }
}

/// Parse and evaluate an expression against a scope.
pub fn evaluate_expression(input: &str, scope: &MetricsScope) -> Result<Value, EvalError> {
    let tokens = tokenize(input)?;
    let expr = Parser::new(tokens).parse()?;
    expr.eval(scope)
}

/// A number or a boolean; the only value types the grammar produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
}

/// Evaluation failure with a human-readable message; surfaced to the
/// user as-is by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError(pub String);

impl EvalError {
    fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

// ---------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    /// Dotted identifier path, e.g. `note_data.views`.
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    Ne,
    AndAnd,
    OrOr,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut lit = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        lit.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n: f64 = lit
                    .parse()
                    .map_err(|_| EvalError::new(format!("invalid number literal '{lit}'")))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' || d == '.' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::EqEq);
                } else {
                    return Err(EvalError::new("single '=' is not an operator; use '=='"));
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ne);
                } else {
                    return Err(EvalError::new("unexpected '!'"));
                }
            }
            '&' => {
                chars.next();
                if chars.peek() == Some(&'&') {
                    chars.next();
                    tokens.push(Token::AndAnd);
                } else {
                    return Err(EvalError::new("unexpected '&'; use '&&'"));
                }
            }
            '|' => {
                chars.next();
                if chars.peek() == Some(&'|') {
                    chars.next();
                    tokens.push(Token::OrOr);
                } else {
                    return Err(EvalError::new("unexpected '|'; use '||'"));
                }
            }
            other => {
                return Err(EvalError::new(format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------
// Parser (recursive descent)
// ---------------------------------------------------------------------
// Grammar, loosest-binding first:
//   or      := and ( '||' and )*
//   and     := cmp ( '&&' cmp )*
//   cmp     := add ( ('<'|'>'|'<='|'>='|'=='|'!=') add )?
//   add     := mul ( ('+'|'-') mul )*
//   mul     := unary ( ('*'|'/') unary )*
//   unary   := '-' unary | primary
//   primary := number | ident | '(' or ')'

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Var(String),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(mut self) -> Result<Expr, EvalError> {
        if self.tokens.is_empty() {
            return Err(EvalError::new("empty expression"));
        }
        let expr = self.parse_or()?;
        match self.peek() {
            None => Ok(expr),
            Some(t) => Err(EvalError::new(format!("unexpected trailing token {t:?}"))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_cmp()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_cmp()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_cmp(&mut self) -> Result<Expr, EvalError> {
        let left = self.parse_add()?;
        let op = match self.peek() {
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Ge) => BinOp::Ge,
            Some(Token::EqEq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_add()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn parse_add(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_mul()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&Token::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Ident(path)) => Ok(Expr::Var(path)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                if self.eat(&Token::RParen) {
                    Ok(inner)
                } else {
                    Err(EvalError::new("missing closing parenthesis"))
                }
            }
            Some(t) => Err(EvalError::new(format!("unexpected token {t:?}"))),
            None => Err(EvalError::new("unexpected end of expression")),
        }
    }
}

// ---------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------

impl Expr {
    fn eval(&self, scope: &MetricsScope) -> Result<Value, EvalError> {
        match self {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Var(path) => scope
                .lookup(path)
                .map(Value::Number)
                .ok_or_else(|| EvalError::new(format!("unknown variable '{path}'"))),
            Expr::Neg(inner) => match inner.eval(scope)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                Value::Bool(_) => Err(EvalError::new("cannot negate a boolean")),
            },
            Expr::Binary(op, left, right) => {
                let l = left.eval(scope)?;
                let r = right.eval(scope)?;
                apply(*op, l, r)
            }
        }
    }
}

fn apply(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    use BinOp::*;
    match op {
        Add | Sub | Mul | Div => {
            let (a, b) = numeric_operands(op, l, r)?;
            let out = match op {
                Add => a + b,
                Sub => a - b,
                Mul => a * b,
                Div => a / b,
                _ => unreachable!(),
            };
            if out.is_finite() {
                Ok(Value::Number(out))
            } else {
                Err(EvalError::new("arithmetic produced a non-finite value"))
            }
        }
        Lt | Gt | Le | Ge => {
            let (a, b) = numeric_operands(op, l, r)?;
            let out = match op {
                Lt => a < b,
                Gt => a > b,
                Le => a <= b,
                Ge => a >= b,
                _ => unreachable!(),
            };
            Ok(Value::Bool(out))
        }
        Eq | Ne => {
            let eq = match (l, r) {
                (Value::Number(a), Value::Number(b)) => a == b,
                (Value::Bool(a), Value::Bool(b)) => a == b,
                _ => {
                    return Err(EvalError::new(
                        "cannot compare a number with a boolean",
                    ))
                }
            };
            Ok(Value::Bool(if op == Eq { eq } else { !eq }))
        }
        And | Or => {
            let (a, b) = match (l, r) {
                (Value::Bool(a), Value::Bool(b)) => (a, b),
                _ => {
                    return Err(EvalError::new(
                        "logical operators require boolean operands",
                    ))
                }
            };
            Ok(Value::Bool(if op == And { a && b } else { a || b }))
        }
    }
}

fn numeric_operands(op: BinOp, l: Value, r: Value) -> Result<(f64, f64), EvalError> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok((a, b)),
        _ => Err(EvalError::new(format!(
            "operator {op:?} requires numeric operands"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> MetricsScope {
        MetricsScope {
            note_data: NoteScope {
                views: 1200.0,
                likes: 60.0,
                comments: 8.0,
            },
            ..Default::default()
        }
    }

    fn eval(expr: &str) -> Result<Value, EvalError> {
        evaluate_expression(expr, &scope())
    }

    #[test]
    fn arithmetic_respects_precedence() {
        assert_eq!(eval("2 + 3 * 4"), Ok(Value::Number(14.0)));
        assert_eq!(eval("(2 + 3) * 4"), Ok(Value::Number(20.0)));
        assert_eq!(eval("-2 * 3"), Ok(Value::Number(-6.0)));
    }

    #[test]
    fn dotted_paths_resolve_against_the_scope() {
        assert_eq!(
            eval("note_data.likes / note_data.views * 100"),
            Ok(Value::Number(5.0))
        );
        assert_eq!(eval("x_confirmed_data.impressions"), Ok(Value::Number(0.0)));
    }

    #[test]
    fn comparisons_yield_booleans() {
        assert_eq!(eval("note_data.views >= 1000"), Ok(Value::Bool(true)));
        assert_eq!(eval("note_data.views < 1000"), Ok(Value::Bool(false)));
    }

    #[test]
    fn logical_operators_combine_comparisons() {
        assert_eq!(
            eval("note_data.views >= 1000 && note_data.likes >= 50"),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            eval("note_data.views >= 9999 || note_data.likes >= 50"),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn unknown_variable_is_an_error() {
        assert!(eval("note_data.bogus").is_err());
        assert!(eval("nonsense").is_err());
    }

    #[test]
    fn syntax_errors_are_errors_not_zero() {
        assert!(eval("1 +").is_err());
        assert!(eval("(1 + 2").is_err());
        assert!(eval("1 ** 2").is_err());
        assert!(eval("").is_err());
        assert!(eval("note_data.views = 5").is_err());
    }

    #[test]
    fn division_by_zero_is_a_soft_error() {
        assert!(eval("1 / 0").is_err());
        assert!(eval("x_confirmed_data.likes / x_confirmed_data.impressions").is_err());
    }

    #[test]
    fn type_mismatches_are_errors() {
        assert!(eval("(1 > 2) + 3").is_err());
        assert!(eval("1 && 2").is_err());
        assert!(eval("(1 > 2) == 3").is_err());
    }

    #[test]
    fn numeric_outcome_compares_against_target() {
        let kpi = Kpi {
            id: "k1".into(),
            kpi_name: "Views".into(),
            expression: "note_data.views".into(),
            target_value: 1000.0,
        };
        let out = evaluate_kpi(&kpi, &scope());
        assert_eq!(
            out.outcome,
            KpiOutcome::Number {
                value: 1200.0,
                achieved: true
            }
        );
    }

    #[test]
    fn boolean_outcome_ignores_the_target() {
        let kpi = Kpi {
            id: "k1".into(),
            kpi_name: "Gate".into(),
            expression: "note_data.views >= 1000".into(),
            // An absurd target that a numeric comparison would fail.
            target_value: 1_000_000.0,
        };
        let out = evaluate_kpi(&kpi, &scope());
        assert_eq!(out.outcome, KpiOutcome::Bool { achieved: true });
    }

    #[test]
    fn failing_kpi_does_not_disturb_the_others() {
        let kpis = vec![
            Kpi {
                id: "bad".into(),
                kpi_name: "Broken".into(),
                expression: "1 /".into(),
                target_value: 0.0,
            },
            Kpi {
                id: "good".into(),
                kpi_name: "Views".into(),
                expression: "note_data.views".into(),
                target_value: 0.0,
            },
        ];
        let results = evaluate_all(&kpis, &scope());
        assert!(matches!(results[0].outcome, KpiOutcome::Error { .. }));
        assert!(matches!(results[1].outcome, KpiOutcome::Number { .. }));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let first = eval("note_data.likes / note_data.views * 100");
        for _ in 0..3 {
            assert_eq!(eval("note_data.likes / note_data.views * 100"), first);
        }
        let broken_first = eval("1 / 0");
        assert_eq!(eval("1 / 0"), broken_first);
    }

    #[test]
    fn scope_from_deltas_sums_note_fields_only() {
        use crate::model::XLifetimeTotals;
        let mk = |views, likes, comments| ArticleDelta {
            id: "a".into(),
            title: "a".into(),
            url: String::new(),
            publication_date: None,
            classification_id: String::new(),
            secondary_classification_id: None,
            snapshots_in_period: Vec::new(),
            note_views_change: views,
            note_likes_change: likes,
            note_comments_change: comments,
            x_impressions_change: 500,
            x_likes_change: 50,
            x_lifetime: XLifetimeTotals::default(),
            is_top_performer: false,
        };
        let scope = MetricsScope::from_deltas(&[mk(100, 10, 1), mk(-20, 5, 0)]);
        assert_eq!(scope.note_data.views, 80.0);
        assert_eq!(scope.note_data.likes, 15.0);
        assert_eq!(scope.note_data.comments, 1.0);
        // The merged X deltas stay out of the scope.
        assert_eq!(scope.x_preliminary_data.impressions, 0.0);
        assert_eq!(scope.x_confirmed_data.impressions, 0.0);
    }
}
