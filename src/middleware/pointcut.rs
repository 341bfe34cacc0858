//! Pointcut expressions compiled to predicates.
//!
//! The accepted language is a small AspectJ subset:
//!
//! ```text
//! execution(public * app.controller.SendController.send*(..))
//! within(app..*) && !execution(* *.health(..))
//! sendMethods() || execution(* app.Worker.name())
//! ```
//!
//! | Piece | Meaning |
//! |---|---|
//! | `*` alone | any type, any name |
//! | `*` in a pattern | any run of characters except `.` |
//! | `..` in a type | any number of package segments |
//! | `..` in a parameter list | any number of parameters |
//! | `name()` | a named pointcut, inlined at compile time |
//!
//! The return type position is accepted and ignored: call-site descriptors do
//! not carry return types.
//!
//! Every type and name pattern is compiled to a [`Regex`] once, when the rule
//! is built. Matching a call site never parses or allocates.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::ConfigurationError;
use crate::middleware::signature::{MethodSignature, Visibility};

/// A compiled predicate over call-site descriptors. Cheap to clone.
#[derive(Clone, Debug)]
pub struct PointcutRule {
    expression: Arc<str>,
    node: Arc<Node>,
}

impl PointcutRule {
    /// Compiles a standalone expression. Named references are rejected; use
    /// [`InterceptorRegistry::define_pointcut`](crate::middleware::InterceptorRegistry::define_pointcut)
    /// to make names available.
    pub fn parse(expression: &str) -> Result<Self, ConfigurationError> {
        Self::compile(expression, &HashMap::new())
    }

    pub(crate) fn compile(
        expression: &str,
        named: &HashMap<String, PointcutRule>,
    ) -> Result<Self, ConfigurationError> {
        let mut parser = Parser { src: expression, pos: 0, named };
        let node = parser.or()?;
        parser.skip_ws();
        if parser.pos != expression.len() {
            return Err(parser.invalid(format!("unexpected `{}`", parser.rest())));
        }
        Ok(Self { expression: expression.into(), node: Arc::new(node) })
    }

    pub fn matches(&self, signature: &MethodSignature) -> bool {
        self.node.matches(signature)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl fmt::Display for PointcutRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

// ── Compiled form ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Node {
    Execution {
        visibility: Option<Visibility>,
        declaring: Option<Regex>,
        name: Regex,
        params: Vec<ParamPattern>,
    },
    Within(Regex),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
}

#[derive(Clone, Debug)]
enum ParamPattern {
    /// `..`
    Rest,
    /// `*`
    One,
    Type(Regex),
}

impl Node {
    fn matches(&self, sig: &MethodSignature) -> bool {
        match self {
            Self::Execution { visibility, declaring, name, params } => {
                visibility.is_none_or(|v| v == sig.modifiers())
                    && declaring.as_ref().is_none_or(|re| re.is_match(sig.declaring_type()))
                    && name.is_match(sig.name())
                    && params_match(params, sig.params())
            }
            Self::Within(declaring) => declaring.is_match(sig.declaring_type()),
            Self::And(a, b) => a.matches(sig) && b.matches(sig),
            Self::Or(a, b) => a.matches(sig) || b.matches(sig),
            Self::Not(inner) => !inner.matches(sig),
        }
    }
}

fn params_match(patterns: &[ParamPattern], params: &[String]) -> bool {
    match patterns.split_first() {
        None => params.is_empty(),
        Some((ParamPattern::Rest, tail)) => {
            (0..=params.len()).any(|skip| params_match(tail, &params[skip..]))
        }
        Some((ParamPattern::One, tail)) => !params.is_empty() && params_match(tail, &params[1..]),
        Some((ParamPattern::Type(re), tail)) => {
            params.first().is_some_and(|p| re.is_match(p)) && params_match(tail, &params[1..])
        }
    }
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    named: &'a HashMap<String, PointcutRule>,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigurationError {
        ConfigurationError::InvalidPointcut {
            expression: self.src.to_owned(),
            reason: reason.into(),
        }
    }

    fn or(&mut self) -> Result<Node, ConfigurationError> {
        let mut node = self.and()?;
        while self.eat("||") {
            node = Node::Or(Box::new(node), Box::new(self.and()?));
        }
        Ok(node)
    }

    fn and(&mut self) -> Result<Node, ConfigurationError> {
        let mut node = self.unary()?;
        while self.eat("&&") {
            node = Node::And(Box::new(node), Box::new(self.unary()?));
        }
        Ok(node)
    }

    fn unary(&mut self) -> Result<Node, ConfigurationError> {
        if self.eat("!") {
            return Ok(Node::Not(Box::new(self.unary()?)));
        }
        if self.eat("(") {
            let node = self.or()?;
            if !self.eat(")") {
                return Err(self.invalid("unclosed `(`"));
            }
            return Ok(node);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Node, ConfigurationError> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.invalid(if rest.is_empty() {
                "expression ends early".to_owned()
            } else {
                format!("unexpected `{rest}`")
            }));
        }
        let ident = &rest[..len];
        self.pos += len;
        if !self.eat("(") {
            return Err(self.invalid(format!("expected `(` after `{ident}`")));
        }
        let inner = self.balanced()?;

        match ident {
            "execution" => self.execution(inner.trim()),
            "within" => Ok(Node::Within(self.type_pattern(inner.trim())?)),
            name if inner.trim().is_empty() => self
                .named
                .get(name)
                .map(|rule| (*rule.node).clone())
                .ok_or_else(|| ConfigurationError::UnknownPointcut(name.to_owned())),
            name => Err(self.invalid(format!("`{name}()` takes no arguments"))),
        }
    }

    /// Consumes up to the `)` matching an already-consumed `(` and returns
    /// the text between them.
    fn balanced(&mut self) -> Result<&'a str, ConfigurationError> {
        let start = self.pos;
        let mut depth = 1usize;
        for (offset, c) in self.rest().char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos = start + offset + 1;
                        return Ok(&self.src[start..start + offset]);
                    }
                }
                _ => {}
            }
        }
        Err(self.invalid("unclosed `(`"))
    }

    fn execution(&self, body: &str) -> Result<Node, ConfigurationError> {
        let Some(open) = body.find('(') else {
            return Err(self.invalid("execution() needs a parameter list"));
        };
        let Some(params) = body[open + 1..].strip_suffix(')') else {
            return Err(self.invalid("execution() parameter list is not closed"));
        };
        let head: Vec<&str> = body[..open].split_whitespace().collect();

        let (visibility, qualified) = match head.as_slice() {
            [_ret, qualified] => (None, *qualified),
            [modifier, _ret, qualified] => match Visibility::from_keyword(modifier) {
                Some(v) => (Some(v), *qualified),
                None => return Err(self.invalid(format!("unknown modifier `{modifier}`"))),
            },
            _ => return Err(self.invalid("expected `[modifier] return-type name(params)`")),
        };

        let (declaring, name) = match qualified.rsplit_once('.') {
            // `app..send` names a method on any type below `app`
            Some((declaring, name)) if declaring.ends_with('.') => {
                (Some(self.type_pattern(&format!("{declaring}.*"))?), name)
            }
            Some((declaring, name)) => (Some(self.type_pattern(declaring)?), name),
            None => (None, qualified),
        };
        if name.contains('.') || name.is_empty() {
            return Err(self.invalid(format!("bad method name pattern `{name}`")));
        }

        Ok(Node::Execution {
            visibility,
            declaring,
            name: self.type_pattern(name)?,
            params: self.param_patterns(params)?,
        })
    }

    fn param_patterns(&self, list: &str) -> Result<Vec<ParamPattern>, ConfigurationError> {
        if list.trim().is_empty() {
            return Ok(Vec::new());
        }
        list.split(',')
            .map(|p| match p.trim() {
                ".." => Ok(ParamPattern::Rest),
                "*" => Ok(ParamPattern::One),
                other => self.type_pattern(other).map(ParamPattern::Type),
            })
            .collect()
    }

    fn type_pattern(&self, pattern: &str) -> Result<Regex, ConfigurationError> {
        if pattern.is_empty() {
            return Err(self.invalid("empty type pattern"));
        }
        if pattern == "*" {
            return Regex::new("^.*$").map_err(|e| self.invalid(e.to_string()));
        }
        if let Some(bad) = pattern
            .chars()
            .find(|c| !(c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '*')))
        {
            return Err(self.invalid(format!("unexpected `{bad}` in `{pattern}`")));
        }

        let mut re = String::from("^");
        for (i, part) in pattern.split("..").enumerate() {
            if part.is_empty() || part.starts_with('.') || part.ends_with('.') {
                return Err(self.invalid(format!("misplaced `.` in `{pattern}`")));
            }
            if i > 0 {
                re.push_str(r"\.(?:[^.]*\.)*");
            }
            for (j, literal) in part.split('*').enumerate() {
                if j > 0 {
                    re.push_str("[^.]*");
                }
                re.push_str(&regex::escape(literal));
            }
        }
        re.push('$');

        Regex::new(&re).map_err(|e| self.invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send() -> MethodSignature {
        MethodSignature::new("app.controller.SendController", "send").param("i64")
    }

    fn matches(expr: &str, sig: &MethodSignature) -> bool {
        PointcutRule::parse(expr).unwrap().matches(sig)
    }

    #[test]
    fn execution_with_wildcard_method_name() {
        let expr = "execution(* app.controller.SendController.send*(..))";
        assert!(matches(expr, &send()));
        assert!(matches(expr, &MethodSignature::new("app.controller.SendController", "sendAll")));
        assert!(!matches(expr, &MethodSignature::new("app.controller.SendController", "receive")));
        assert!(!matches(expr, &MethodSignature::new("app.controller.Other", "send")));
    }

    #[test]
    fn star_does_not_cross_package_boundaries() {
        assert!(matches("execution(* app.*.SendController.send(..))", &send()));
        assert!(!matches("execution(* app.*.send(..))", &send()));
        assert!(matches("execution(* app..send(..))", &send()));
        assert!(matches("execution(* app..SendController.send(..))", &send()));
    }

    #[test]
    fn visibility_modifier_is_checked() {
        let private = send().visibility(Visibility::Private);
        let expr = "execution(public * app.controller.SendController.send(..))";
        assert!(matches(expr, &send()));
        assert!(!matches(expr, &private));
    }

    #[test]
    fn parameter_lists() {
        let sig = send();
        assert!(matches("execution(* *.send(i64))", &sig));
        assert!(matches("execution(* *.send(*))", &sig));
        assert!(!matches("execution(* *.send())", &sig));
        assert!(!matches("execution(* *.send(String))", &sig));

        let two = MethodSignature::new("app.Worker", "rename").param("String").param("i64");
        assert!(matches("execution(* app.Worker.rename(String, ..))", &two));
        assert!(matches("execution(* app.Worker.rename(.., i64))", &two));
        assert!(matches("execution(* app.Worker.rename(*, *))", &two));
        assert!(!matches("execution(* app.Worker.rename(*))", &two));
    }

    #[test]
    fn method_without_declaring_type_matches_any_type() {
        assert!(matches("execution(* send(..))", &send()));
    }

    #[test]
    fn within_and_combinators() {
        let sig = send();
        assert!(matches("within(app..*)", &sig));
        assert!(!matches("within(lib..*)", &sig));
        assert!(matches("within(app..*) && execution(* *.send(..))", &sig));
        assert!(!matches("within(app..*) && !execution(* *.send(..))", &sig));
        assert!(matches("within(lib..*) || (execution(* *..send(..)))", &sig));
    }

    #[test]
    fn named_references_are_inlined() {
        let mut named = HashMap::new();
        named.insert(
            "sendMethods".to_owned(),
            PointcutRule::parse("execution(* app.controller.SendController.send*(..))").unwrap(),
        );
        let rule = PointcutRule::compile("sendMethods() && within(app..*)", &named).unwrap();
        assert!(rule.matches(&send()));

        let err = PointcutRule::compile("missing()", &named).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownPointcut(ref name) if name == "missing"));
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        for expr in [
            "",
            "execution(",
            "execution(* send)",
            "execution(static * send(..))",
            "execution(* app..(..))",
            "within(app/*)",
            "within(app..*) &&",
            "within(app..*) extra",
            "sendMethods(x)",
        ] {
            let err = PointcutRule::parse(expr).unwrap_err();
            assert!(
                matches!(err, ConfigurationError::InvalidPointcut { .. }),
                "`{expr}` gave {err:?}",
            );
        }
    }
}
