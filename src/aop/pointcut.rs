//! Type and method predicates deciding where advice applies.

use std::fmt;

use regex::Regex;

use crate::bean_type::BeanType;
use crate::error::{ContainerError, ContainerResult};

/// Identity of a called method: its name and argument count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    name: String,
    arity: usize,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        MethodSignature {
            name: name.into(),
            arity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Type and method predicate pair.
pub trait Pointcut: Send + Sync {
    /// Whether any method of `bean_type` may be advised.
    fn matches_type(&self, bean_type: &BeanType) -> bool;

    /// Whether `method` on `bean_type` is advised.
    fn matches_method(&self, method: &MethodSignature, bean_type: &BeanType) -> bool;
}

/// Matches every method of every type.
#[derive(Debug, Default, Clone, Copy)]
pub struct MatchAll;

impl Pointcut for MatchAll {
    fn matches_type(&self, _bean_type: &BeanType) -> bool {
        true
    }

    fn matches_method(&self, _method: &MethodSignature, _bean_type: &BeanType) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamPattern {
    Any,
    Exactly(usize),
}

/// Pointcut compiled from an `execution(..)` expression.
///
/// Grammar: `execution(<return> <type>::<method>(<params>))`
///
/// - `<return>` is `*` or any single token and is not checked, since calls
///   carry no static return type.
/// - `<type>` is a path pattern where `*` matches any run of characters.
///   It is matched against the full type path, the last path segment, and
///   the same two forms of every declared interface.
/// - `<method>` is an identifier pattern where `*` matches any identifier
///   characters.
/// - `<params>` is `..` for any argument count, empty for none, or a
///   comma-separated list whose length is the required count.
///
/// The expression is compiled once; matching never re-parses it.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{Bean, BeanType, ExpressionPointcut, MethodSignature, Pointcut};
///
/// trait UserService: Send + Sync {}
///
/// #[derive(Default)]
/// struct UserServiceImpl;
/// impl Bean for UserServiceImpl {}
///
/// let ty = BeanType::builder::<UserServiceImpl>()
///     .default_constructor()
///     .interface::<dyn UserService>()
///     .build();
///
/// let pointcut = ExpressionPointcut::parse("execution(* UserService::find*(..))").unwrap();
/// assert!(pointcut.matches_type(&ty));
/// assert!(pointcut.matches_method(&MethodSignature::new("find_by_id", 1), &ty));
/// assert!(!pointcut.matches_method(&MethodSignature::new("save", 1), &ty));
/// ```
#[derive(Clone)]
pub struct ExpressionPointcut {
    expression: String,
    type_pattern: Regex,
    method_pattern: Regex,
    params: ParamPattern,
}

impl ExpressionPointcut {
    pub fn parse(expression: &str) -> ContainerResult<Self> {
        let invalid = |reason: &str| ContainerError::InvalidPointcut {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        let body = expression
            .trim()
            .strip_prefix("execution(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| invalid("expected execution(...)"))?
            .trim();

        let (ret, signature) = body
            .split_once(char::is_whitespace)
            .ok_or_else(|| invalid("expected '<return> <type>::<method>(<params>)'"))?;
        if ret.is_empty() {
            return Err(invalid("missing return pattern"));
        }
        let signature = signature.trim();

        let open = signature.find('(').ok_or_else(|| invalid("missing parameter list"))?;
        let params = signature[open..]
            .strip_prefix('(')
            .and_then(|p| p.strip_suffix(')'))
            .ok_or_else(|| invalid("unbalanced parameter list"))?
            .trim();
        let path = signature[..open].trim();

        let (type_part, method_part) = path
            .rsplit_once("::")
            .ok_or_else(|| invalid("expected '<type>::<method>'"))?;
        if type_part.is_empty() || method_part.is_empty() {
            return Err(invalid("empty type or method pattern"));
        }
        if !method_part
            .chars()
            .all(|c| c == '*' || c == '_' || c.is_alphanumeric())
        {
            return Err(invalid("method pattern may only contain identifier characters and '*'"));
        }

        let params = match params {
            ".." => ParamPattern::Any,
            "" => ParamPattern::Exactly(0),
            list => ParamPattern::Exactly(list.split(',').count()),
        };

        let type_pattern = compile(type_part, ".*").map_err(|e| invalid(&e.to_string()))?;
        let method_pattern =
            compile(method_part, "[A-Za-z0-9_]*").map_err(|e| invalid(&e.to_string()))?;

        Ok(ExpressionPointcut {
            expression: expression.to_string(),
            type_pattern,
            method_pattern,
            params,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    fn type_name_matches(&self, name: &str) -> bool {
        let name = name.strip_prefix("dyn ").unwrap_or(name);
        self.type_pattern.is_match(name)
            || self
                .type_pattern
                .is_match(crate::key::short_type_name(name))
    }
}

fn compile(pattern: &str, wildcard: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(wildcard);
    Regex::new(&format!("^{}$", body))
}

impl Pointcut for ExpressionPointcut {
    fn matches_type(&self, bean_type: &BeanType) -> bool {
        self.type_name_matches(bean_type.name())
            || bean_type
                .interfaces()
                .iter()
                .any(|interface| self.type_name_matches(interface.name()))
    }

    fn matches_method(&self, method: &MethodSignature, bean_type: &BeanType) -> bool {
        let arity_ok = match self.params {
            ParamPattern::Any => true,
            ParamPattern::Exactly(n) => n == method.arity(),
        };
        arity_ok && self.method_pattern.is_match(method.name()) && self.matches_type(bean_type)
    }
}

impl fmt::Debug for ExpressionPointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionPointcut")
            .field("expression", &self.expression)
            .finish()
    }
}
