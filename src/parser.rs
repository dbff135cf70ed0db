//! Parser for loop sources and polynomial expressions.
//!
//! ```text
//! # initializations
//! x = 10
//! y = 0 @ 1/2; 1
//! while x > y:
//!     z = RV(uniform, -1, 1)
//!     x = x + z - 1/2 @ 3/4; x + 1
//! end
//! ```
//!
//! The grammar lives in `grammar.pest`. Decimal literals are read as exact rationals. A branch
//! without `@` takes the remaining probability mass.
use num_bigint::BigInt;
use num_traits::{One, Zero};
use pest::error::LineColLocation;
use pest::iterators::Pairs;
use pest::Parser;
use pest_derive::Parser;

use crate::error::{Error, Result};
use crate::expr::{Expr, Rational};
use crate::program::{Program, RandomVar, Update};
use crate::symbol::Symbol;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct LoopParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

fn parse_error(line: usize, message: impl Into<String>) -> Error {
    Error::Parse {
        line,
        message: message.into(),
    }
}

fn syntax_error(error: pest::error::Error<Rule>) -> Error {
    let line = match error.line_col {
        LineColLocation::Pos((line, _)) | LineColLocation::Span((line, _), _) => line,
    };
    parse_error(line, error.variant.message())
}

fn line_of(pair: &Pair<'_>) -> usize {
    pair.as_span().start_pos().line_col().0
}

fn next_pair<'a>(pairs: &mut Pairs<'a, Rule>, line: usize) -> Result<Pair<'a>> {
    pairs
        .next()
        .ok_or_else(|| parse_error(line, "incomplete syntax tree"))
}

fn parse_number(pair: &Pair<'_>) -> Result<Rational> {
    let text = pair.as_str();
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    let numerator: BigInt = format!("{}{}", whole, fraction)
        .parse()
        .map_err(|_| parse_error(line_of(pair), format!("invalid number `{}`", text)))?;
    let denominator = num_traits::pow(BigInt::from(10u32), fraction.len());
    Ok(Rational::new(numerator, denominator))
}

fn build_expr<F>(pair: Pair<'_>, resolve: &F) -> Result<Expr>
where
    F: Fn(&str) -> Option<Symbol>,
{
    let line = line_of(&pair);
    match pair.as_rule() {
        Rule::expr => {
            let mut inner = pair.into_inner();
            let mut result = build_expr(next_pair(&mut inner, line)?, resolve)?;
            while let Some(op) = inner.next() {
                let rhs = build_expr(next_pair(&mut inner, line)?, resolve)?;
                result = match op.as_str() {
                    "-" => result - rhs,
                    _ => result + rhs,
                };
            }
            Ok(result)
        }
        Rule::term => {
            let mut inner = pair.into_inner();
            let mut result = build_expr(next_pair(&mut inner, line)?, resolve)?;
            while let Some(op) = inner.next() {
                let rhs = build_expr(next_pair(&mut inner, line)?, resolve)?;
                if op.as_str() == "*" {
                    result = result * rhs;
                    continue;
                }
                match rhs.as_constant() {
                    Some(c) if !c.is_zero() => result = result.scale(&c.recip()),
                    Some(_) => return Err(parse_error(line, "division by zero")),
                    None => return Err(parse_error(line, "division by a non-constant expression")),
                }
            }
            Ok(result)
        }
        Rule::unary => {
            let mut inner = pair.into_inner();
            let first = next_pair(&mut inner, line)?;
            if first.as_rule() != Rule::sign_op {
                return build_expr(first, resolve);
            }
            let operand = build_expr(next_pair(&mut inner, line)?, resolve)?;
            Ok(if first.as_str() == "-" { -operand } else { operand })
        }
        Rule::power => {
            let mut inner = pair.into_inner();
            let base = build_expr(next_pair(&mut inner, line)?, resolve)?;
            match inner.next() {
                Some(exponent) => {
                    let exponent: u32 = exponent.as_str().parse().map_err(|_| {
                        parse_error(line, format!("exponent `{}` is too large", exponent.as_str()))
                    })?;
                    Ok(base.pow(exponent))
                }
                None => Ok(base),
            }
        }
        Rule::number => Ok(Expr::constant(parse_number(&pair)?)),
        Rule::ident => match resolve(pair.as_str()) {
            Some(symbol) => Ok(Expr::symbol(symbol)),
            None => Err(Error::UnknownVariable(pair.as_str().to_string())),
        },
        rule => Err(parse_error(line, format!("unexpected {:?} in an expression", rule))),
    }
}

fn build_constant(pair: Pair<'_>) -> Result<Rational> {
    let line = line_of(&pair);
    build_expr(pair, &|_: &str| -> Option<Symbol> { None })?
        .as_constant()
        .ok_or_else(|| parse_error(line, "expected a number"))
}

/// Parses an expression whose identifiers are resolved by `resolve`.
pub fn parse_expr_with(source: &str, resolve: impl Fn(&str) -> Option<Symbol>) -> Result<Expr> {
    let mut pairs = LoopParser::parse(Rule::expression, source).map_err(syntax_error)?;
    let mut inner = next_pair(&mut pairs, 1)?.into_inner();
    build_expr(next_pair(&mut inner, 1)?, &resolve)
}

/// Parses an expression over the variables of `program` and the iteration counter `n`.
pub fn parse_expr(source: &str, program: &Program) -> Result<Expr> {
    parse_expr_with(source, |name| {
        if name == "n" {
            return Some(Symbol::N);
        }
        let symbol = Symbol::var(name);
        program.is_variable(&symbol).then_some(symbol)
    })
}

/// Builds the right-hand side of the assignment to `variable`: either `RV(...)` or branches.
fn build_update<F>(variable: &str, pair: Pair<'_>, resolve: &F) -> Result<Update>
where
    F: Fn(&str) -> Option<Symbol>,
{
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let update = next_pair(&mut inner, line)?;

    if update.as_rule() == Rule::random_var {
        let mut inner = update.into_inner();
        let name = next_pair(&mut inner, line)?.as_str();
        let params = inner.map(build_constant).collect::<Result<Vec<_>>>()?;
        let rv = RandomVar::from_name(name, &params).map_err(|reason| {
            Error::InvalidDistribution {
                variable: variable.to_string(),
                reason,
            }
        })?;
        return Ok(Update::Random(rv));
    }

    let mut branches: Vec<(Expr, Rational)> = Vec::new();
    let mut remainder_branch = None;
    for branch in update.into_inner() {
        let mut parts = branch.into_inner();
        let expr = build_expr(next_pair(&mut parts, line)?, resolve)?;
        match parts.next() {
            None => {
                if remainder_branch.is_some() {
                    return Err(parse_error(line, "more than one branch without probability"));
                }
                remainder_branch = Some(expr);
            }
            Some(probability) => {
                let probability = build_constant(probability)?;
                if !probability.is_zero() {
                    branches.push((expr, probability));
                }
            }
        }
    }
    if let Some(expr) = remainder_branch {
        let rest = Rational::one() - branches.iter().map(|(_, p)| p).sum::<Rational>();
        if !rest.is_zero() {
            branches.push((expr, rest));
        }
    }
    Ok(Update::Branches(branches))
}

/// Parses a loop source into a validated [`Program`].
pub fn parse_program(source: &str) -> Result<Program> {
    let mut pairs = LoopParser::parse(Rule::program, source).map_err(syntax_error)?;
    let program = next_pair(&mut pairs, 1)?;

    let mut statements = Vec::new();
    let mut guard = None;
    for item in program.into_inner() {
        match item.as_rule() {
            Rule::statement => statements.push((item, true)),
            Rule::loop_block => {
                for inner in item.into_inner() {
                    match inner.as_rule() {
                        Rule::guard => guard = Some(inner),
                        Rule::statement => statements.push((inner, false)),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    let guard = guard.ok_or(Error::MissingLoopGuard)?;

    let mut assignments = Vec::with_capacity(statements.len());
    for (statement, is_initialization) in statements {
        let line = line_of(&statement);
        let mut inner = statement.into_inner();
        let name = next_pair(&mut inner, line)?.as_str();
        if name == "n" || name == "RV" {
            return Err(parse_error(line, format!("`{}` is reserved", name)));
        }
        assignments.push((name, is_initialization, next_pair(&mut inner, line)?));
    }
    let names: Vec<&str> = assignments.iter().map(|(name, _, _)| *name).collect();
    let resolve = |name: &str| names.iter().any(|n| *n == name).then(|| Symbol::var(name));

    let mut builder = Program::builder();
    for (name, is_initialization, rhs) in assignments {
        let update = build_update(name, rhs, &resolve)?;
        builder = if is_initialization {
            builder.initial(name, update)
        } else {
            builder.update(name, update)
        };
    }

    let line = line_of(&guard);
    let mut inner = guard.into_inner();
    let lhs = build_expr(next_pair(&mut inner, line)?, &resolve)?;
    let op = next_pair(&mut inner, line)?;
    let rhs = build_expr(next_pair(&mut inner, line)?, &resolve)?;
    let guard = match op.as_str() {
        ">" => lhs - rhs,
        "<" => rhs - lhs,
        _ => return Err(parse_error(line, "only strict guards are supported")),
    };

    builder.guard(guard).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::expr::{int, ratio};

    fn vars(name: &str) -> Option<Symbol> {
        Some(Symbol::var(name))
    }

    #[test]
    fn test_parse_expr() {
        let e = parse_expr_with("3*x**2 - (x + 1)/2 + 0.25", vars).unwrap();
        let x = Expr::var("x");
        let expected = x.pow(2).scale(&int(3)) - x.scale(&ratio(1, 2)) - Expr::constant(ratio(1, 4));
        assert_eq!(e, expected);
        assert_eq!(parse_expr_with("-x^3", vars).unwrap(), -Expr::var("x").pow(3));
    }

    #[test]
    fn test_parse_expr_errors() {
        assert!(matches!(parse_expr_with("x / y", vars), Err(Error::Parse { .. })));
        assert!(matches!(parse_expr_with("x ** y", vars), Err(Error::Parse { .. })));
        assert!(matches!(parse_expr_with("(x + 1", vars), Err(Error::Parse { .. })));
        assert!(matches!(parse_expr_with("x $ 1", vars), Err(Error::Parse { .. })));
        assert!(matches!(
            parse_expr_with("z", |_| None),
            Err(Error::UnknownVariable(_))
        ));
    }

    #[test]
    fn test_parse_program() {
        let source = "
            # fair walk
            x = 10
            while x > 0:
                x = x - 1 @ 1/2; x + 1
            end
        ";
        let program = parse_program(source).unwrap();
        let x = Symbol::var("x");
        assert_eq!(program.loop_guard(), &Expr::var("x"));
        let update = program.update(&x).unwrap();
        assert_eq!(
            update,
            &Update::Branches(vec![
                (Expr::var("x") - Expr::one(), ratio(1, 2)),
                (Expr::var("x") + Expr::one(), ratio(1, 2)),
            ])
        );
        assert_eq!(
            program.initial_value(&x).unwrap().single_branch(),
            Some(&Expr::from(10))
        );
    }

    #[test]
    fn test_parse_random_vars_and_flipped_guard() {
        let source = "
            while x < 100:
                y = RV(uniform, -1, 2)
                x = x + y
            end
        ";
        let program = parse_program(source).unwrap();
        assert_eq!(program.loop_guard(), &(Expr::from(100) - Expr::var("x")));
        assert!(program.is_random(&Symbol::var("y")));
        assert_eq!(
            program.update(&Symbol::var("y")),
            Some(&Update::Random(RandomVar::Uniform {
                low: int(-1),
                high: int(2)
            }))
        );
    }

    #[test]
    fn test_parse_program_errors() {
        let missing_end = "x = 1\nwhile x > 0:\n    x = x - 1\n";
        assert!(matches!(parse_program(missing_end), Err(Error::Parse { .. })));

        let no_loop = "x = 1\n";
        assert!(matches!(parse_program(no_loop), Err(Error::MissingLoopGuard)));

        let non_strict = "while x >= 0:\n    x = x - 1\nend\n";
        assert!(matches!(parse_program(non_strict), Err(Error::Parse { .. })));

        let unknown = "while x > 0:\n    x = x - z\nend\n";
        assert!(matches!(parse_program(unknown), Err(Error::UnknownVariable(_))));

        let bad_rv = "while x > 0:\n    y = RV(poisson, 1)\n    x = x - y\nend\n";
        assert!(matches!(
            parse_program(bad_rv),
            Err(Error::InvalidDistribution { variable, .. }) if variable == "y"
        ));

        let empty_interval = "while x > 0:\n    y = RV(uniform, 2, 1)\n    x = x - y\nend\n";
        assert!(matches!(
            parse_program(empty_interval),
            Err(Error::InvalidDistribution { .. })
        ));

        let bad_sum = "while x > 0:\n    x = x - 1 @ 1/2; x + 1 @ 1/3\nend\n";
        assert!(matches!(parse_program(bad_sum), Err(Error::ProbabilitySum { .. })));
    }

    #[test]
    fn test_error_lines() {
        let bad_character = "x = 1\nwhile x > 0:\n    x = x $ 1\nend\n";
        assert!(matches!(parse_program(bad_character), Err(Error::Parse { line: 3, .. })));

        let bad_division = "x = 1\nwhile x > 0:\n    x = x / x\nend\n";
        assert!(matches!(parse_program(bad_division), Err(Error::Parse { line: 3, .. })));

        let trailing = "x = 1\nwhile x > 0:\n    x = x - 1\nend\nx = 2\n";
        assert!(matches!(parse_program(trailing), Err(Error::Parse { line: 5, .. })));
    }

    #[test]
    fn test_parse_expr_for_program() {
        let program = parse_program("while x > 0:\n    x = x - 1\nend\n").unwrap();
        let e = parse_expr("x*n + 1", &program).unwrap();
        assert_eq!(e, Expr::var("x") * Expr::n() + Expr::one());
        assert!(parse_expr("y", &program).is_err());
    }
}
