//! Arithmetic Evaluation
//!
//! Evaluates `$((...))` operand/operator sequences. Two left-to-right
//! passes give `*`, `/`, and `%` precedence over `+` and `-`; there is no
//! other precedence and no unary operators. Unset or non-numeric variables
//! evaluate to 0. Division or modulo by zero aborts the whole expression
//! with [`ExecutionError::DivideByZero`]; the caller reports it and uses 0.

use crate::ast::types::ArithPart;
use crate::interpreter::errors::ExecutionError;
use crate::interpreter::types::ShellState;

/// Evaluate an operand/operator sequence.
pub fn evaluate(parts: &[ArithPart], state: &mut ShellState) -> Result<i64, ExecutionError> {
    let mut values: Vec<i64> = Vec::new();
    let mut operators: Vec<char> = Vec::new();

    for part in parts {
        match part {
            ArithPart::Number(text) => values.push(text.parse().unwrap_or(0)),
            ArithPart::Variable(name) => values.push(variable_value(name, state)),
            ArithPart::Operator(op) => operators.push(*op),
            ArithPart::Nested(inner) => values.push(evaluate(inner, state)?),
        }
    }

    // First pass: multiplication, division, modulo.
    let mut i = 0;
    while i < operators.len() {
        match operators[i] {
            op @ ('*' | '/' | '%') => {
                let (a, b) = (values[i], values[i + 1]);
                let folded = match op {
                    '*' => a.wrapping_mul(b),
                    _ if b == 0 => return Err(ExecutionError::DivideByZero),
                    '/' => a.wrapping_div(b),
                    _ => a.wrapping_rem(b),
                };
                values[i] = folded;
                values.remove(i + 1);
                operators.remove(i);
            }
            _ => i += 1,
        }
    }

    // Second pass: addition, subtraction.
    let mut result = values.first().copied().unwrap_or(0);
    for (op, value) in operators.iter().zip(values.into_iter().skip(1)) {
        result = match op {
            '+' => result.wrapping_add(value),
            _ => result.wrapping_sub(value),
        };
    }
    Ok(result)
}

/// Operand value of a variable: `RANDOM` is fresh each time; anything
/// unset or non-numeric is 0.
fn variable_value(name: &str, state: &mut ShellState) -> i64 {
    if name == "RANDOM" {
        return state.random_value();
    }
    match state.vars.get(name) {
        Some(value) => value.trim().parse().unwrap_or(0),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{FrameInput, SourceStack};

    fn state() -> ShellState {
        ShellState::new(SourceStack::new(
            FrameInput::Terminal,
            vec!["msh".to_string()],
        ))
    }

    fn num(s: &str) -> ArithPart {
        ArithPart::Number(s.into())
    }

    fn op(c: char) -> ArithPart {
        ArithPart::Operator(c)
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        // 2+3*4 = 14
        let parts = vec![num("2"), op('+'), num("3"), op('*'), num("4")];
        assert_eq!(evaluate(&parts, &mut state()).unwrap(), 14);
    }

    #[test]
    fn test_left_to_right_within_a_pass() {
        // 8/2*2 = 8, not 2
        let parts = vec![num("8"), op('/'), num("2"), op('*'), num("2")];
        assert_eq!(evaluate(&parts, &mut state()).unwrap(), 8);
        // 10-2+1 = 9
        let parts = vec![num("10"), op('-'), num("2"), op('+'), num("1")];
        assert_eq!(evaluate(&parts, &mut state()).unwrap(), 9);
    }

    #[test]
    fn test_divide_by_zero_is_an_error() {
        let parts = vec![num("5"), op('/'), num("0")];
        assert!(matches!(
            evaluate(&parts, &mut state()),
            Err(ExecutionError::DivideByZero)
        ));
        let parts = vec![num("5"), op('%'), num("0")];
        assert!(matches!(
            evaluate(&parts, &mut state()),
            Err(ExecutionError::DivideByZero)
        ));
    }

    #[test]
    fn test_unset_and_junk_variables_are_zero() {
        let mut state = state();
        let parts = vec![ArithPart::Variable("MSH_TEST_ARITH_UNSET".into())];
        assert_eq!(evaluate(&parts, &mut state).unwrap(), 0);

        state.vars.set("MSH_TEST_ARITH_JUNK", "12abc");
        let parts = vec![
            ArithPart::Variable("MSH_TEST_ARITH_JUNK".into()),
            op('+'),
            num("1"),
        ];
        assert_eq!(evaluate(&parts, &mut state).unwrap(), 1);
    }

    #[test]
    fn test_variable_operand() {
        let mut state = state();
        state.vars.set("MSH_TEST_ARITH_N", "6");
        let parts = vec![
            ArithPart::Variable("MSH_TEST_ARITH_N".into()),
            op('*'),
            num("7"),
        ];
        assert_eq!(evaluate(&parts, &mut state).unwrap(), 42);
    }

    #[test]
    fn test_nested_expression() {
        // 2*(3+4) = 14
        let parts = vec![
            num("2"),
            op('*'),
            ArithPart::Nested(vec![num("3"), op('+'), num("4")]),
        ];
        assert_eq!(evaluate(&parts, &mut state()).unwrap(), 14);
    }
}
