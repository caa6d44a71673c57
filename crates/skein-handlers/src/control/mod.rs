//! Control handlers
//!
//! Branching, parallel fan-out/fan-in, and bounded looping.

mod conditional;
mod fan_in;
mod parallel;
mod stack_loop;

pub use conditional::ConditionalHandler;
pub use fan_in::FanInHandler;
pub use parallel::ParallelHandler;
pub use stack_loop::StackLoopHandler;

use serde_json::Value;

/// Truthiness for context flags: absent, null, false, zero, and empty
/// or "false"/"0" strings are false.
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "false" && s != "0",
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(Some(&json!(true))));
        assert!(is_truthy(Some(&json!("yes"))));
        assert!(is_truthy(Some(&json!(1))));
        assert!(is_truthy(Some(&json!(["x"]))));

        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(Some(&json!("false"))));
        assert!(!is_truthy(Some(&json!("0"))));
        assert!(!is_truthy(Some(&json!(0))));
    }
}
