//! Small helpers that do not belong to either executor.

/// Returns `true` if the first expression equals any of the candidates.
///
/// Each operand is evaluated at most once, left to right, stopping at the
/// first match.
///
/// ```
/// use offload::is_any_equal;
///
/// assert!(is_any_equal!(7; 8, 9, 7));
/// assert!(!is_any_equal!("one"; "two", "three"));
/// assert!(!is_any_equal!(0));
/// ```
#[macro_export]
macro_rules! is_any_equal {
    ($value:expr $(;)?) => {{
        let _ = &$value;
        false
    }};
    ($value:expr; $($candidate:expr),+ $(,)?) => {{
        let value = &$value;
        false $(|| *value == $candidate)+
    }};
}
