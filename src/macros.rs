//! Custom macro definitions

#[macro_export]
/// Assert that two floats agree up to the given absolute tolerance
macro_rules! assert_fuzzy_eq {
    ( $left:expr, $right:expr, $tol:expr ) => {{
        match (&($left), &($right), &($tol)) {
            (left_val, right_val, tol) => {
                if !((*left_val - *right_val).abs() < *tol) {
                    panic!(
                        "assertion failed: values differ by more than `{:?}` \
                         (left: `{:?}`, right: `{:?}`)",
                        *tol, *left_val, *right_val
                    )
                }
            }
        }
    }};
}
