//! Panic isolation for collaborator calls.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `f`, converting a panic into `Err` with the panic message.
pub fn catch_panic<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catch_panic() {
        assert_eq!(catch_panic(|| 7), Ok(7));
        assert_eq!(catch_panic(|| -> i32 { panic!("boom") }), Err("boom".to_string()));
        let n = 3;
        assert_eq!(
            catch_panic(|| -> i32 { panic!("code {}", n) }),
            Err("code 3".to_string())
        );
    }
}
