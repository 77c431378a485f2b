//! Panic guard for resolvers.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

/// Run one resolver; a panic is logged, recorded as a warning and turned
/// into `None`.
pub(crate) fn guarded<T>(
    stage: &str,
    warnings: &mut Vec<String>,
    resolve: impl FnOnce() -> T,
) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(resolve)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("{} resolver failed: {}", stage, message);
            warnings.push(format!("{} resolver failed: {}", stage, message));
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_turns_panic_into_warning() {
        let mut warnings = Vec::new();
        let value: Option<u32> = guarded("table", &mut warnings, || panic!("boom"));

        assert_eq!(value, None);
        assert_eq!(warnings, vec!["table resolver failed: boom".to_string()]);
    }

    #[test]
    fn test_guarded_passes_value_through() {
        let mut warnings = Vec::new();
        assert_eq!(guarded("totals", &mut warnings, || 7), Some(7));
        assert!(warnings.is_empty());
    }
}
