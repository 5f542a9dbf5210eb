use thiserror::Error;

/// One handler's failure, captured by name so the aggregate can report
/// which subscriber(s) misbehaved.
#[derive(Debug, Clone, Error)]
#[error("handler {handler_id} failed: {message}")]
pub struct HandlerError {
    pub handler_id: String,
    pub message: String,
}

/// Raised by `dispatch_or_throw` only; `dispatch` never returns an `Err`
/// itself (handler failures live inside the returned aggregate).
#[derive(Debug, Clone, Error)]
pub enum EventBusError {
    #[error("event {event_name} timed out after {timeout_s}s")]
    Timeout { event_name: String, timeout_s: f64 },

    #[error("{} handler(s) failed for {event_name}: {errors:?}", errors.len())]
    HandlerError {
        event_name: String,
        errors: Vec<HandlerError>,
    },
}

/// Raised at registration time when two event class names violate the
/// pairwise non-substring invariant (§4.1 "Name uniqueness").
#[derive(Debug, Clone, Error)]
#[error("event name {new} overlaps with already-registered name {existing} (names must not be substrings of one another)")]
pub struct NameCollisionError {
    pub new: String,
    pub existing: String,
}

/// Verify that no name in `names` is a substring of any other (and vice
/// versa). O(n^2) but n is the number of event *classes*, a small,
/// fixed set known at startup.
pub fn check_name_uniqueness(names: &[&str]) -> Result<(), NameCollisionError> {
    for (i, a) in names.iter().enumerate() {
        for b in names.iter().skip(i + 1) {
            if a == b {
                continue;
            }
            if a.contains(b) || b.contains(a) {
                return Err(NameCollisionError {
                    new: a.to_string(),
                    existing: b.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_substring_names() {
        let err = check_name_uniqueness(&["Tab", "TabCreated"]);
        assert!(err.is_err());
    }

    #[test]
    fn accepts_disjoint_names() {
        assert!(check_name_uniqueness(&["TabCreated", "TabClosed", "NavigationComplete"]).is_ok());
    }
}
