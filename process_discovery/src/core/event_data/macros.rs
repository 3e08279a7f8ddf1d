/// Create a [`Trace`].
///
/// A trace is denoted by a comma-separated list of activity labels.
///
/// # Examples
///
/// ```rust
/// use process_discovery::trace;
///
/// let t = trace!("register", "check", "decide");
/// assert_eq!(t.len(), 3);
/// ```
///
/// [`Trace`]: crate::core::event_data::Trace
#[macro_export]
macro_rules! trace {
    ($($act:expr),* $(,)?) => {
        $crate::core::event_data::Trace::new(::std::vec![$(::std::string::String::from($act)),*])
    };
}

/// Create an [`EventLog`].
///
/// Every trace is written as a whitespace separated string of activity labels,
/// optionally followed by `=> frequency` (defaults to 1).
/// Repeated traces are merged into one entry with summed frequencies.
///
/// # Examples
///
/// ```rust
/// use process_discovery::event_log;
///
/// let log = event_log!(
///     "a b c d" => 3,
///     "a c b d" => 2,
///     "a e d"
/// );
/// assert_eq!(log.population(), 6);
/// assert_eq!(log.num_distinct_traces(), 3);
/// ```
///
/// [`EventLog`]: crate::core::event_data::EventLog
#[macro_export]
macro_rules! event_log {
    (@freq) => { 1_u64 };
    (@freq $freq:expr) => { $freq as u64 };
    ($($trace:expr $(=> $freq:expr)?),* $(,)?) => {{
        let traces: ::std::vec::Vec<($crate::core::event_data::Trace, u64)> = ::std::vec![
            $(
                ($crate::core::event_data::Trace::from($trace), $crate::event_log!(@freq $($freq)?))
            ),*
        ];
        traces.into_iter().collect::<$crate::core::event_data::EventLog>()
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn event_log_macro() {
        let log = event_log!("a b" => 2, "a b", "b a" => 4);
        assert_eq!(log.population(), 7);
        assert_eq!(log.frequency_of(&trace!("a", "b")), 3);
        let empty = event_log!();
        assert!(empty.is_empty());
    }
}
