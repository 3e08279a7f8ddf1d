mod alpha_miner_tests;

use crate::core::event_data::EventLog;
use crate::event_log;

/// Log `L5` of the Alpha miner literature (loop over `b c d`, `e` concurrent to it)
pub(crate) fn textbook_l5() -> EventLog {
    event_log!(
        "a b e f" => 2,
        "a b e c d b f" => 3,
        "a b c e d b f" => 2,
        "a b c d e b f" => 4,
        "a e b c d b f" => 3,
    )
}

#[test]
fn textbook_log_shape() {
    let log = textbook_l5();
    assert_eq!(log.population(), 14);
    assert_eq!(log.num_distinct_traces(), 5);
    assert_eq!(log.seen_activities().len(), 6);
}
