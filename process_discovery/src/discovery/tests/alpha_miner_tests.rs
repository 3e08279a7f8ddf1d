use std::collections::BTreeSet;

use crate::discovery::alpha::{
    alpha_miner_discover_petri_net, alpha_plus_miner_discover_petri_net, AlphaMinerConfig,
    AlphaMinerInstance, AlphaMinerPlusInstance, AlphaPair, AlphaRelation,
};
use crate::core::process_models::petri_net::AcceptingPetriNet;
use crate::event_log;
use crate::utils::Executor;

use super::textbook_l5;

fn place_names(net: &AcceptingPetriNet) -> BTreeSet<String> {
    net.net().places().map(|p| p.name().to_string()).collect()
}

#[test]
fn alpha_miner_textbook_l5() {
    let _ = env_logger::builder().is_test(true).try_init();
    let log = textbook_l5();
    let miner = AlphaMinerInstance::new(&log, AlphaMinerConfig::default()).unwrap();
    assert_eq!(
        miner.start_activities(),
        &["a".to_string()].into_iter().collect()
    );
    assert_eq!(
        miner.maximal_pairs().len(),
        5,
        "{:?}",
        miner.maximal_pairs()
    );
    let net = miner.discover().unwrap();
    let expected: BTreeSet<String> = [
        "I",
        "O",
        "P({a,d},{b})",
        "P({a},{e})",
        "P({b},{c,f})",
        "P({c},{d})",
        "P({e},{f})",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(place_names(&net), expected);
    assert_eq!(net.net().num_transitions(), 6);
    assert_eq!(net.net().arcs().len(), 14);

    for (trace, _) in log.iter() {
        let end = net
            .replay_labels(trace.iter())
            .unwrap_or_else(|| panic!("{trace} not replayable"));
        assert!(net.reached_final(&end), "{trace} ends in {end}");
    }
    assert!(net.replay_labels(["a", "f"]).is_none());
}

#[test]
fn place_flows_follow_pairs() {
    let log = textbook_l5();
    let net = alpha_miner_discover_petri_net(&log, AlphaMinerConfig::default()).unwrap();
    let net = net.net();
    let p = net.place_by_name("P({a,d},{b})").unwrap().id();
    let inputs: BTreeSet<&str> = net
        .preset_of_place(p)
        .iter()
        .filter_map(|t| net.transition(t).map(|t| t.name()))
        .collect();
    let outputs: BTreeSet<&str> = net
        .postset_of_place(p)
        .iter()
        .filter_map(|t| net.transition(t).map(|t| t.name()))
        .collect();
    assert_eq!(inputs, ["a", "d"].into_iter().collect());
    assert_eq!(outputs, ["b"].into_iter().collect());
}

#[test]
fn footprint_of_textbook_log() {
    let miner = AlphaMinerInstance::new(&textbook_l5(), AlphaMinerConfig::default()).unwrap();
    let fp = miner.footprint();
    assert_eq!(fp.relation("a", "b"), Some(AlphaRelation::Causal));
    assert_eq!(fp.relation("b", "a"), Some(AlphaRelation::DirectlyFollows));
    assert_eq!(fp.relation("b", "e"), Some(AlphaRelation::Parallel));
    assert_eq!(fp.relation("a", "d"), Some(AlphaRelation::NeverFollows));
    assert_eq!(fp.relation("d", "b"), Some(AlphaRelation::Causal));
    assert!(AlphaPair::new(["a", "d"], ["b"], fp).is_ok());
    assert!(AlphaPair::new(["a", "e"], ["b"], fp).is_err());
    assert!(miner
        .pairs()
        .iter()
        .any(|p| p.place_name() == "P({d},{b})"));
}

#[test]
fn parallel_and_sequential_agree() {
    let log = textbook_l5();
    let seq = alpha_miner_discover_petri_net(&log, AlphaMinerConfig::default()).unwrap();
    let par = alpha_miner_discover_petri_net(
        &log,
        AlphaMinerConfig {
            min_instances: 1,
            executor: Executor::Parallel,
        },
    )
    .unwrap();
    assert_eq!(seq.net().to_json().unwrap(), par.net().to_json().unwrap());
}

#[test]
fn noise_threshold() {
    let log = event_log!("a b c" => 10, "a c b" => 1);
    let config = AlphaMinerConfig {
        min_instances: 2,
        executor: Executor::Sequential,
    };
    let miner = AlphaMinerInstance::new(&log, config).unwrap();
    let names: Vec<String> = miner
        .maximal_pairs()
        .iter()
        .map(|p| p.place_name())
        .collect();
    assert_eq!(names, vec!["P({a},{b})", "P({b},{c})"]);
}

#[test]
fn alpha_plus_length_one_loop() {
    let log = event_log!("a c", "a b c", "a b b c");
    let miner = AlphaMinerPlusInstance::new(&log, AlphaMinerConfig::default()).unwrap();
    let ctx = miner.length_one_loops().get("b").unwrap();
    assert_eq!(ctx.predecessors, ["a".to_string()].into_iter().collect());
    assert_eq!(ctx.successors, ["c".to_string()].into_iter().collect());
    assert_eq!(miner.inner().activities(), &["a", "c"]);

    let net = miner.discover().unwrap();
    assert_eq!(
        place_names(&net),
        ["I", "O", "P({a},{c})"].into_iter().map(String::from).collect()
    );
    assert_eq!(net.net().num_transitions(), 3);
    assert_eq!(net.net().arcs().len(), 6);
    for (trace, _) in log.iter() {
        let end = net.replay_labels(trace.iter()).unwrap();
        assert!(net.reached_final(&end));
    }
}

#[test]
fn alpha_plus_length_two_loop() {
    let log = event_log!("a b d", "a b c b d", "a b c b c b d");
    let plain = AlphaMinerInstance::new(&log, AlphaMinerConfig::default()).unwrap();
    assert!(plain.footprint().is_parallel("b", "c"));

    let plus = AlphaMinerPlusInstance::new(&log, AlphaMinerConfig::default()).unwrap();
    assert!(plus.length_one_loops().is_empty());
    let fp = plus.inner().footprint();
    assert!(fp.is_causal("b", "c"));
    assert!(fp.is_causal("c", "b"));

    let net = alpha_plus_miner_discover_petri_net(&log, AlphaMinerConfig::default()).unwrap();
    assert_eq!(
        place_names(&net),
        ["I", "O", "P({a,c},{b})", "P({b},{c,d})"]
            .into_iter()
            .map(String::from)
            .collect()
    );
    for (trace, _) in log.iter() {
        let end = net.replay_labels(trace.iter()).unwrap();
        assert!(net.reached_final(&end));
    }
}

#[test]
fn initial_and_final_markings() {
    let net = alpha_miner_discover_petri_net(&event_log!("a b"), AlphaMinerConfig::default())
        .unwrap();
    let start = net.net().place_by_name("I").unwrap().id();
    let end = net.net().place_by_name("O").unwrap().id();
    assert_eq!(net.initial_marking().tokens_at(&start), 1);
    assert_eq!(net.initial_marking().total_tokens(), 1);
    assert_eq!(net.final_markings().len(), 1);
    assert_eq!(net.final_markings()[0].tokens_at(&end), 1);
    let a = net.net().transitions_by_label("a")[0];
    assert_eq!(net.initial_marking().enabled(), [a].into_iter().collect());
}
