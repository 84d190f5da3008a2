//! Budget properties of the context planner over generated conversations

use memory_relay::context::{
    BudgetConfig, ContextBudgetPlanner, HeuristicEstimator, Message, TokenEstimator,
};
use proptest::prelude::*;
use std::sync::Arc;

fn planner(context_limit: usize, keep_initial_count: usize, share: f64) -> ContextBudgetPlanner {
    let config = BudgetConfig {
        context_limit,
        output_reserve: 300,
        safety_margin: 500,
        keep_initial_count,
        initial_share_fraction: share,
        ..Default::default()
    };
    ContextBudgetPlanner::new(config, Arc::new(HeuristicEstimator::default())).unwrap()
}

/// One turn of mostly Latin words with some CJK runs mixed in
fn turn() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![4 => "[a-z]{1,9}", 1 => "[你好世界记忆旅行]{1,4}"],
        1..60,
    )
    .prop_map(|words| words.join(" "))
}

/// Alternating user/assistant history
fn conversation(max_len: usize) -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec(turn(), 0..max_len).prop_map(|turns| {
        turns
            .into_iter()
            .enumerate()
            .map(|(i, content)| {
                if i % 2 == 0 {
                    Message::user(content)
                } else {
                    Message::assistant(content)
                }
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn selection_never_exceeds_available_budget(
        limit in 1_000usize..10_000,
        keep in 0usize..10,
        share in 0.0..=1.0f64,
        history in conversation(80),
        current in turn(),
    ) {
        let planner = planner(limit, keep, share);
        let current = Message::user(current);

        let summary = Some("We talked about trips.");
        let planned = planner.plan("You are a companion.", summary, &history, &current);
        let cost: usize = planned.messages.iter().map(|m| planner.message_cost(m)).sum();

        prop_assert_eq!(cost, planned.used_tokens);
        if planned.overflow {
            prop_assert_eq!(&planned.messages, &vec![current.clone()]);
        } else {
            prop_assert!(cost <= planned.available, "{} > {}", cost, planned.available);
        }
        prop_assert_eq!(planned.messages.last(), Some(&current));
    }

    #[test]
    fn initial_block_respects_share_and_count(
        limit in 1_000usize..6_000,
        keep in 0usize..10,
        share in 0.0..=1.0f64,
        history in conversation(60),
    ) {
        let planner = planner(limit, keep, share);
        let planned = planner.plan("", None, &history, &Message::user("hi"));

        let initial_cost: usize = history[..planned.initial_count]
            .iter()
            .map(|m| planner.message_cost(m))
            .sum();

        prop_assert!(initial_cost as f64 <= planned.available as f64 * share);
        prop_assert!(planned.initial_count <= keep);
        prop_assert_eq!(
            &planned.messages[..planned.initial_count],
            &history[..planned.initial_count]
        );
    }

    #[test]
    fn selection_preserves_order_and_partitions_history(
        limit in 1_000usize..6_000,
        keep in 0usize..10,
        history in conversation(60),
    ) {
        let planner = planner(limit, keep, 0.3);
        let planned = planner.plan("", None, &history, &Message::user("next"));
        let recent_start = history.len() - planned.recent_count;

        prop_assert!(planned.initial_count <= recent_start);
        prop_assert_eq!(
            planned.initial_count + planned.recent_count + planned.dropped_count,
            history.len()
        );
        prop_assert_eq!(
            &planned.messages[planned.initial_count..planned.messages.len() - 1],
            &history[recent_start..]
        );
    }

    #[test]
    fn plan_is_deterministic_across_instances(
        limit in 1_000usize..6_000,
        history in conversation(50),
    ) {
        let current = Message::user("same");
        let first = planner(limit, 6, 0.3).plan("sys", Some("sum"), &history, &current);
        let second = planner(limit, 6, 0.3).plan("sys", Some("sum"), &history, &current);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn oversized_current_message_sent_alone(
        limit in 1_000usize..3_000,
        words in 3_000usize..6_000,
        history in conversation(30),
    ) {
        let planner = planner(limit, 6, 0.3);
        let current = Message::user("word ".repeat(words));
        prop_assert!(HeuristicEstimator::default().estimate(&current.content) > limit);

        let planned = planner.plan("", None, &history, &current);

        prop_assert_eq!(planned.available, limit - 800);
        prop_assert!(planned.overflow);
        prop_assert_eq!(&planned.messages, &vec![current]);
        prop_assert_eq!(planned.dropped_count, history.len());
    }

    #[test]
    fn zero_share_keeps_no_initial_block(history in conversation(40)) {
        let planner = planner(100_000, 6, 0.0);
        let planned = planner.plan("", None, &history, &Message::user("hi"));
        prop_assert_eq!(planned.initial_count, 0);
    }
}
