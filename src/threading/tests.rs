//! Pipeline tests for message threading
//!
//! These exercise coalescing, linking and numbering together, including the
//! structural properties that must hold for arbitrary message logs.

#[cfg(test)]
mod integration_tests {
    use super::super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use std::collections::{HashMap, HashSet};

    const AUTHORS: [&str; 4] = ["Alice", "Bob", "Carol", "Dave"];

    /// A noisy log: bursts, explicit replies to loaded and unloaded parents,
    /// and long silences that start new threads
    fn generate_log(seed: u64, len: usize) -> Vec<Message> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut messages: Vec<Message> = Vec::with_capacity(len);
        let mut timestamp: i64 = 1_700_000_000_000;
        // Latest message that replied to an unloaded parent
        let mut last_ghost_reply: Option<usize> = None;

        for i in 0..len {
            timestamp += match rng.random_range(0..10) {
                0 => 0,
                1..=4 => rng.random_range(1..20_000),
                5..=8 => rng.random_range(20_000..400_000),
                _ => rng.random_range(400_000..5_000_000),
            };
            let author = AUTHORS[rng.random_range(0..AUTHORS.len())];
            let mut message = Message::new(format!("m{i}"), author, timestamp, format!("text {i}"));

            match rng.random_range(0..10) {
                0 | 1 if i > 0 => {
                    let parent = rng.random_range(0..i);
                    message = message.replying_to(format!("m{parent}"));
                }
                2 => {
                    message = message
                        .replying_to(format!("unloaded-{}", rng.random_range(0..5)))
                        .with_parent_preview("Someone", "old context");
                    last_ghost_reply = Some(i);
                }
                3 => {
                    if let Some(parent) = last_ghost_reply {
                        message = message.replying_to(format!("m{parent}"));
                    }
                }
                _ => {}
            }
            messages.push(message);
        }

        messages
    }

    /// Shuffle freely, except that messages sharing a timestamp keep their
    /// relative input order
    fn shuffle_keeping_tie_order(messages: &[Message], rng: &mut StdRng) -> Vec<Message> {
        let mut order: Vec<usize> = (0..messages.len()).collect();
        order.shuffle(rng);

        let mut tied: HashMap<i64, Vec<usize>> = HashMap::new();
        for (idx, message) in messages.iter().enumerate() {
            tied.entry(message.timestamp).or_default().push(idx);
        }
        let mut next_in_group: HashMap<i64, usize> = HashMap::new();

        order
            .into_iter()
            .map(|idx| {
                let timestamp = messages[idx].timestamp;
                let position = next_in_group.entry(timestamp).or_default();
                let original = tied[&timestamp][*position];
                *position += 1;
                messages[original].clone()
            })
            .collect()
    }

    fn test_threader() -> MessageThreader {
        MessageThreader::with_config(ThreadingConfig {
            coalesce_window_ms: 30_000,
            implicit_link_window_ms: 180_000,
            enable_debug_logging: true,
        })
    }

    #[test]
    fn test_empty_messages_integration() {
        let forest = MessageThreader::new().reconstruct(vec![]).unwrap();

        assert!(forest.is_empty());
        assert!(forest.roots().is_empty());
    }

    #[test]
    fn test_threader_creation() {
        let threader = MessageThreader::new();

        let config = threader.config();
        assert_eq!(config.coalesce_window_ms, 60_000);
        assert_eq!(config.implicit_link_window_ms, 300_000);
        assert!(!config.enable_debug_logging);
        assert_eq!(MessageThreader::default().config(), config);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let threader = MessageThreader::with_config(ThreadingConfig {
            coalesce_window_ms: 100_000,
            implicit_link_window_ms: 1_000,
            enable_debug_logging: false,
        });

        let result = threader.reconstruct(vec![Message::new("a", "Alice", 0, "hi")]);
        assert!(matches!(result, Err(ThreadingError::InvalidConfig(_))));
    }

    #[test]
    fn test_coalescing_determinism() {
        let messages = vec![
            Message::new("a1", "Alice", 0, "hello"),
            Message::new("a2", "Alice", 10_000, "world"),
        ];

        let wide = MessageThreader::with_config(ThreadingConfig {
            coalesce_window_ms: 30_000,
            ..Default::default()
        });
        let forest = wide.reconstruct(messages.clone()).unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.roots()[0].content, "hello world");

        let narrow = MessageThreader::with_config(ThreadingConfig {
            coalesce_window_ms: 5_000,
            ..Default::default()
        });
        let forest = narrow.reconstruct(messages).unwrap();
        assert_eq!(forest.len(), 2);
        // Still threaded implicitly, just not merged
        assert_eq!(forest.parent_number(2), Some(1));
    }

    #[test]
    fn test_explicit_parent_wins_over_coalescing() {
        let messages = vec![
            Message::new("a1", "Alice", 0, "hello"),
            Message::new("a2", "Alice", 1_000, "about X").replying_to("X"),
        ];

        let forest = test_threader().reconstruct(messages).unwrap();

        assert_eq!(forest.len(), 3);
        let ids: Vec<&str> = forest.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "X", "a2"]);
        let ghost = forest.get_by_id("X").unwrap();
        assert!(ghost.is_ghost);
        assert!(ghost.is_root());
        assert_eq!(ghost.children[0].id, "a2");
    }

    #[test]
    fn test_ghost_synthesis_from_preview() {
        let messages = vec![
            Message::new("c", "Carol", 1_000, "sure")
                .replying_to("p")
                .with_parent_preview("Bob", "hi"),
        ];

        let forest = MessageThreader::new().reconstruct(messages).unwrap();

        assert_eq!(forest.roots().len(), 1);
        let ghost = &forest.roots()[0];
        assert_eq!(ghost.id, "p");
        assert_eq!(ghost.author, "Bob");
        assert_eq!(ghost.content, "hi");
        assert!(ghost.is_ghost);
        assert_eq!(ghost.children.len(), 1);
        assert_eq!(ghost.children[0].id, "c");
    }

    #[test]
    fn test_reply_to_folded_message_gets_ghost() {
        let messages = vec![
            Message::new("a1", "Alice", 0, "one"),
            Message::new("a2", "Alice", 5_000, "two"),
            Message::new("b1", "Bob", 10_000, "re: two").replying_to("a2"),
        ];

        let forest = test_threader().reconstruct(messages).unwrap();

        let ids: Vec<&str> = forest.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "b1"]);
        assert!(!forest.get_by_number(1).unwrap().is_ghost);
        assert_eq!(forest.get_by_number(1).unwrap().merged_ids, vec!["a2"]);
        assert!(forest.get_by_number(2).unwrap().is_ghost);
    }

    #[test]
    fn test_tie_with_reply_is_deterministic() {
        let messages = vec![
            Message::new("a1", "Alice", 1_000, "hi"),
            Message::new("a2", "Alice", 1_000, "re").replying_to("a1"),
        ];

        let forest = test_threader().reconstruct(messages).unwrap();

        assert_eq!(forest.len(), 2);
        assert_eq!(forest.parent_number(2), Some(1));
        assert_eq!(forest.get_by_number(2).unwrap().id, "a2");
    }

    #[test]
    fn test_duplicate_ids_fall_back_to_flat_view() {
        let messages = vec![
            Message::new("a", "Alice", 0, "one"),
            Message::new("b", "Bob", 1_000, "two"),
            Message::new("a", "Carol", 2_000, "three"),
        ];
        let threader = test_threader();

        assert_eq!(
            threader.reconstruct(messages.clone()).unwrap_err(),
            ThreadingError::DuplicateId("a".to_string())
        );

        let forest = threader.reconstruct_or_flat(messages);
        assert_eq!(forest.len(), 3);
        assert_eq!(forest.roots().len(), 3);
        assert_eq!(forest.ghost_count(), 0);
    }

    #[test]
    fn test_conservation() {
        for seed in 0..20 {
            let messages = generate_log(seed, 200);
            let input_ids: HashSet<String> = messages.iter().map(|m| m.id.clone()).collect();

            let forest = test_threader().reconstruct(messages).unwrap();

            let mut occurrences: HashMap<String, usize> = HashMap::new();
            let mut folded = 0;
            for node in forest.iter().filter(|node| !node.is_ghost) {
                *occurrences.entry(node.id.clone()).or_default() += 1;
                for merged in &node.merged_ids {
                    *occurrences.entry(merged.clone()).or_default() += 1;
                    folded += 1;
                }
            }

            assert_eq!(occurrences.len(), input_ids.len(), "seed {seed}");
            assert!(occurrences.values().all(|&count| count == 1), "seed {seed}");
            assert!(occurrences.keys().all(|id| input_ids.contains(id)), "seed {seed}");
            assert_eq!(forest.real_count(), input_ids.len() - folded, "seed {seed}");
        }
    }

    #[test]
    fn test_no_cycles() {
        for seed in 0..20 {
            let forest = test_threader().reconstruct(generate_log(seed, 200)).unwrap();

            for node in forest.iter() {
                let mut visited: HashSet<&str> = HashSet::new();
                let mut current = Some(node);
                while let Some(message) = current {
                    assert!(visited.insert(message.id.as_str()), "seed {seed}");
                    current = message
                        .parent_id
                        .as_deref()
                        .and_then(|parent_id| forest.get_by_id(parent_id));
                }
            }
        }
    }

    #[test]
    fn test_numbering_contiguity() {
        for seed in 0..20 {
            let forest = test_threader().reconstruct(generate_log(seed, 150)).unwrap();

            let mut numbers: Vec<u32> = forest.iter().map(|m| m.display_number).collect();
            numbers.sort_unstable();
            let expected: Vec<u32> = (1..=forest.len() as u32).collect();
            assert_eq!(numbers, expected, "seed {seed}");
            assert!(verify_forest(forest.roots()).is_ok());
        }
    }

    #[test]
    fn test_children_ordered_and_depths_consistent() {
        let forest = test_threader().reconstruct(generate_log(7, 300)).unwrap();

        for node in forest.iter() {
            assert!(
                node.children
                    .windows(2)
                    .all(|pair| pair[0].timestamp <= pair[1].timestamp)
            );
            for child in &node.children {
                assert_eq!(child.depth, node.depth + 1);
                assert_eq!(child.parent_id.as_deref(), Some(node.id.as_str()));
            }
        }
    }

    #[test]
    fn test_shuffled_input_yields_identical_forest() {
        for seed in 0..10 {
            let messages = generate_log(seed, 120);
            let expected = test_threader().reconstruct(messages.clone()).unwrap();

            let mut rng = StdRng::seed_from_u64(seed + 1_000);
            for _ in 0..5 {
                let shuffled = shuffle_keeping_tie_order(&messages, &mut rng);

                let forest = test_threader().reconstruct(shuffled).unwrap();
                assert_eq!(forest.roots(), expected.roots(), "seed {seed}");
            }
        }
    }

    #[test]
    fn test_shuffled_ties_still_form_valid_forest() {
        for seed in 0..10 {
            let messages = generate_log(seed, 120);
            let input_len = messages.len();

            let mut rng = StdRng::seed_from_u64(seed + 2_000);
            let mut shuffled = messages;
            shuffled.shuffle(&mut rng);

            let forest = test_threader().reconstruct_or_flat(shuffled);
            let folded: usize = forest.iter().map(|m| m.merged_ids.len()).sum();
            assert_eq!(forest.real_count() + folded, input_len, "seed {seed}");
            assert!(verify_forest(forest.roots()).is_ok(), "seed {seed}");
        }
    }

    #[test]
    fn test_generated_logs_have_ties_and_ghost_threads() {
        let mut saw_tie = false;
        let mut saw_ghost_grandchild = false;

        for seed in 0..10 {
            let messages = generate_log(seed, 120);
            let mut timestamps: Vec<i64> = messages.iter().map(|m| m.timestamp).collect();
            timestamps.dedup();
            saw_tie |= timestamps.len() < messages.len();

            let forest = test_threader().reconstruct(messages).unwrap();
            saw_ghost_grandchild |= forest
                .iter()
                .filter(|node| node.is_ghost)
                .any(|ghost| ghost.children.iter().any(|child| !child.children.is_empty()));
        }

        assert!(saw_tie);
        assert!(saw_ghost_grandchild);
    }

    #[test]
    fn test_reconstruction_is_idempotent() {
        let messages = generate_log(42, 100);
        let threader = test_threader();

        let first = threader.reconstruct(messages.clone()).unwrap();
        let second = threader.reconstruct(messages).unwrap();

        assert_eq!(first.roots(), second.roots());
        assert_eq!(first.summaries(), second.summaries());
    }

    #[test]
    fn test_stage_by_stage_matches_reconstruct() {
        let messages = generate_log(3, 80);
        let threader = test_threader();

        let coalesced = threader.coalesce(messages.clone()).unwrap();
        let roots = threader.build_tree(coalesced).unwrap();
        let forest = threader.reconstruct(messages).unwrap();

        assert_eq!(roots.as_slice(), forest.roots());
        assert_eq!(preorder(&roots).len(), forest.len());
    }
}
