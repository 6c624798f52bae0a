// tests/queue_properties.rs

mod common;
use crate::common::builders::{CommandBuilder, ManifestBuilder};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use proptest::prelude::*;

use scrolld::dag::CommandQueue;
use scrolld::engine::CompletionOutcome;
use scrolld::manifest::Manifest;
use scrolld::types::CommandStatus;

// Strategy to generate a valid command graph.
// We ensure acyclicity by only allowing command N to need commands 0..N-1.
fn manifest_strategy(max_commands: usize) -> impl Strategy<Value = Manifest> {
    (1..=max_commands).prop_flat_map(|count| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..count), count)
            .prop_map(move |raw_needs| {
                let mut builder = ManifestBuilder::new("generated");
                for (i, potential) in raw_needs.into_iter().enumerate() {
                    let mut command = CommandBuilder::new();
                    let needs: HashSet<usize> = if i == 0 {
                        HashSet::new()
                    } else {
                        potential.into_iter().map(|d| d % i).collect()
                    };
                    for dep in needs {
                        command = command.needs(&format!("cmd_{dep}"));
                    }
                    builder = builder.with_command(&format!("cmd_{i}"), command.build());
                }
                builder.build()
            })
    })
}

proptest! {
    #[test]
    fn test_enqueued_closure_always_drains(
        manifest in manifest_strategy(12),
        roots in proptest::collection::vec(any::<usize>(), 1..4),
    ) {
        let names: Vec<String> = manifest.command_names().map(str::to_string).collect();
        let needs: HashMap<String, Vec<String>> = manifest
            .commands
            .iter()
            .map(|(name, spec)| (name.clone(), spec.needs.clone()))
            .collect();

        let mut queue = CommandQueue::new(Arc::new(manifest));
        for root in roots {
            let name = &names[root % names.len()];
            // Duplicate roots are rejected but must not disturb the queue.
            let _ = queue.enqueue(name, false);
        }

        let mut done: HashSet<String> = HashSet::new();
        let mut passes = 0;

        while !queue.pending().is_empty() {
            passes += 1;
            prop_assert!(passes <= 4 * names.len() + 4, "queue did not drain");

            let step = queue.scan();
            for launch in step.launches {
                for dep in &needs[&launch.name] {
                    prop_assert!(
                        done.contains(dep),
                        "{} launched before its dependency {}", launch.name, dep
                    );
                }
                prop_assert!(done.insert(launch.name.clone()), "{} launched twice", launch.name);
                queue.complete(&launch.name, CompletionOutcome::Succeeded);
            }
        }

        for (name, status) in queue.snapshot() {
            prop_assert_eq!(status, CommandStatus::Done);
            prop_assert_eq!(queue.launch_count(&name), 1);
            prop_assert!(done.contains(&name));
        }
    }
}
