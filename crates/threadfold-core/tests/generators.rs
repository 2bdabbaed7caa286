#![allow(dead_code)]

use proptest::prelude::*;
use threadfold_core::Status;

pub const AUTHOR: &str = "me";

/// Zero-padded ids keep lexicographic order equal to numeric order.
pub fn id(n: usize) -> String {
    format!("s{n:04}")
}

/// An upstream world: statuses whose parents always precede them, so the
/// reply structure is a forest by construction.
#[derive(Debug, Clone)]
pub struct World {
    pub statuses: Vec<Status>,
}

impl World {
    pub fn author_statuses(&self) -> Vec<Status> {
        self.statuses
            .iter()
            .filter(|s| s.is_by(AUTHOR))
            .cloned()
            .collect()
    }
}

fn arb_author() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        3 => Just(AUTHOR),
        2 => Just("alice"),
        2 => Just("bob"),
    ]
}

/// Each status either starts a thread or replies to an earlier status.
pub fn arb_world(max_len: usize) -> impl Strategy<Value = World> {
    prop::collection::vec((arb_author(), any::<bool>(), any::<prop::sample::Index>()), 1..max_len)
        .prop_map(|specs| {
            let statuses = specs
                .into_iter()
                .enumerate()
                .map(|(n, (author, is_root, parent))| {
                    let status = Status::new(id(n), author);
                    if n == 0 || is_root {
                        status
                    } else {
                        status.replying_to(id(parent.index(n)))
                    }
                })
                .collect();
            World { statuses }
        })
}

/// A world plus a subset of the author's statuses to ingest as one batch.
pub fn arb_world_and_batch(max_len: usize) -> impl Strategy<Value = (World, Vec<Status>)> {
    arb_world(max_len).prop_flat_map(|world| {
        let mine = world.author_statuses();
        let len = mine.len();
        (Just(world), prop::sample::subsequence(mine, 0..=len))
    })
}
