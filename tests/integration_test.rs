// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fs, sync::Arc, thread};

use filequeue::{Queue, QueueBuilder};
use tempfile::TempDir;
use test_case::test_case;

fn new_queue(temp_dir: &TempDir, batch: usize) -> Queue {
    let queue = QueueBuilder::new(temp_dir.path(), "events")
        .rotate_batch_size(batch)
        .build();
    queue.environment().create().unwrap();
    queue
}

#[test]
fn test_fifo_across_interleaved_push_and_pop() {
    let temp_dir = TempDir::new().unwrap();
    let queue = new_queue(&temp_dir, 3);

    queue.push(["a", "b", "c"]).unwrap();
    assert_eq!(queue.pop(1).unwrap(), vec!["a"]);
    queue.push(["d", "e"]).unwrap();
    assert_eq!(queue.pop(2).unwrap(), vec!["b", "c"]);
    assert_eq!(queue.pop(10).unwrap(), vec!["d", "e"]);
    assert!(queue.pop(1).unwrap().is_empty());
}

#[test_case(1, 7; "tiny batch")]
#[test_case(10, 10; "batch equals request")]
#[test_case(100, 33; "default batch")]
fn test_split_reads_never_reorder_or_duplicate(batch: usize, chunk: usize) {
    let temp_dir = TempDir::new().unwrap();
    let queue = new_queue(&temp_dir, batch);

    let records: Vec<String> = (0..200).map(|i| format!("record-{i:04}")).collect();
    queue.push(&records).unwrap();

    let mut popped = Vec::new();
    loop {
        let served = queue.pop(chunk).unwrap();
        if served.is_empty() {
            break;
        }
        popped.extend(served);
    }
    assert_eq!(popped, records);
}

#[test]
fn test_state_is_entirely_on_disk() {
    let temp_dir = TempDir::new().unwrap();

    {
        let queue = new_queue(&temp_dir, 5);
        queue.push(["one", "two", "three"]).unwrap();
        assert_eq!(queue.pop(1).unwrap(), vec!["one"]);
    }

    // A fresh instance over the same directory continues where the
    // previous one stopped.
    let queue = QueueBuilder::new(temp_dir.path(), "events")
        .rotate_batch_size(5)
        .build();
    assert_eq!(queue.pop(2).unwrap(), vec!["two", "three"]);
}

#[test]
fn test_recycle_preserves_pending_records() {
    let temp_dir = TempDir::new().unwrap();
    let queue = new_queue(&temp_dir, 4);

    let records: Vec<String> = (0..20).map(|i| format!("r{i:02}")).collect();
    queue.push(&records).unwrap();

    let mut popped = queue.pop(6).unwrap();

    let before = fs::metadata(queue.environment().write_file()).unwrap().len();
    queue.recycle().unwrap();
    let after = fs::metadata(queue.environment().write_file()).unwrap().len();
    assert!(after < before);
    assert_eq!(
        fs::read_to_string(queue.environment().rotate_cursor_file()).unwrap(),
        ""
    );

    loop {
        let served = queue.pop(6).unwrap();
        if served.is_empty() {
            break;
        }
        popped.extend(served);
    }
    assert_eq!(popped, records);
}

#[test]
fn test_repeated_recycle_is_stable() {
    let temp_dir = TempDir::new().unwrap();
    let queue = new_queue(&temp_dir, 2);

    queue.push(["a", "b", "c", "d"]).unwrap();
    assert_eq!(queue.pop(1).unwrap(), vec!["a"]);

    queue.recycle().unwrap();
    queue.recycle().unwrap();

    assert_eq!(queue.pop(3).unwrap(), vec!["b", "c", "d"]);
}

#[test]
fn test_concurrent_pushers_serialize_per_producer() {
    let temp_dir = TempDir::new().unwrap();
    let queue = Arc::new(new_queue(&temp_dir, 16));

    let producers = 4;
    let per_producer = 25;

    let handles: Vec<_> = (0..producers)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..per_producer {
                    queue.push([format!("p{p}-{i:02}")]).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let popped = queue.pop(producers * per_producer).unwrap();
    assert_eq!(popped.len(), producers * per_producer);

    // Arrival order among producers is lock-acquisition order, but each
    // producer's own records must come out in the order it pushed them.
    for p in 0..producers {
        let prefix = format!("p{p}-");
        let mine: Vec<_> = popped.iter().filter(|r| r.starts_with(&prefix)).collect();
        assert_eq!(mine.len(), per_producer);
        for (i, record) in mine.iter().enumerate() {
            assert_eq!(**record, format!("p{p}-{i:02}"));
        }
    }
}

#[test]
fn test_concurrent_pops_never_duplicate() {
    let temp_dir = TempDir::new().unwrap();
    let queue = Arc::new(new_queue(&temp_dir, 32));

    let records: Vec<String> = (0..300).map(|i| format!("record-{i:04}")).collect();
    queue.push(&records).unwrap();

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut mine = Vec::new();
                loop {
                    let served = queue.pop(7).unwrap();
                    if served.is_empty() {
                        break;
                    }
                    mine.extend(served);
                }
                mine
            })
        })
        .collect();

    let mut all: Vec<String> = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    all.sort();
    assert_eq!(all, records);
}

#[test]
fn test_two_queues_share_a_root() {
    let temp_dir = TempDir::new().unwrap();

    let jobs = QueueBuilder::new(temp_dir.path(), "jobs").build();
    let events = QueueBuilder::new(temp_dir.path(), "events").build();
    jobs.environment().create().unwrap();
    events.environment().create().unwrap();

    jobs.push(["job"]).unwrap();
    events.push(["event"]).unwrap();

    assert_eq!(jobs.pop(1).unwrap(), vec!["job"]);
    assert_eq!(events.pop(1).unwrap(), vec!["event"]);
}

#[test]
fn test_reset_discards_everything() {
    let temp_dir = TempDir::new().unwrap();
    let queue = new_queue(&temp_dir, 4);

    queue.push(["a", "b", "c"]).unwrap();
    assert_eq!(queue.pop(1).unwrap(), vec!["a"]);

    queue.environment().reset().unwrap();
    assert!(queue.pop(5).unwrap().is_empty());

    // The queue stays usable after a reset.
    queue.push(["fresh"]).unwrap();
    assert_eq!(queue.pop(1).unwrap(), vec!["fresh"]);
}
